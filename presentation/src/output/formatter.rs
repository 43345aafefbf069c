//! Markup rendering for the terminal
//!
//! Answers and notices carry HTML or Markdown meant for a chat client. The
//! console shows Markdown as is and reduces HTML to its text content.

use turnstile_domain::TextFormat;

/// Text of `text` as it should appear on a terminal.
pub fn to_console_text(text: &str, format: TextFormat) -> String {
    match format {
        TextFormat::Html => strip_html(text),
        TextFormat::Markdown | TextFormat::Plain => text.to_string(),
    }
}

/// Drop tags and decode the entities chat HTML uses.
///
/// A `<` that never closes is kept literally, so a partial answer cut in
/// the middle of a tag does not swallow the rest of the text.
pub fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                rest = &rest[start..];
                break;
            }
        }
        if rest.is_empty() {
            break;
        }
    }
    out.push_str(rest);
    decode_entities(&out)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
