//! Text format value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Markup dialect a transport should apply to an outgoing message
///
/// `Plain` is also the fallback payload used when a formatted edit is
/// rejected by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Html,
    Markdown,
    Plain,
}

impl TextFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextFormat::Html => "html",
            TextFormat::Markdown => "markdown",
            TextFormat::Plain => "plain",
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, TextFormat::Plain)
    }
}

impl FromStr for TextFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(TextFormat::Html),
            "markdown" | "md" => Ok(TextFormat::Markdown),
            "plain" | "text" | "none" => Ok(TextFormat::Plain),
            _ => Err(DomainError::UnknownTextFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_html() {
        assert_eq!(TextFormat::default(), TextFormat::Html);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("MD".parse::<TextFormat>().unwrap(), TextFormat::Markdown);
        assert_eq!("text".parse::<TextFormat>().unwrap(), TextFormat::Plain);
        assert!("rtf".parse::<TextFormat>().is_err());
    }

    #[test]
    fn test_deserialize_lowercase() {
        let format: TextFormat = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(format, TextFormat::Markdown);
    }
}
