//! Parsing of REPL input lines.

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    Message(String),
    Cancel,
    New,
    /// `/mode <id>`; `None` lists the available modes.
    Mode(Option<String>),
    Help,
    Quit,
    Unknown(String),
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplInput::Empty;
        }
        if !line.starts_with('/') {
            return ReplInput::Message(line.to_string());
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (line, None),
        };
        match command {
            "/cancel" | "/c" => ReplInput::Cancel,
            "/new" | "/n" => ReplInput::New,
            "/mode" | "/modes" | "/m" => ReplInput::Mode(arg.map(str::to_string)),
            "/help" | "/h" | "/?" => ReplInput::Help,
            "/quit" | "/exit" | "/q" => ReplInput::Quit,
            other => ReplInput::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_trimmed() {
        assert_eq!(ReplInput::parse("  hi there \n"), ReplInput::Message("hi there".into()));
        assert_eq!(ReplInput::parse("   "), ReplInput::Empty);
    }

    #[test]
    fn commands_and_aliases() {
        assert_eq!(ReplInput::parse("/cancel"), ReplInput::Cancel);
        assert_eq!(ReplInput::parse("/n"), ReplInput::New);
        assert_eq!(ReplInput::parse("/exit"), ReplInput::Quit);
        assert_eq!(ReplInput::parse("/?"), ReplInput::Help);
    }

    #[test]
    fn mode_takes_an_optional_argument() {
        assert_eq!(ReplInput::parse("/mode coder"), ReplInput::Mode(Some("coder".into())));
        assert_eq!(ReplInput::parse("/mode   "), ReplInput::Mode(None));
        assert_eq!(ReplInput::parse("/modes"), ReplInput::Mode(None));
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(ReplInput::parse("/frobnicate now"), ReplInput::Unknown("/frobnicate".into()));
    }
}
