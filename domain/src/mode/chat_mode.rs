//! Chat mode value object

use super::text_format::TextFormat;
use serde::{Deserialize, Serialize};

/// Identifier of the mode used when a user has none stored
pub const DEFAULT_CHAT_MODE: &str = "assistant";

/// Persona the generation backend answers in (Value Object)
///
/// A mode bundles the system prompt sent ahead of the dialog with the
/// display name shown in user notices and the markup its answers use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMode {
    pub id: String,
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub format: TextFormat,
}

impl ChatMode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prompt: prompt.into(),
            format: TextFormat::default(),
        }
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    /// Built-in general purpose mode
    pub fn assistant() -> Self {
        Self::new(
            DEFAULT_CHAT_MODE,
            "👩🏼‍🎓 General Assistant",
            "As an advanced chatbot Assistant, your primary goal is to assist users to the best of your ability.",
        )
    }
}

impl Default for ChatMode {
    fn default() -> Self {
        Self::assistant()
    }
}

/// Ordered set of configured chat modes with a guaranteed fallback
#[derive(Debug, Clone)]
pub struct ChatModes {
    modes: Vec<ChatMode>,
}

impl ChatModes {
    /// Build from configured modes. The built-in assistant mode is added
    /// when no mode with the default id is configured.
    pub fn new(mut modes: Vec<ChatMode>) -> Self {
        if !modes.iter().any(|m| m.id == DEFAULT_CHAT_MODE) {
            modes.insert(0, ChatMode::assistant());
        }
        Self { modes }
    }

    /// Look up a mode, falling back to the default one for unknown ids.
    pub fn resolve(&self, id: Option<&str>) -> &ChatMode {
        id.and_then(|id| self.get(id))
            .or_else(|| self.get(DEFAULT_CHAT_MODE))
            .unwrap_or(&self.modes[0])
    }

    pub fn get(&self, id: &str) -> Option<&ChatMode> {
        self.modes.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMode> {
        self.modes.iter()
    }
}

impl Default for ChatModes {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_always_present() {
        let modes = ChatModes::new(vec![ChatMode::new("coder", "Coder", "Write code")]);
        assert!(modes.get(DEFAULT_CHAT_MODE).is_some());
        assert_eq!(modes.iter().count(), 2);
    }

    #[test]
    fn unknown_mode_resolves_to_default() {
        let modes = ChatModes::default();
        assert_eq!(modes.resolve(Some("missing")).id, DEFAULT_CHAT_MODE);
        assert_eq!(modes.resolve(None).id, DEFAULT_CHAT_MODE);
    }

    #[test]
    fn configured_default_overrides_builtin() {
        let custom = ChatMode::new(DEFAULT_CHAT_MODE, "Custom", "p").with_format(TextFormat::Plain);
        let modes = ChatModes::new(vec![custom.clone()]);
        assert_eq!(modes.resolve(None), &custom);
        assert_eq!(modes.iter().count(), 1);
    }
}
