//! Chat mode definitions from TOML (`[chat_modes.<id>]` tables)

use serde::{Deserialize, Serialize};
use turnstile_domain::{ChatMode, TextFormat};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatMode {
    /// Display name shown in notices.
    pub name: String,
    /// System prompt sent ahead of the dialog.
    pub prompt: String,
    /// Markup of the answers: "html", "markdown" or "plain".
    pub format: String,
}

impl Default for FileChatMode {
    fn default() -> Self {
        Self {
            name: String::new(),
            prompt: String::new(),
            format: TextFormat::default().as_str().to_string(),
        }
    }
}

impl FileChatMode {
    /// Build the domain mode. Returns the error message for an unknown format.
    pub fn to_chat_mode(&self, id: &str) -> Result<ChatMode, String> {
        let format: TextFormat = self.format.parse().map_err(|e| format!("{e}"))?;
        let name = if self.name.trim().is_empty() {
            id
        } else {
            self.name.as_str()
        };
        Ok(ChatMode::new(id, name, self.prompt.as_str()).with_format(format))
    }
}
