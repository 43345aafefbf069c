//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into the application's
//! [`SessionConfig`] once validated.

mod chat_modes;
mod generation;
mod logging;
mod session;

pub use chat_modes::FileChatMode;
pub use generation::FileGenerationConfig;
pub use logging::FileLoggingConfig;
pub use session::{FileSessionConfig, FileStreamConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;
use turnstile_application::SessionConfig;
use turnstile_domain::ChatModes;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Turn control
    pub session: FileSessionConfig,
    /// Partial answer throttling
    pub stream: FileStreamConfig,
    /// Generation backend
    pub generation: FileGenerationConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
    /// Chat modes keyed by id
    pub chat_modes: BTreeMap<String, FileChatMode>,
}

/// How serious a configuration issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Startup continues with a fallback value.
    Warning,
    /// The configuration cannot be used.
    Error,
}

/// One problem found by [`FileConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    /// Dotted path of the offending key, e.g. `stream.max_message_len`.
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {}: {}", self.field, self.message)
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Errors make the configuration unusable; warnings describe values
    /// that are replaced by a fallback during conversion.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.stream.max_message_len == 0 {
            issues.push(ConfigIssue::error(
                "stream.max_message_len",
                "must be greater than zero",
            ));
        }
        if self.stream.min_delta == 0 {
            issues.push(ConfigIssue::warning(
                "stream.min_delta",
                "zero forwards every partial answer",
            ));
        }
        if self.generation.model.trim().is_empty() {
            issues.push(ConfigIssue::error("generation.model", "model name is empty"));
        }
        if self.generation.base_url.trim().is_empty() {
            issues.push(ConfigIssue::error("generation.base_url", "URL is empty"));
        }
        if self.generation.max_context_chars == 0 {
            issues.push(ConfigIssue::error(
                "generation.max_context_chars",
                "must be greater than zero",
            ));
        }

        for (id, mode) in &self.chat_modes {
            if id.trim().is_empty() {
                issues.push(ConfigIssue::error("chat_modes", "mode id is empty"));
            }
            if let Err(message) = mode.to_chat_mode(id) {
                issues.push(ConfigIssue::warning(
                    format!("chat_modes.{id}.format"),
                    format!("{message}, mode skipped"),
                ));
            }
        }

        issues
    }

    /// Configured chat modes. Modes with an unusable format are skipped.
    pub fn chat_modes(&self) -> ChatModes {
        let modes = self
            .chat_modes
            .iter()
            .filter_map(|(id, mode)| match mode.to_chat_mode(id) {
                Ok(mode) => Some(mode),
                Err(e) => {
                    warn!("Skipping chat mode '{}': {}", id, e);
                    None
                }
            })
            .collect();
        ChatModes::new(modes)
    }

    /// Convert into the application's turn control parameters.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_new_dialog_timeout(self.session.new_dialog_timeout())
            .with_default_model(self.generation.model.clone())
            .with_chat_modes(self.chat_modes())
            .with_stream(self.stream.to_stream_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use turnstile_domain::{DEFAULT_CHAT_MODE, TextFormat};

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.session.new_dialog_timeout_secs, 600);
        assert!(config.session.enable_streaming);
        assert_eq!(config.stream.max_message_len, 4096);
        assert_eq!(config.stream.min_delta, 100);
        assert_eq!(config.stream.min_interval_ms, 10);
        assert!(config.logging.conversation_log.is_none());
        assert!(config.chat_modes.is_empty());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[session]
new_dialog_timeout_secs = 30
enable_streaming = false

[stream]
max_message_len = 2000
min_delta = 40

[generation]
base_url = "http://localhost:8080/v1"
model = "local-model"
max_context_chars = 1000

[logging]
conversation_log = "/tmp/turns.jsonl"

[chat_modes.coder]
name = "Code Assistant"
prompt = "You write code."
format = "markdown"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.new_dialog_timeout_secs, 30);
        assert!(!config.session.enable_streaming);
        assert_eq!(config.stream.max_message_len, 2000);
        assert_eq!(config.stream.min_interval_ms, 10);
        assert_eq!(config.generation.base_url, "http://localhost:8080/v1");
        assert_eq!(config.generation.request_timeout_secs, 120);
        assert_eq!(config.chat_modes["coder"].name, "Code Assistant");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_to_session_config() {
        let toml_str = r#"
[session]
new_dialog_timeout_secs = 5

[generation]
model = "local-model"

[chat_modes.coder]
name = "Coder"
prompt = "You write code."
format = "md"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let session = config.to_session_config();

        assert_eq!(session.new_dialog_timeout, Duration::from_secs(5));
        assert_eq!(session.default_model, "local-model");
        assert_eq!(
            session.chat_modes.get("coder").unwrap().format,
            TextFormat::Markdown
        );
        assert!(session.chat_modes.get(DEFAULT_CHAT_MODE).is_some());
    }

    #[test]
    fn test_validate_zero_message_len() {
        let mut config = FileConfig::default();
        config.stream.max_message_len = 0;

        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(issues[0].field, "stream.max_message_len");
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = FileConfig::default();
        config.generation.model = "  ".to_string();

        let issues = config.validate();
        assert!(issues.iter().any(|i| i.is_error() && i.field == "generation.model"));
    }

    #[test]
    fn test_unknown_mode_format_is_skipped_with_warning() {
        let mut config = FileConfig::default();
        config.chat_modes.insert(
            "poet".to_string(),
            FileChatMode {
                name: "Poet".to_string(),
                prompt: "Rhyme.".to_string(),
                format: "rtf".to_string(),
            },
        );

        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(config.chat_modes().get("poet").is_none());
    }

    #[test]
    fn test_mode_name_defaults_to_id() {
        let mode = FileChatMode {
            prompt: "Rhyme.".to_string(),
            ..Default::default()
        };
        let mode = mode.to_chat_mode("poet").unwrap();
        assert_eq!(mode.name, "poet");
        assert_eq!(mode.format, TextFormat::Html);
    }
}
