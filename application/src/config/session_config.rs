//! Session parameters — turn and stream control.
//!
//! [`SessionConfig`] groups the static parameters that control how
//! [`SessionController`](crate::use_cases::session_controller::SessionController)
//! runs a turn. [`StreamConfig`] is the part consumed by the
//! [`StreamReducer`](crate::use_cases::stream_reducer::StreamReducer).

use std::time::Duration;
use turnstile_domain::ChatModes;

/// Model used when a user has none stored
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Throttling parameters for relaying partial answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Hard size limit of one transport message, in characters.
    pub max_message_len: usize,
    /// Minimum change in answer length that justifies an edit.
    pub min_delta: usize,
    /// Minimum gap between two consecutive edits.
    pub min_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_message_len: 4096,
            min_delta: 100,
            min_interval: Duration::from_millis(10),
        }
    }
}

impl StreamConfig {
    pub fn with_min_delta(mut self, min_delta: usize) -> Self {
        self.min_delta = min_delta;
        self
    }

    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }
}

/// Turn control parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which a non-empty dialog is restarted.
    pub new_dialog_timeout: Duration,
    /// Model charged for a turn when the user has none stored.
    pub default_model: String,
    pub chat_modes: ChatModes,
    pub stream: StreamConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            new_dialog_timeout: Duration::from_secs(600),
            default_model: DEFAULT_MODEL.to_string(),
            chat_modes: ChatModes::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl SessionConfig {
    // ==================== Builder Methods ====================

    pub fn with_new_dialog_timeout(mut self, timeout: Duration) -> Self {
        self.new_dialog_timeout = timeout;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_chat_modes(mut self, modes: ChatModes) -> Self {
        self.chat_modes = modes;
        self
    }

    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_defaults() {
        let stream = StreamConfig::default();
        assert_eq!(stream.max_message_len, 4096);
        assert_eq!(stream.min_delta, 100);
        assert_eq!(stream.min_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_builder_overrides() {
        let config = SessionConfig::default()
            .with_new_dialog_timeout(Duration::from_secs(5))
            .with_stream(StreamConfig::default().with_min_delta(1));
        assert_eq!(config.new_dialog_timeout, Duration::from_secs(5));
        assert_eq!(config.stream.min_delta, 1);
        assert_eq!(config.default_model, DEFAULT_MODEL);
    }
}
