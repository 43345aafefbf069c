//! Turn and stream settings from TOML (`[session]` and `[stream]` sections)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use turnstile_application::StreamConfig;

/// Turn control settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Idle seconds after which a non-empty dialog is restarted (default: 600).
    pub new_dialog_timeout_secs: u64,
    /// Relay partial answers while they are generated (default: true).
    pub enable_streaming: bool,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        Self {
            new_dialog_timeout_secs: 600,
            enable_streaming: true,
        }
    }
}

impl FileSessionConfig {
    pub fn new_dialog_timeout(&self) -> Duration {
        Duration::from_secs(self.new_dialog_timeout_secs)
    }
}

/// Partial answer throttling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStreamConfig {
    /// Transport message size limit in characters (default: 4096).
    pub max_message_len: usize,
    /// Minimum answer growth between two edits (default: 100).
    pub min_delta: usize,
    /// Minimum pause between two edits in milliseconds (default: 10).
    pub min_interval_ms: u64,
}

impl Default for FileStreamConfig {
    fn default() -> Self {
        let defaults = StreamConfig::default();
        Self {
            max_message_len: defaults.max_message_len,
            min_delta: defaults.min_delta,
            min_interval_ms: defaults.min_interval.as_millis() as u64,
        }
    }
}

impl FileStreamConfig {
    pub fn to_stream_config(&self) -> StreamConfig {
        StreamConfig::default()
            .with_max_message_len(self.max_message_len)
            .with_min_delta(self.min_delta)
            .with_min_interval(Duration::from_millis(self.min_interval_ms))
    }
}
