//! Logging settings from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of turn events. Disabled when unset.
    pub conversation_log: Option<PathBuf>,
    /// Diagnostic log file written in addition to stderr.
    pub log_file: Option<PathBuf>,
}
