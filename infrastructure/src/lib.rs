//! Infrastructure layer for turnstile
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod generation;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigLoader, FileChatMode, FileConfig, FileGenerationConfig, FileLoggingConfig,
    FileSessionConfig, FileStreamConfig, Severity,
};
pub use generation::{OpenAiError, OpenAiGenerationSource};
pub use logging::JsonlConversationLogger;
pub use storage::{Exchange, InMemoryDialogStore};
