//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Unknown text format: {0}")]
    UnknownTextFormat(String),

    #[error("Invalid chat mode: {0}")]
    InvalidChatMode(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
