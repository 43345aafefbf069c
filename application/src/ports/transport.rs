//! Transport port
//!
//! Defines how the application layer talks back to the user: a placeholder
//! message that is edited as the answer grows, standalone notices, and a
//! typing indicator.

use async_trait::async_trait;
use thiserror::Error;
use turnstile_domain::{TextFormat, UserId};

/// Errors that can occur during transport operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The edit would leave the message text unchanged.
    #[error("Message is not modified")]
    NotModified,

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// "Content unchanged" is a transient condition, not a failure.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, TransportError::NotModified)
    }
}

/// Reference to a message previously sent to a user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub user: UserId,
    pub message_id: i64,
}

impl MessageRef {
    pub fn new(user: UserId, message_id: i64) -> Self {
        Self { user, message_id }
    }
}

/// Outbound channel to end users
///
/// Implementations (adapters) live in the presentation or infrastructure
/// layer: a chat platform client, the console, a test recorder.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the message that subsequent answer edits will replace.
    async fn send_placeholder(&self, user: &UserId) -> Result<MessageRef, TransportError>;

    /// Replace the text of a previously sent message.
    ///
    /// Must return [`TransportError::NotModified`] when the new text equals
    /// the current one.
    async fn edit_message(
        &self,
        message: &MessageRef,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError>;

    /// Send a standalone notice.
    async fn send_notice(
        &self,
        user: &UserId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError>;

    /// Show a "typing" indicator to the user.
    async fn signal_typing(&self, user: &UserId) -> Result<(), TransportError>;
}
