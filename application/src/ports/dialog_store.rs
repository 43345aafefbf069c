//! Dialog store port
//!
//! Persistence of dialogs, per-user attributes and token accounting. Every
//! operation returns an explicit `Result`; a missing row is reported as an
//! empty value (`Ok(None)`, empty dialog) rather than as an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use turnstile_domain::{DialogId, DialogTurn, TokenUsage, UserAttributes, UserId};

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record for user {user}: {reason}")]
    Corrupt { user: UserId, reason: String },

    #[error("Unknown dialog {0}")]
    UnknownDialog(DialogId),
}

/// Persistent dialog and attribute store
#[async_trait]
pub trait DialogStore: Send + Sync {
    /// Turns of the given dialog, or of the user's current dialog when
    /// `dialog_id` is `None`. A user without a dialog yields an empty list.
    async fn dialog_messages(
        &self,
        user: &UserId,
        dialog_id: Option<&DialogId>,
    ) -> Result<Vec<DialogTurn>, StorageError>;

    /// Replace the turns of a dialog (current dialog when `None`).
    async fn set_dialog_messages(
        &self,
        user: &UserId,
        dialog_id: Option<&DialogId>,
        turns: Vec<DialogTurn>,
    ) -> Result<(), StorageError>;

    /// Attribute snapshot, `None` for a user never seen before.
    async fn user_attributes(&self, user: &UserId) -> Result<Option<UserAttributes>, StorageError>;

    async fn set_last_interaction(&self, user: &UserId, at: DateTime<Utc>) -> Result<(), StorageError>;

    async fn set_chat_mode(&self, user: &UserId, mode: &str) -> Result<(), StorageError>;

    /// Add `usage` to the user's running counters for `model`.
    async fn record_token_usage(
        &self,
        user: &UserId,
        model: &str,
        usage: TokenUsage,
    ) -> Result<(), StorageError>;

    /// Open a fresh, empty dialog and make it the user's current one.
    async fn start_new_dialog(&self, user: &UserId) -> Result<DialogId, StorageError>;

    /// Append a prompt/completion pair to the exchange audit log.
    async fn record_exchange(&self, prompt: &str, completion: &str) -> Result<(), StorageError>;
}
