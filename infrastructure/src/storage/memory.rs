//! In-memory dialog store.
//!
//! Users are created lazily by the first write that concerns them. Reads for
//! an unknown user return empty values. All state is lost when the process
//! exits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use turnstile_application::{DialogStore, StorageError};
use turnstile_domain::{DialogId, DialogTurn, TokenUsage, UserAttributes, UserId};
use uuid::Uuid;

/// One prompt/completion pair of the exchange audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub prompt: String,
    pub completion: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct UserRecord {
    chat_mode: Option<String>,
    model: Option<String>,
    current_dialog: Option<DialogId>,
    last_interaction: Option<DateTime<Utc>>,
    dialogs: HashMap<DialogId, Vec<DialogTurn>>,
    token_usage: HashMap<String, TokenUsage>,
}

impl UserRecord {
    fn attributes(&self) -> UserAttributes {
        UserAttributes {
            current_chat_mode: self.chat_mode.clone(),
            current_model: self.model.clone(),
            current_dialog_id: self.current_dialog.clone(),
            last_interaction: self.last_interaction,
        }
    }

    fn open_dialog(&mut self) -> DialogId {
        let id = DialogId::new(Uuid::new_v4().to_string());
        self.dialogs.insert(id.clone(), Vec::new());
        self.current_dialog = Some(id.clone());
        id
    }

    /// Resolve `dialog_id`, defaulting to the current dialog.
    fn dialog_id(&self, dialog_id: Option<&DialogId>) -> Option<DialogId> {
        dialog_id.cloned().or_else(|| self.current_dialog.clone())
    }

    /// Error for a dialog id that has no turns table.
    ///
    /// A requested id the store never issued is unknown; a missing current
    /// dialog means the record itself is inconsistent.
    fn missing_dialog(
        &self,
        user: &UserId,
        requested: Option<&DialogId>,
        id: DialogId,
    ) -> StorageError {
        match requested {
            Some(_) => StorageError::UnknownDialog(id),
            None => StorageError::Corrupt {
                user: user.clone(),
                reason: format!("current dialog {id} has no turns"),
            },
        }
    }
}

/// [`DialogStore`] kept in process memory.
#[derive(Default)]
pub struct InMemoryDialogStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    exchanges: RwLock<Vec<Exchange>>,
}

impl InMemoryDialogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated token usage of a user for one model.
    pub fn token_usage(&self, user: &UserId, model: &str) -> Result<TokenUsage, StorageError> {
        Ok(self
            .read_users()?
            .get(user)
            .and_then(|record| record.token_usage.get(model).copied())
            .unwrap_or_default())
    }

    /// Snapshot of the exchange audit log.
    pub fn exchanges(&self) -> Result<Vec<Exchange>, StorageError> {
        Ok(self.read_exchanges()?.clone())
    }

    fn read_users(&self) -> Result<RwLockReadGuard<'_, HashMap<UserId, UserRecord>>, StorageError> {
        self.users.read().map_err(|_| poisoned("users"))
    }

    fn write_users(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, UserRecord>>, StorageError> {
        self.users.write().map_err(|_| poisoned("users"))
    }

    fn read_exchanges(&self) -> Result<RwLockReadGuard<'_, Vec<Exchange>>, StorageError> {
        self.exchanges.read().map_err(|_| poisoned("exchanges"))
    }
}

fn poisoned(table: &str) -> StorageError {
    StorageError::Unavailable(format!("{table} lock poisoned"))
}

#[async_trait]
impl DialogStore for InMemoryDialogStore {
    async fn dialog_messages(
        &self,
        user: &UserId,
        dialog_id: Option<&DialogId>,
    ) -> Result<Vec<DialogTurn>, StorageError> {
        let users = self.read_users()?;
        let Some(record) = users.get(user) else {
            return match dialog_id {
                Some(id) => Err(StorageError::UnknownDialog(id.clone())),
                None => Ok(Vec::new()),
            };
        };
        let Some(id) = record.dialog_id(dialog_id) else {
            return Ok(Vec::new());
        };
        match record.dialogs.get(&id) {
            Some(turns) => Ok(turns.clone()),
            None => Err(record.missing_dialog(user, dialog_id, id)),
        }
    }

    async fn set_dialog_messages(
        &self,
        user: &UserId,
        dialog_id: Option<&DialogId>,
        turns: Vec<DialogTurn>,
    ) -> Result<(), StorageError> {
        let mut users = self.write_users()?;
        let record = users.entry(user.clone()).or_default();
        let id = match record.dialog_id(dialog_id) {
            Some(id) => id,
            None => record.open_dialog(),
        };
        if let Some(dialog) = record.dialogs.get_mut(&id) {
            *dialog = turns;
            return Ok(());
        }
        Err(record.missing_dialog(user, dialog_id, id))
    }

    async fn user_attributes(&self, user: &UserId) -> Result<Option<UserAttributes>, StorageError> {
        Ok(self.read_users()?.get(user).map(UserRecord::attributes))
    }

    async fn set_last_interaction(&self, user: &UserId, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.write_users()?.entry(user.clone()).or_default().last_interaction = Some(at);
        Ok(())
    }

    async fn set_chat_mode(&self, user: &UserId, mode: &str) -> Result<(), StorageError> {
        self.write_users()?.entry(user.clone()).or_default().chat_mode = Some(mode.to_string());
        Ok(())
    }

    async fn record_token_usage(
        &self,
        user: &UserId,
        model: &str,
        usage: TokenUsage,
    ) -> Result<(), StorageError> {
        let mut users = self.write_users()?;
        let counters = users
            .entry(user.clone())
            .or_default()
            .token_usage
            .entry(model.to_string())
            .or_default();
        *counters += usage;
        debug!(user = %user, model, total = ?*counters, "Token usage recorded");
        Ok(())
    }

    async fn start_new_dialog(&self, user: &UserId) -> Result<DialogId, StorageError> {
        let id = self.write_users()?.entry(user.clone()).or_default().open_dialog();
        debug!(user = %user, dialog = %id, "New dialog opened");
        Ok(id)
    }

    async fn record_exchange(&self, prompt: &str, completion: &str) -> Result<(), StorageError> {
        self.exchanges
            .write()
            .map_err(|_| poisoned("exchanges"))?
            .push(Exchange {
                prompt: prompt.to_string(),
                completion: completion.to_string(),
                recorded_at: Utc::now(),
            });
        Ok(())
    }
}
