//! Dialog domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of one dialog (a run of turns between two resets)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogId(String);

impl DialogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One completed exchange: the user's message and the bot's final answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub user: String,
    pub bot: String,
}

impl DialogTurn {
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
        }
    }
}

/// Snapshot of the per-user attributes a turn reads before generating
///
/// Every field is optional: a freshly seen user has no stored mode or
/// model yet, and that is a normal state rather than a storage error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributes {
    pub current_chat_mode: Option<String>,
    pub current_model: Option<String>,
    pub current_dialog_id: Option<DialogId>,
    pub last_interaction: Option<DateTime<Utc>>,
}

impl UserAttributes {
    /// Whether the user has been idle for strictly longer than `timeout`.
    ///
    /// A user without a recorded interaction is never considered idle, and
    /// neither is one whose last interaction lies in the future.
    pub fn idle_longer_than(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        self.last_interaction
            .and_then(|last| now.signed_duration_since(last).to_std().ok())
            .is_some_and(|elapsed| elapsed > timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn idle_check_is_strict() {
        let now = Utc::now();
        let attrs = UserAttributes {
            last_interaction: Some(now - TimeDelta::seconds(60)),
            ..Default::default()
        };
        assert!(attrs.idle_longer_than(Duration::from_secs(59), now));
        assert!(!attrs.idle_longer_than(Duration::from_secs(60), now));
    }

    #[test]
    fn idle_check_counts_whole_days() {
        let now = Utc::now();
        let attrs = UserAttributes {
            last_interaction: Some(now - TimeDelta::days(2) + TimeDelta::seconds(5)),
            ..Default::default()
        };
        assert!(attrs.idle_longer_than(Duration::from_secs(600), now));
    }

    #[test]
    fn future_or_unknown_last_interaction_is_not_idle() {
        let now = Utc::now();
        assert!(!UserAttributes::default().idle_longer_than(Duration::ZERO, now));
        let attrs = UserAttributes {
            last_interaction: Some(now + TimeDelta::seconds(30)),
            ..Default::default()
        };
        assert!(!attrs.idle_longer_than(Duration::ZERO, now));
    }
}
