//! Dialog domain.
//!
//! - [`entities::DialogTurn`] — one `{user, bot}` pair of a dialog
//! - [`entities::UserAttributes`] — per-user metadata read at turn start
//! - [`usage::TokenUsage`] — token counters accrued per model
//! - [`notice`] — user-facing notice texts

pub mod entities;
pub mod notice;
pub mod usage;
