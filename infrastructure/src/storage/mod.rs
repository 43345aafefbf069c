//! Dialog storage adapters
//!
//! Provides [`InMemoryDialogStore`], a process-local implementation of the
//! [`DialogStore`](turnstile_application::DialogStore) port.

mod memory;

pub use memory::{Exchange, InMemoryDialogStore};
