//! Application-level configuration.
//!
//! - [`SessionConfig`] — turn control (dialog timeout, default model, chat modes)
//! - [`StreamConfig`] — partial answer throttling

pub mod session_config;

pub use session_config::{DEFAULT_MODEL, SessionConfig, StreamConfig};
