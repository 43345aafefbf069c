//! Presentation layer for turnstile
//!
//! This crate contains the CLI definition, the console transport and the
//! interactive chat interface.

pub mod chat;
pub mod cli;
pub mod output;

// Re-export commonly used types
pub use chat::{ChatRepl, ReplInput};
pub use cli::commands::Cli;
pub use output::console::ConsoleTransport;
pub use output::formatter::{strip_html, to_console_text};
