//! Interactive chat module
//!
//! Provides a line-based console chat on top of the session controller.

mod input;
mod repl;

pub use input::ReplInput;
pub use repl::ChatRepl;
