//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod session_controller;
pub mod session_registry;
pub mod stream_reducer;
