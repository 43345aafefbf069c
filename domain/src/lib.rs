//! Domain layer for turnstile
//!
//! This crate contains the value types shared by every layer. It has no
//! dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **Turn**: one user message and the answer generated for it
//! - **Dialog**: the ordered history of turns since the last reset
//! - **Partial answer**: a cumulative snapshot of an answer being generated
//! - **Chat mode**: the persona and markup an answer is produced in

pub mod core;
pub mod dialog;
pub mod generation;
pub mod mode;
pub mod util;

// Re-export commonly used types
pub use core::{error::DomainError, user::UserId};
pub use dialog::{
    entities::{DialogId, DialogTurn, UserAttributes},
    notice,
    usage::TokenUsage,
};
pub use generation::event::{AnswerStatus, PartialAnswerEvent};
pub use mode::{
    chat_mode::{ChatMode, ChatModes, DEFAULT_CHAT_MODE},
    text_format::TextFormat,
};
