//! Application layer for turnstile
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{SessionConfig, StreamConfig};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    dialog_store::{DialogStore, StorageError},
    generation::{
        AnswerItem, AnswerStream, GenerationError, GenerationRequest, GenerationSource, SingleShot,
    },
    transport::{MessageRef, Transport, TransportError},
};
pub use use_cases::session_controller::{
    SessionController, TurnError, TurnOutcome, TurnRequest, TurnSummary,
};
pub use use_cases::session_registry::{ActiveTaskGuard, SessionRegistry, SlotGuard, TaskHandle};
pub use use_cases::stream_reducer::{Reduced, ReducerDecision, StreamReducer};
