//! Partial-answer events produced by a generation backend.
//!
//! A generation yields a sequence of [`PartialAnswerEvent`]s carrying the
//! *cumulative* answer so far. Streaming backends emit many `InProgress`
//! events before a single `Finished` one; single-shot backends emit only
//! the `Finished` event.

use crate::dialog::usage::TokenUsage;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a partial answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    InProgress,
    Finished,
}

/// One increment of a generation's output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialAnswerEvent {
    pub status: AnswerStatus,
    /// Cumulative answer text, not a delta.
    pub answer: String,
    /// Token counts accrued so far for this turn.
    pub usage: TokenUsage,
    /// How many of the earliest dialog turns were left out of the prompt
    /// to fit the backend's context budget.
    pub dropped_messages: usize,
}

impl PartialAnswerEvent {
    pub fn in_progress(answer: impl Into<String>, usage: TokenUsage, dropped_messages: usize) -> Self {
        Self {
            status: AnswerStatus::InProgress,
            answer: answer.into(),
            usage,
            dropped_messages,
        }
    }

    pub fn finished(answer: impl Into<String>, usage: TokenUsage, dropped_messages: usize) -> Self {
        Self {
            status: AnswerStatus::Finished,
            answer: answer.into(),
            usage,
            dropped_messages,
        }
    }

    /// Returns true if this event closes the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, AnswerStatus::Finished)
    }
}
