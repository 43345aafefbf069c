//! Stream reducer
//!
//! Decides which partial answers of a generation are worth an edit of the
//! user's message. Every answer is first capped to the transport's message
//! size; an in-progress answer is then forwarded only when its length moved
//! by at least `min_delta` characters since the last forward. The terminal
//! answer is always forwarded.
//!
//! The reducer is a pure state machine (`no forward yet` / `last forwarded =
//! X`). Pacing between forwards and the transport calls themselves belong to
//! the caller.

use crate::config::StreamConfig;
use turnstile_domain::PartialAnswerEvent;
use turnstile_domain::util::truncate_chars;

/// What to do with one reduced event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerDecision {
    Forward,
    Skip,
}

/// A partial answer after truncation, with the reducer's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduced {
    pub event: PartialAnswerEvent,
    pub decision: ReducerDecision,
}

impl Reduced {
    pub fn should_forward(&self) -> bool {
        self.decision == ReducerDecision::Forward
    }
}

pub struct StreamReducer {
    max_message_len: usize,
    min_delta: usize,
    /// Length in characters of the last forwarded text; `None` before the
    /// first forward, which compares against the empty string.
    last_forwarded_len: Option<usize>,
}

impl StreamReducer {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            max_message_len: config.max_message_len,
            min_delta: config.min_delta,
            last_forwarded_len: None,
        }
    }

    /// Truncate `event` and decide whether it should be forwarded.
    pub fn reduce(&mut self, mut event: PartialAnswerEvent) -> Reduced {
        let capped = truncate_chars(&event.answer, self.max_message_len);
        if capped.len() < event.answer.len() {
            let end = capped.len();
            event.answer.truncate(end);
        }

        let len = event.answer.chars().count();
        let previous = self.last_forwarded_len.unwrap_or(0);
        let forward = event.is_terminal() || len.abs_diff(previous) >= self.min_delta;

        let decision = if forward {
            self.last_forwarded_len = Some(len);
            ReducerDecision::Forward
        } else {
            ReducerDecision::Skip
        };
        Reduced { event, decision }
    }
}
