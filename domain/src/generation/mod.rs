//! Generation output model.
//!
//! - [`event::PartialAnswerEvent`] — cumulative answer increment
//! - [`event::AnswerStatus`] — in-progress vs finished

pub mod event;
