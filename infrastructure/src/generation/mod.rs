//! Generation backends
//!
//! [`OpenAiGenerationSource`] implements the
//! [`GenerationSource`](turnstile_application::GenerationSource) port for any
//! OpenAI-compatible chat completion API, streaming or single-shot.

mod error;
mod openai;
mod prompt;
mod sse;

pub use error::OpenAiError;
pub use openai::OpenAiGenerationSource;
pub use prompt::{ChatMessage, Prompt, estimate_tokens};
pub use sse::{SseDecoder, SseEvent};
