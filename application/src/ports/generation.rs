//! Generation source port
//!
//! Defines the interface to the answer-generating backend. Both streaming and
//! single-shot backends are exposed as an [`AnswerStream`] of cumulative
//! [`PartialAnswerEvent`]s, so the consumer never needs to know which one it
//! is talking to.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use turnstile_domain::{ChatMode, DialogTurn, PartialAnswerEvent};

/// Errors that can occur during generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Prompt does not fit the context window even without dialog history")]
    ContextOverflow,

    #[error("Generation cancelled")]
    Cancelled,
}

/// Everything a backend needs to answer one user message
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub message: String,
    pub dialog: Vec<DialogTurn>,
    pub mode: ChatMode,
    pub model: String,
}

/// Item carried by an [`AnswerStream`]
pub type AnswerItem = Result<PartialAnswerEvent, GenerationError>;

/// Handle for receiving partial answers from a generation.
///
/// Wraps an `mpsc::Receiver`. Dropping the handle tells the producer that
/// nobody is listening any more.
pub struct AnswerStream {
    receiver: mpsc::Receiver<AnswerItem>,
}

impl AnswerStream {
    pub fn new(receiver: mpsc::Receiver<AnswerItem>) -> Self {
        Self { receiver }
    }

    /// Create a connected sender/stream pair.
    pub fn channel(buffer: usize) -> (mpsc::Sender<AnswerItem>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }

    /// A stream that yields exactly one item.
    pub fn once(item: AnswerItem) -> Self {
        let (tx, stream) = Self::channel(1);
        // Capacity is 1 and the receiver is alive, so this cannot fail.
        let _ = tx.try_send(item);
        stream
    }

    /// Wait for the next item. `None` once the producer is done.
    pub async fn next(&mut self) -> Option<AnswerItem> {
        self.receiver.recv().await
    }
}

/// Backend producing answers for user messages
///
/// Only [`complete`](GenerationSource::complete) is required. The default
/// [`generate`](GenerationSource::generate) wraps its result in a single
/// `Finished` event; streaming backends override it.
#[async_trait]
pub trait GenerationSource: Send + Sync {
    /// Produce the whole answer in one call.
    async fn complete(&self, request: &GenerationRequest) -> Result<PartialAnswerEvent, GenerationError>;

    /// Start generating an answer.
    ///
    /// Implementations must stop producing once `cancel` fires and must emit
    /// exactly one terminal event when they run to completion.
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<AnswerStream, GenerationError> {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = self.complete(&request) => result?,
        };
        let event = PartialAnswerEvent::finished(event.answer, event.usage, event.dropped_messages);
        Ok(AnswerStream::once(Ok(event)))
    }
}

/// Forces the single-shot path of any backend.
///
/// Used when streaming is disabled in configuration: the wrapped source's
/// own `generate` override is bypassed.
pub struct SingleShot<S>(pub S);

#[async_trait]
impl<S: GenerationSource> GenerationSource for SingleShot<S> {
    async fn complete(&self, request: &GenerationRequest) -> Result<PartialAnswerEvent, GenerationError> {
        self.0.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnstile_domain::{AnswerStatus, TokenUsage};

    struct Echo;

    #[async_trait]
    impl GenerationSource for Echo {
        async fn complete(
            &self,
            request: &GenerationRequest,
        ) -> Result<PartialAnswerEvent, GenerationError> {
            Ok(PartialAnswerEvent::in_progress(
                request.message.to_uppercase(),
                TokenUsage::new(2, 1),
                0,
            ))
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
            _cancel: CancellationToken,
        ) -> Result<AnswerStream, GenerationError> {
            Err(GenerationError::Backend("streaming path used".to_string()))
        }
    }

    fn request(message: &str) -> GenerationRequest {
        GenerationRequest {
            message: message.to_string(),
            dialog: Vec::new(),
            mode: ChatMode::assistant(),
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn single_shot_yields_exactly_one_finished_event() {
        let source = SingleShot(Echo);
        let mut stream = source
            .generate(request("hi"), CancellationToken::new())
            .await
            .unwrap();

        let event = stream.next().await.unwrap().unwrap();
        assert_eq!(event.status, AnswerStatus::Finished);
        assert_eq!(event.answer, "HI");
        assert_eq!(event.usage, TokenUsage::new(2, 1));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn single_shot_observes_prior_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result = SingleShot(Echo).generate(request("hi"), token).await;
        assert!(matches!(result, Err(GenerationError::Cancelled)));
    }
}
