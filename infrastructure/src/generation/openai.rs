//! OpenAI-compatible generation source.
//!
//! Works with any backend that speaks the `/chat/completions` API. The
//! single-shot path posts one request and waits for the whole answer; the
//! streaming path reads the SSE body and emits a cumulative partial answer
//! for every content delta.

use super::error::OpenAiError;
use super::prompt::{ChatMessage, Prompt, estimated_usage};
use super::sse::SseDecoder;
use crate::config::FileGenerationConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};
use turnstile_application::{
    AnswerItem, AnswerStream, GenerationError, GenerationRequest, GenerationSource,
};
use turnstile_domain::{PartialAnswerEvent, TokenUsage};

const STREAM_BUFFER: usize = 32;

/// Generation source backed by an OpenAI-compatible HTTP API.
pub struct OpenAiGenerationSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    request_timeout: Duration,
    max_context_chars: usize,
}

impl OpenAiGenerationSource {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let defaults = FileGenerationConfig::default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            temperature: defaults.temperature,
            request_timeout: Duration::from_secs(defaults.request_timeout_secs),
            max_context_chars: defaults.max_context_chars,
        }
    }

    pub fn from_config(config: &FileGenerationConfig) -> Result<Self, OpenAiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self::new(client, config.base_url.as_str(), config.resolve_api_key())
            .with_temperature(config.temperature)
            .with_request_timeout(Duration::from_secs(config.request_timeout_secs))
            .with_max_context_chars(config.max_context_chars))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_context_chars(mut self, max: usize) -> Self {
        self.max_context_chars = max;
        self
    }

    async fn post(&self, body: &CompletionRequest<'_>) -> Result<Response, OpenAiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self.client.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        // A streamed body may legitimately take longer than any fixed limit.
        if !body.stream {
            req = req.timeout(self.request_timeout);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api { status, message });
        }
        Ok(response)
    }

    /// Send the request, dropping one more dialog turn each time the backend
    /// reports a context overflow.
    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<(Response, Prompt), GenerationError> {
        let mut min_dropped = 0;
        loop {
            let prompt = Prompt::build(request, self.max_context_chars, min_dropped)?;
            let body = CompletionRequest {
                model: &request.model,
                messages: &prompt.messages,
                temperature: self.temperature,
                stream,
                stream_options: stream.then_some(StreamOptions {
                    include_usage: true,
                }),
            };

            match self.post(&body).await {
                Ok(response) => return Ok((response, prompt)),
                Err(e) if e.is_context_overflow() => {
                    debug!(
                        dropped = prompt.dropped_turns,
                        "Backend reported context overflow, dropping another turn"
                    );
                    min_dropped = prompt.dropped_turns + 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl GenerationSource for OpenAiGenerationSource {
    async fn complete(
        &self,
        request: &GenerationRequest,
    ) -> Result<PartialAnswerEvent, GenerationError> {
        let (response, prompt) = self.send(request, false).await?;
        let body = response.bytes().await.map_err(OpenAiError::from)?;
        let completion: Completion = serde_json::from_slice(&body).map_err(OpenAiError::from)?;

        let answer = completion
            .choices
            .into_iter()
            .next()
            .ok_or(OpenAiError::NoChoices)?
            .message
            .content
            .unwrap_or_default();
        let usage = completion
            .usage
            .map(TokenUsage::from)
            .unwrap_or_else(|| estimated_usage(prompt.estimated_tokens(), &answer));

        Ok(PartialAnswerEvent::finished(answer, usage, prompt.dropped_turns))
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<AnswerStream, GenerationError> {
        let (response, prompt) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = self.send(&request, true) => result?,
        };

        let (tx, stream) = AnswerStream::channel(STREAM_BUFFER);
        let relay = StreamRelay {
            prompt_tokens: prompt.estimated_tokens(),
            dropped_turns: prompt.dropped_turns,
            tx,
            cancel,
        };
        tokio::spawn(relay.run(Box::pin(response.bytes_stream())).in_current_span());
        Ok(stream)
    }
}

/// Turns an SSE body into cumulative partial answers.
struct StreamRelay {
    prompt_tokens: u64,
    dropped_turns: usize,
    tx: mpsc::Sender<AnswerItem>,
    cancel: CancellationToken,
}

impl StreamRelay {
    async fn run<S, E>(self, mut body: S)
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let mut decoder = SseDecoder::new();
        let mut answer = String::new();
        let mut reported: Option<TokenUsage> = None;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Stream relay cancelled");
                    return;
                }
                chunk = body.next() => chunk,
            };

            let (events, body_ended) = match chunk {
                Some(Ok(bytes)) => (decoder.feed(&bytes), false),
                Some(Err(e)) => {
                    let _ = self
                        .tx
                        .send(Err(GenerationError::RequestFailed(e.to_string())))
                        .await;
                    return;
                }
                None => (decoder.finish().into_iter().collect(), true),
            };

            for event in events {
                if event.is_done() {
                    self.finish(answer, reported).await;
                    return;
                }
                let parsed: StreamChunk = match serde_json::from_str(&event.data) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(error = %e, "Skipping undecodable stream chunk");
                        continue;
                    }
                };
                if let Some(usage) = parsed.usage {
                    reported = Some(usage.into());
                }
                let delta = parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                    .unwrap_or_default();
                if delta.is_empty() {
                    continue;
                }
                answer.push_str(&delta);
                let usage = reported.unwrap_or_else(|| estimated_usage(self.prompt_tokens, &answer));
                let event = PartialAnswerEvent::in_progress(answer.as_str(), usage, self.dropped_turns);
                if self.tx.send(Ok(event)).await.is_err() {
                    debug!("Answer stream dropped by consumer");
                    return;
                }
            }

            if body_ended {
                // Body closed without the [DONE] sentinel.
                self.finish(answer, reported).await;
                return;
            }
        }
    }

    async fn finish(&self, answer: String, reported: Option<TokenUsage>) {
        let usage = reported.unwrap_or_else(|| estimated_usage(self.prompt_tokens, &answer));
        let event = PartialAnswerEvent::finished(answer, usage, self.dropped_turns);
        let _ = self.tx.send(Ok(event)).await;
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
    /// Ask for a final usage chunk when streaming.
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Deserialize, Clone, Copy)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl From<ApiUsage> for TokenUsage {
    fn from(usage: ApiUsage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}
