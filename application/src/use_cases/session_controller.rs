//! Session controller
//!
//! Runs one user turn end to end under single-flight discipline:
//!
//! 1. Acquire the user's slot in the [`SessionRegistry`] (waits while a
//!    previous turn of the same user is still running)
//! 2. Restart the dialog if the user was idle past the timeout
//! 3. Spawn the generation as a cancellable task and register its handle
//! 4. Relay reduced partial answers to the [`Transport`] as message edits
//! 5. Persist the finished turn through the [`DialogStore`]
//! 6. Report the outcome (cancel notice, failure diagnostic) to the user
//!
//! Turn states: `Idle → SlotAcquired → Generating → {Finished | Cancelled |
//! Failed} → SlotReleased`. The handle registration and the slot are both
//! scope guards, so every outcome passes through `SlotReleased`.

use crate::config::SessionConfig;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::dialog_store::{DialogStore, StorageError};
use crate::ports::generation::{GenerationError, GenerationRequest, GenerationSource};
use crate::ports::transport::{MessageRef, Transport, TransportError};
use crate::use_cases::session_registry::{SessionRegistry, TaskHandle};
use crate::use_cases::stream_reducer::StreamReducer;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use turnstile_domain::util::truncate_str;
use turnstile_domain::{
    ChatMode, DialogId, DialogTurn, PartialAnswerEvent, TextFormat, TokenUsage, UserId, notice,
};

/// Errors that end a turn as [`TurnOutcome::Failed`]
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Generation ended without a final answer")]
    MissingFinalAnswer,

    #[error("Generation task aborted: {0}")]
    TaskAborted(String),

    #[error("Unknown chat mode: {0}")]
    UnknownChatMode(String),
}

/// One incoming user message
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user: UserId,
    pub text: String,
    /// Whether an idle dialog may be restarted before answering. Disabled
    /// when a message is re-submitted on the user's behalf.
    pub use_dialog_timeout: bool,
}

impl TurnRequest {
    pub fn new(user: UserId, text: impl Into<String>) -> Self {
        Self {
            user,
            text: text.into(),
            use_dialog_timeout: true,
        }
    }

    pub fn without_dialog_timeout(mut self) -> Self {
        self.use_dialog_timeout = false;
        self
    }
}

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    /// Final answer as delivered (capped to the transport's size limit).
    pub answer: String,
    pub usage: TokenUsage,
    pub dropped_messages: usize,
    /// Whether the dialog was restarted for inactivity before this turn.
    pub dialog_reset: bool,
}

/// Terminal state of a turn
#[derive(Debug)]
pub enum TurnOutcome {
    Completed(TurnSummary),
    /// Cancelled mid-flight; `usage` is what was accrued and recorded.
    Cancelled { usage: TokenUsage },
    Failed(TurnError),
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TurnOutcome::Cancelled { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TurnOutcome::Failed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Completed(_) => "turn_completed",
            TurnOutcome::Cancelled { .. } => "turn_cancelled",
            TurnOutcome::Failed(_) => "turn_failed",
        }
    }
}

/// State gathered before generation starts
struct PreparedTurn {
    user: UserId,
    message: String,
    mode: ChatMode,
    model: String,
    dialog: Vec<DialogTurn>,
    dialog_reset: bool,
}

/// What the generation task saw before it ended
#[derive(Default)]
struct TurnProgress {
    usage: TokenUsage,
}

enum Interrupted {
    Cancelled,
    Failed(TurnError),
}

/// Terminal answer that still has to be shown and persisted
struct FinalAnswer {
    event: PartialAnswerEvent,
    placeholder: MessageRef,
    not_before: Option<Instant>,
}

/// Use case running user turns against a generation backend.
#[derive(Clone)]
pub struct SessionController {
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn DialogStore>,
    source: Arc<dyn GenerationSource>,
    config: Arc<SessionConfig>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl SessionController {
    pub fn new(
        registry: Arc<SessionRegistry>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn DialogStore>,
        source: Arc<dyn GenerationSource>,
        config: SessionConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            store,
            source,
            config: Arc::new(config),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Signal cancellation to the user's running turn, if any.
    pub fn request_cancel(&self, user: &UserId) -> bool {
        self.registry.request_cancel(user)
    }

    /// Whether a generation is currently running for the user.
    pub fn is_busy(&self, user: &UserId) -> bool {
        self.registry.is_busy(user)
    }

    /// Run one turn. Never returns an error: failures are reported to the
    /// user and surface as [`TurnOutcome::Failed`].
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnOutcome {
        let span = info_span!("turn", user = %request.user);
        async move {
            let _slot = self.registry.acquire_slot(&request.user).await;
            self.conversation_logger.log(ConversationEvent::new(
                "turn_started",
                json!({
                    "user": request.user.as_str(),
                    "message": request.text,
                }),
            ));

            let outcome = self.run_turn(&request).await;
            self.report(&request.user, &outcome).await;
            outcome
        }
        .instrument(span)
        .await
    }

    /// Restart the user's dialog on explicit request.
    pub async fn start_new_dialog(&self, user: &UserId) -> Result<DialogId, TurnError> {
        let _slot = self.registry.acquire_slot(user).await;
        let attributes = self.store.user_attributes(user).await?.unwrap_or_default();
        let mode = self
            .config
            .chat_modes
            .resolve(attributes.current_chat_mode.as_deref());

        let dialog_id = self.store.start_new_dialog(user).await?;
        info!(user = %user, dialog = %dialog_id, "Started new dialog on request");
        self.log_dialog_reset(user, &dialog_id, "command");
        self.notify(user, &notice::new_dialog(mode), TextFormat::Html)
            .await;
        Ok(dialog_id)
    }

    /// Switch the user's chat mode. Starts a new dialog in that mode.
    pub async fn switch_chat_mode(&self, user: &UserId, mode_id: &str) -> Result<ChatMode, TurnError> {
        let mode = self
            .config
            .chat_modes
            .get(mode_id)
            .cloned()
            .ok_or_else(|| TurnError::UnknownChatMode(mode_id.to_string()))?;

        let _slot = self.registry.acquire_slot(user).await;
        self.store.set_chat_mode(user, &mode.id).await?;
        let dialog_id = self.store.start_new_dialog(user).await?;
        info!(user = %user, mode = %mode.id, dialog = %dialog_id, "Switched chat mode");
        self.log_dialog_reset(user, &dialog_id, "mode_switch");
        self.notify(user, &notice::new_dialog(&mode), TextFormat::Html)
            .await;
        Ok(mode)
    }

    async fn run_turn(&self, request: &TurnRequest) -> TurnOutcome {
        let prepared = match self.prepare(request).await {
            Ok(prepared) => prepared,
            Err(e) => return TurnOutcome::Failed(e),
        };

        let token = CancellationToken::new();
        let active = self
            .registry
            .register_task(&request.user, TaskHandle::new(token.clone()));
        let task_id = active.handle().id();
        debug!(task = task_id, "Generation task registered");

        let this = self.clone();
        let task = tokio::spawn(
            async move { this.generate(prepared, task_id, token).await }.in_current_span(),
        );

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => TurnOutcome::Failed(TurnError::TaskAborted(format!(
                "generation task panicked: {e}"
            ))),
            Err(e) => TurnOutcome::Failed(TurnError::TaskAborted(e.to_string())),
        };
        drop(active);
        outcome
    }

    async fn prepare(&self, request: &TurnRequest) -> Result<PreparedTurn, TurnError> {
        let user = &request.user;
        let attributes = self.store.user_attributes(user).await?.unwrap_or_default();
        let mode = self
            .config
            .chat_modes
            .resolve(attributes.current_chat_mode.as_deref())
            .clone();

        let now = Utc::now();
        let mut dialog_reset = false;
        if request.use_dialog_timeout
            && attributes.idle_longer_than(self.config.new_dialog_timeout, now)
        {
            let dialog = self.store.dialog_messages(user, None).await?;
            if !dialog.is_empty() {
                let dialog_id = self.store.start_new_dialog(user).await?;
                info!(dialog = %dialog_id, "Starting new dialog after inactivity");
                self.log_dialog_reset(user, &dialog_id, "timeout");
                self.notify(
                    user,
                    &notice::new_dialog_due_to_timeout(&mode),
                    TextFormat::Html,
                )
                .await;
                dialog_reset = true;
            }
        }
        self.store.set_last_interaction(user, now).await?;

        let model = attributes
            .current_model
            .unwrap_or_else(|| self.config.default_model.clone());
        let dialog = self.store.dialog_messages(user, None).await?;

        Ok(PreparedTurn {
            user: user.clone(),
            message: request.text.clone(),
            mode,
            model,
            dialog,
            dialog_reset,
        })
    }

    /// Body of the spawned generation task.
    async fn generate(
        &self,
        turn: PreparedTurn,
        task_id: u64,
        token: CancellationToken,
    ) -> TurnOutcome {
        let mut progress = TurnProgress::default();

        let streamed = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Interrupted::Cancelled),
            result = self.stream_answer(&turn, &token, &mut progress) => {
                result.map_err(|e| match e {
                    TurnError::Generation(GenerationError::Cancelled) => Interrupted::Cancelled,
                    other => Interrupted::Failed(other),
                })
            }
        };

        match streamed {
            // The final answer is in: cancel requests no longer reach the turn.
            Ok(answer) => {
                self.registry.clear_active_task_if(&turn.user, task_id);
                match self.deliver(&turn, answer).await {
                    Ok(summary) => TurnOutcome::Completed(summary),
                    Err(e) => TurnOutcome::Failed(e),
                }
            }
            Err(Interrupted::Cancelled) => {
                info!(
                    input_tokens = progress.usage.input_tokens,
                    output_tokens = progress.usage.output_tokens,
                    "Turn cancelled"
                );
                if let Err(e) = self
                    .store
                    .record_token_usage(&turn.user, &turn.model, progress.usage)
                    .await
                {
                    warn!("Could not record token usage of cancelled turn: {}", e);
                }
                TurnOutcome::Cancelled {
                    usage: progress.usage,
                }
            }
            Err(Interrupted::Failed(e)) => TurnOutcome::Failed(e),
        }
    }

    /// Run the generation and relay in-progress answers. Returns the
    /// (capped) final event without showing it.
    async fn stream_answer(
        &self,
        turn: &PreparedTurn,
        token: &CancellationToken,
        progress: &mut TurnProgress,
    ) -> Result<FinalAnswer, TurnError> {
        let placeholder = self.transport.send_placeholder(&turn.user).await?;
        if let Err(e) = self.transport.signal_typing(&turn.user).await {
            debug!("Typing indicator failed: {}", e);
        }

        let request = GenerationRequest {
            message: turn.message.clone(),
            dialog: turn.dialog.clone(),
            mode: turn.mode.clone(),
            model: turn.model.clone(),
        };
        let mut stream = self.source.generate(request, token.child_token()).await?;

        let mut reducer = StreamReducer::new(&self.config.stream);
        let mut next_edit_at: Option<Instant> = None;

        while let Some(item) = stream.next().await {
            let reduced = reducer.reduce(item?);
            progress.usage = reduced.event.usage;

            if reduced.event.is_terminal() {
                return Ok(FinalAnswer {
                    event: reduced.event,
                    placeholder,
                    not_before: next_edit_at,
                });
            }

            if reduced.should_forward() {
                if let Some(at) = next_edit_at {
                    tokio::time::sleep_until(at).await;
                }
                self.push_edit(&placeholder, &reduced.event.answer, turn.mode.format)
                    .await?;
                next_edit_at = Some(Instant::now() + self.config.stream.min_interval);
            }
        }
        Err(TurnError::MissingFinalAnswer)
    }

    /// Show the final answer, then persist the turn.
    async fn deliver(
        &self,
        turn: &PreparedTurn,
        answer: FinalAnswer,
    ) -> Result<TurnSummary, TurnError> {
        if let Some(at) = answer.not_before {
            tokio::time::sleep_until(at).await;
        }
        self.push_edit(&answer.placeholder, &answer.event.answer, turn.mode.format)
            .await?;
        self.finish(turn, answer.event).await
    }

    /// Edit the placeholder, falling back to plain text once.
    async fn push_edit(
        &self,
        message: &MessageRef,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError> {
        match self.transport.edit_message(message, text, format).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_modified() => Ok(()),
            Err(e) if format.is_plain() => Err(e),
            Err(e) => {
                warn!(
                    "Formatted edit rejected ({}), retrying as plain text",
                    e
                );
                match self
                    .transport
                    .edit_message(message, text, TextFormat::Plain)
                    .await
                {
                    Err(e) if e.is_not_modified() => Ok(()),
                    result => result,
                }
            }
        }
    }

    /// Persist a finished turn.
    async fn finish(
        &self,
        turn: &PreparedTurn,
        event: PartialAnswerEvent,
    ) -> Result<TurnSummary, TurnError> {
        let mut dialog = self.store.dialog_messages(&turn.user, None).await?;
        dialog.push(DialogTurn::new(turn.message.clone(), event.answer.clone()));
        self.store
            .set_dialog_messages(&turn.user, None, dialog)
            .await?;
        self.store
            .record_token_usage(&turn.user, &turn.model, event.usage)
            .await?;

        if let Err(e) = self
            .store
            .record_exchange(&turn.message, &event.answer)
            .await
        {
            warn!("Could not record exchange: {}", e);
        }

        if let Some(text) = notice::context_trimmed(event.dropped_messages) {
            self.notify(&turn.user, &text, TextFormat::Html).await;
        }

        info!(
            input_tokens = event.usage.input_tokens,
            output_tokens = event.usage.output_tokens,
            dropped = event.dropped_messages,
            "Turn completed: {}",
            truncate_str(&event.answer, 80)
        );

        Ok(TurnSummary {
            answer: event.answer,
            usage: event.usage,
            dropped_messages: event.dropped_messages,
            dialog_reset: turn.dialog_reset,
        })
    }

    /// Tell the user how the turn ended and log it.
    async fn report(&self, user: &UserId, outcome: &TurnOutcome) {
        let payload = match outcome {
            TurnOutcome::Completed(summary) => json!({
                "user": user.as_str(),
                "answer": summary.answer,
                "input_tokens": summary.usage.input_tokens,
                "output_tokens": summary.usage.output_tokens,
                "dropped_messages": summary.dropped_messages,
            }),
            TurnOutcome::Cancelled { usage } => {
                self.notify(user, notice::CANCELLED, TextFormat::Html).await;
                json!({
                    "user": user.as_str(),
                    "input_tokens": usage.input_tokens,
                    "output_tokens": usage.output_tokens,
                })
            }
            TurnOutcome::Failed(e) => {
                let details = format!("{e:?}");
                error!(error = %details, "Turn failed: {}", e);
                self.notify(
                    user,
                    &notice::turn_failed(&e.to_string(), &details),
                    TextFormat::Plain,
                )
                .await;
                json!({
                    "user": user.as_str(),
                    "error": e.to_string(),
                    "details": details,
                })
            }
        };
        self.conversation_logger
            .log(ConversationEvent::new(outcome.label(), payload));
    }

    fn log_dialog_reset(&self, user: &UserId, dialog_id: &DialogId, reason: &str) {
        self.conversation_logger.log(ConversationEvent::new(
            "dialog_reset",
            json!({
                "user": user.as_str(),
                "dialog_id": dialog_id.as_str(),
                "reason": reason,
            }),
        ));
    }

    /// Best-effort notice; a failing transport is only logged.
    async fn notify(&self, user: &UserId, text: &str, format: TextFormat) {
        if let Err(e) = self.transport.send_notice(user, text, format).await {
            warn!(user = %user, "Could not deliver notice: {}", e);
        }
    }
}
