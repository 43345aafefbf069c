//! REPL (Read-Eval-Print Loop) for interactive chat

use super::input::ReplInput;
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, warn};
use turnstile_application::{SessionController, Transport, TurnError, TurnOutcome, TurnRequest};
use turnstile_domain::{TextFormat, UserId, notice};

/// Interactive chat REPL
///
/// Every message runs as its own task, so the prompt stays responsive and
/// `/cancel` can reach an answer that is still being generated.
pub struct ChatRepl {
    controller: SessionController,
    transport: Arc<dyn Transport>,
    user: UserId,
}

impl ChatRepl {
    /// Create a new ChatRepl
    pub fn new(controller: SessionController, transport: Arc<dyn Transport>, user: UserId) -> Self {
        Self {
            controller,
            transport,
            user,
        }
    }

    /// Run the interactive REPL on stdin
    pub async fn run(&self) -> std::io::Result<()> {
        self.print_welcome();
        self.run_with(BufReader::new(tokio::io::stdin())).await
    }

    /// Run the REPL over any line source. Returns at `/quit` or end of input,
    /// once every started task has finished.
    pub async fn run_with<R: AsyncBufRead + Unpin>(&self, reader: R) -> std::io::Result<()> {
        let mut lines = reader.lines();
        let mut tasks = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            while let Some(done) = tasks.try_join_next() {
                log_join(done);
            }

            match ReplInput::parse(&line) {
                ReplInput::Empty => {}
                ReplInput::Message(text) => {
                    if self.controller.is_busy(&self.user) {
                        self.notify(notice::STILL_ANSWERING).await;
                        continue;
                    }
                    let controller = self.controller.clone();
                    let request = TurnRequest::new(self.user.clone(), text);
                    tasks.spawn(async move {
                        let outcome = controller.handle_turn(request).await;
                        log_outcome(&outcome);
                    });
                }
                ReplInput::Cancel => {
                    if !self.controller.request_cancel(&self.user) {
                        println!("{}", "Nothing to cancel".dimmed());
                    }
                }
                ReplInput::New => {
                    let controller = self.controller.clone();
                    let user = self.user.clone();
                    tasks.spawn(async move {
                        if let Err(e) = controller.start_new_dialog(&user).await {
                            warn!("Could not start a new dialog: {}", e);
                        }
                    });
                }
                ReplInput::Mode(Some(mode)) => {
                    if self.controller.config().chat_modes.get(&mode).is_none() {
                        println!("Unknown mode: {}", mode);
                        self.print_modes();
                        continue;
                    }
                    let controller = self.controller.clone();
                    let user = self.user.clone();
                    tasks.spawn(async move {
                        if let Err(e) = controller.switch_chat_mode(&user, &mode).await {
                            warn!("Could not switch chat mode: {}", e);
                        }
                    });
                }
                ReplInput::Mode(None) => self.print_modes(),
                ReplInput::Help => self.print_help(),
                ReplInput::Quit => {
                    self.controller.request_cancel(&self.user);
                    println!("Bye!");
                    break;
                }
                ReplInput::Unknown(command) => {
                    println!("Unknown command: {}", command);
                    println!("Type /help for available commands");
                }
            }
        }

        while let Some(done) = tasks.join_next().await {
            log_join(done);
        }
        Ok(())
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self
            .transport
            .send_notice(&self.user, text, TextFormat::Html)
            .await
        {
            warn!("Could not show notice: {}", e);
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│              Turnstile - Chat               │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("User: {}", self.user.to_string().cyan());
        self.print_help();
    }

    fn print_help(&self) {
        println!();
        println!("Commands:");
        println!("  /cancel, /c       - Cancel the answer being generated");
        println!("  /new, /n          - Start a new dialog");
        println!("  /mode <id>, /m    - Switch chat mode (no id lists modes)");
        println!("  /help, /h, /?     - Show this help");
        println!("  /quit, /exit, /q  - Exit chat");
        println!();
    }

    fn print_modes(&self) {
        println!();
        println!("Chat modes:");
        for mode in self.controller.config().chat_modes.iter() {
            println!("  {:<12} {}", mode.id.yellow(), mode.name);
        }
        println!();
    }
}

fn log_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Completed(summary) => debug!(
            chars = summary.answer.chars().count(),
            input_tokens = summary.usage.input_tokens,
            output_tokens = summary.usage.output_tokens,
            "Turn completed"
        ),
        TurnOutcome::Cancelled { usage } => debug!(?usage, "Turn cancelled"),
        TurnOutcome::Failed(TurnError::UnknownChatMode(mode)) => {
            debug!(mode = %mode, "Turn rejected")
        }
        TurnOutcome::Failed(e) => debug!(error = %e, "Turn failed"),
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        warn!("Chat task ended abnormally: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::console::ConsoleTransport;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::io::{self, Write};
    use std::sync::Mutex;
    use turnstile_application::{
        DialogStore, GenerationError, GenerationRequest, GenerationSource, SessionConfig,
        SessionRegistry, StorageError,
    };
    use turnstile_domain::{DialogId, DialogTurn, PartialAnswerEvent, TokenUsage, UserAttributes};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Store that keeps only the current dialog.
    #[derive(Default)]
    struct OneDialogStore {
        turns: Mutex<Vec<DialogTurn>>,
    }

    #[async_trait]
    impl DialogStore for OneDialogStore {
        async fn dialog_messages(
            &self,
            _user: &UserId,
            _dialog_id: Option<&DialogId>,
        ) -> Result<Vec<DialogTurn>, StorageError> {
            Ok(self.turns.lock().unwrap().clone())
        }

        async fn set_dialog_messages(
            &self,
            _user: &UserId,
            _dialog_id: Option<&DialogId>,
            turns: Vec<DialogTurn>,
        ) -> Result<(), StorageError> {
            *self.turns.lock().unwrap() = turns;
            Ok(())
        }

        async fn user_attributes(
            &self,
            _user: &UserId,
        ) -> Result<Option<UserAttributes>, StorageError> {
            Ok(None)
        }

        async fn set_last_interaction(
            &self,
            _user: &UserId,
            _at: DateTime<Utc>,
        ) -> Result<(), StorageError> {
            Ok(())
        }

        async fn set_chat_mode(&self, _user: &UserId, _mode: &str) -> Result<(), StorageError> {
            Ok(())
        }

        async fn record_token_usage(
            &self,
            _user: &UserId,
            _model: &str,
            _usage: TokenUsage,
        ) -> Result<(), StorageError> {
            Ok(())
        }

        async fn start_new_dialog(&self, _user: &UserId) -> Result<DialogId, StorageError> {
            self.turns.lock().unwrap().clear();
            Ok(DialogId::new("d"))
        }

        async fn record_exchange(&self, _prompt: &str, _completion: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct Shout;

    #[async_trait]
    impl GenerationSource for Shout {
        async fn complete(
            &self,
            request: &GenerationRequest,
        ) -> Result<PartialAnswerEvent, GenerationError> {
            Ok(PartialAnswerEvent::finished(
                request.message.to_uppercase(),
                TokenUsage::new(1, 1),
                0,
            ))
        }
    }

    fn repl(out: SharedBuf, store: Arc<OneDialogStore>) -> ChatRepl {
        let transport: Arc<dyn Transport> = Arc::new(ConsoleTransport::new(out).without_color());
        let controller = SessionController::new(
            Arc::new(SessionRegistry::new()),
            transport.clone(),
            store,
            Arc::new(Shout),
            SessionConfig::default(),
        );
        ChatRepl::new(controller, transport, UserId::from("tester"))
    }

    #[tokio::test]
    async fn messages_are_answered_before_the_repl_returns() {
        let out = SharedBuf::default();
        let store = Arc::new(OneDialogStore::default());
        let repl = repl(out.clone(), store.clone());

        repl.run_with(&b"hello there\n"[..]).await.unwrap();

        assert!(out.text().contains("HELLO THERE"));
        assert_eq!(
            *store.turns.lock().unwrap(),
            vec![DialogTurn::new("hello there", "HELLO THERE")]
        );
    }

    #[tokio::test]
    async fn quit_stops_reading_input() {
        let out = SharedBuf::default();
        let store = Arc::new(OneDialogStore::default());
        let repl = repl(out.clone(), store.clone());

        repl.run_with(&b"/quit\nnever sent\n"[..]).await.unwrap();

        assert!(!out.text().contains("NEVER SENT"));
        assert!(store.turns.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_dialog_command_resets_history() {
        let out = SharedBuf::default();
        let store = Arc::new(OneDialogStore::default());
        store
            .turns
            .lock()
            .unwrap()
            .push(DialogTurn::new("old", "OLD"));
        let repl = repl(out.clone(), store.clone());

        repl.run_with(&b"/new\n"[..]).await.unwrap();

        assert!(store.turns.lock().unwrap().is_empty());
        assert!(out.text().contains("Starting new dialog"));
    }
}
