//! Console transport
//!
//! Renders a user's chat on a terminal. The placeholder message is printed
//! once; later edits that only extend the shown text print the new suffix,
//! so a streamed answer appears to grow in place. Any other edit reprints
//! the whole message on a new line.
//!
//! Only the latest message of each user stays editable: a new placeholder
//! for a user forgets that user's previous answer.

use super::formatter::to_console_text;
use async_trait::async_trait;
use colored::{ColoredString, Colorize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use turnstile_application::{MessageRef, Transport, TransportError};
use turnstile_domain::{TextFormat, UserId, notice};

const BOT_PREFIX: &str = "bot ▸ ";

/// What a user's latest message currently shows.
struct Shown {
    id: i64,
    raw: String,
    rendered: Option<String>,
}

struct ConsoleState<W> {
    out: W,
    messages: HashMap<UserId, Shown>,
    next_id: i64,
    /// Message whose text ends the current, unterminated line.
    open_line: Option<i64>,
}

/// [`Transport`] writing to a terminal (stdout by default).
pub struct ConsoleTransport<W = io::Stdout> {
    state: Mutex<ConsoleState<W>>,
    color: bool,
}

impl ConsoleTransport<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                out,
                messages: HashMap::new(),
                next_id: 1,
                open_line: None,
            }),
            color: true,
        }
    }

    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    /// Consume the transport and return its writer.
    pub fn into_inner(self) -> W {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner).out
    }

    fn state(&self) -> MutexGuard<'_, ConsoleState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> ConsoleState<W> {
    fn close_line(&mut self) -> io::Result<()> {
        if self.open_line.take().is_some() {
            writeln!(self.out)?;
        }
        Ok(())
    }
}

fn closed(e: io::Error) -> TransportError {
    debug!(error = %e, "Console write failed");
    TransportError::Closed
}

#[async_trait]
impl<W: Write + Send> Transport for ConsoleTransport<W> {
    async fn send_placeholder(&self, user: &UserId) -> Result<MessageRef, TransportError> {
        let prefix = self.paint(BOT_PREFIX, |s| s.green().bold());
        let placeholder = self.paint(notice::PLACEHOLDER, |s| s.dimmed());

        let mut state = self.state();
        state.close_line().map_err(closed)?;
        let id = state.next_id;
        state.next_id += 1;
        writeln!(state.out, "{prefix}{placeholder}").map_err(closed)?;
        state.out.flush().map_err(closed)?;
        state.messages.insert(
            user.clone(),
            Shown {
                id,
                raw: notice::PLACEHOLDER.to_string(),
                rendered: None,
            },
        );
        Ok(MessageRef::new(user.clone(), id))
    }

    async fn edit_message(
        &self,
        message: &MessageRef,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError> {
        let rendered = to_console_text(text, format);
        let prefix = self.paint(BOT_PREFIX, |s| s.green().bold());

        let mut guard = self.state();
        let state = &mut *guard;
        let Some(shown) = state
            .messages
            .get_mut(&message.user)
            .filter(|shown| shown.id == message.message_id)
        else {
            return Err(TransportError::Rejected(format!(
                "unknown message {}",
                message.message_id
            )));
        };
        if shown.raw == text {
            return Err(TransportError::NotModified);
        }

        let continues = state.open_line == Some(message.message_id);
        match shown.rendered.as_deref() {
            Some(previous) if continues && rendered.starts_with(previous) => {
                write!(state.out, "{}", &rendered[previous.len()..]).map_err(closed)?;
            }
            _ => {
                if state.open_line.take().is_some() {
                    writeln!(state.out).map_err(closed)?;
                }
                write!(state.out, "{prefix}{rendered}").map_err(closed)?;
            }
        }
        state.out.flush().map_err(closed)?;

        shown.raw = text.to_string();
        shown.rendered = Some(rendered);
        state.open_line = Some(message.message_id);
        Ok(())
    }

    async fn send_notice(
        &self,
        _user: &UserId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError> {
        let rendered = self.paint(&to_console_text(text, format), |s| s.yellow());
        let mut state = self.state();
        state.close_line().map_err(closed)?;
        writeln!(state.out, "{rendered}").map_err(closed)?;
        state.out.flush().map_err(closed)
    }

    async fn signal_typing(&self, user: &UserId) -> Result<(), TransportError> {
        debug!(user = %user, "Typing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> ConsoleTransport<Vec<u8>> {
        ConsoleTransport::new(Vec::new()).without_color()
    }

    fn output(console: ConsoleTransport<Vec<u8>>) -> String {
        String::from_utf8(console.into_inner()).unwrap()
    }

    fn user() -> UserId {
        UserId::from("u")
    }

    #[tokio::test]
    async fn streamed_edits_print_only_the_new_suffix() {
        let console = console();
        let msg = console.send_placeholder(&user()).await.unwrap();
        console.edit_message(&msg, "Hello", TextFormat::Html).await.unwrap();
        console.edit_message(&msg, "Hello world", TextFormat::Html).await.unwrap();
        console.send_notice(&user(), "done", TextFormat::Html).await.unwrap();

        assert_eq!(
            output(console),
            format!("{BOT_PREFIX}*****Please Wait*****\n{BOT_PREFIX}Hello world\ndone\n")
        );
    }

    #[tokio::test]
    async fn rewritten_text_is_printed_again() {
        let console = console();
        let msg = console.send_placeholder(&user()).await.unwrap();
        console.edit_message(&msg, "abc", TextFormat::Plain).await.unwrap();
        console.edit_message(&msg, "xyz", TextFormat::Plain).await.unwrap();

        assert!(output(console).ends_with(&format!("{BOT_PREFIX}abc\n{BOT_PREFIX}xyz")));
    }

    #[tokio::test]
    async fn unchanged_text_is_not_modified() {
        let console = console();
        let msg = console.send_placeholder(&user()).await.unwrap();
        console.edit_message(&msg, "same", TextFormat::Html).await.unwrap();

        let again = console.edit_message(&msg, "same", TextFormat::Html).await;
        assert_eq!(again, Err(TransportError::NotModified));
    }

    #[tokio::test]
    async fn unknown_message_is_rejected() {
        let console = console();
        let msg = MessageRef::new(user(), 99);
        let result = console.edit_message(&msg, "text", TextFormat::Html).await;
        assert!(matches!(result, Err(TransportError::Rejected(_))));
    }

    #[tokio::test]
    async fn only_the_latest_message_per_user_is_kept() {
        let console = console();
        let first = console.send_placeholder(&user()).await.unwrap();
        console.edit_message(&first, "one", TextFormat::Plain).await.unwrap();
        let second = console.send_placeholder(&user()).await.unwrap();
        let other = console.send_placeholder(&UserId::from("v")).await.unwrap();

        assert_eq!(console.state().messages.len(), 2);
        let stale = console.edit_message(&first, "one more", TextFormat::Plain).await;
        assert!(matches!(stale, Err(TransportError::Rejected(_))));
        assert!(console.edit_message(&second, "two", TextFormat::Plain).await.is_ok());
        assert!(console.edit_message(&other, "three", TextFormat::Plain).await.is_ok());
    }

    #[tokio::test]
    async fn html_notices_are_rendered_as_text() {
        let console = console();
        console
            .send_notice(&user(), "Starting new dialog (<b>Coder</b> mode) ✅", TextFormat::Html)
            .await
            .unwrap();
        assert_eq!(output(console), "Starting new dialog (Coder mode) ✅\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn write_failures_close_the_transport() {
        let console = ConsoleTransport::new(BrokenPipe).without_color();
        let result = console.send_notice(&user(), "hi", TextFormat::Plain).await;
        assert_eq!(result, Err(TransportError::Closed));
    }
}
