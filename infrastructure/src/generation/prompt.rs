//! Chat prompt assembly under a size budget.

use serde::Serialize;
use turnstile_application::{GenerationError, GenerationRequest};
use turnstile_domain::TokenUsage;

/// One message of an OpenAI chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Prompt ready to send, with the number of dialog turns left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,
    pub dropped_turns: usize,
}

impl Prompt {
    /// Build the prompt for `request`, dropping the oldest dialog turns until
    /// it fits in `max_chars` characters.
    ///
    /// At least `min_dropped` turns are dropped; the caller raises it when
    /// the backend still reports an overflow. Fails with
    /// [`GenerationError::ContextOverflow`] when nothing more can be dropped.
    pub fn build(
        request: &GenerationRequest,
        max_chars: usize,
        min_dropped: usize,
    ) -> Result<Self, GenerationError> {
        let turns = &request.dialog;
        if min_dropped > turns.len() {
            return Err(GenerationError::ContextOverflow);
        }

        let fixed = request.mode.prompt.chars().count() + request.message.chars().count();
        let turn_sizes: Vec<usize> = turns
            .iter()
            .map(|t| t.user.chars().count() + t.bot.chars().count())
            .collect();

        let mut dropped = min_dropped;
        let mut size = fixed + turn_sizes[dropped..].iter().sum::<usize>();
        while size > max_chars {
            if dropped == turns.len() {
                return Err(GenerationError::ContextOverflow);
            }
            size -= turn_sizes[dropped];
            dropped += 1;
        }

        let mut messages = Vec::with_capacity(2 + 2 * (turns.len() - dropped));
        messages.push(ChatMessage::new("system", request.mode.prompt.as_str()));
        for turn in &turns[dropped..] {
            messages.push(ChatMessage::new("user", turn.user.as_str()));
            messages.push(ChatMessage::new("assistant", turn.bot.as_str()));
        }
        messages.push(ChatMessage::new("user", request.message.as_str()));

        Ok(Self {
            messages,
            dropped_turns: dropped,
        })
    }

    /// Rough token estimate of the prompt (four characters per token).
    pub fn estimated_tokens(&self) -> u64 {
        self.messages
            .iter()
            .map(|m| estimate_tokens(&m.content))
            .sum()
    }
}

/// Rough token count of `text`, used until the backend reports real usage.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Usage estimate for a partially generated answer.
pub fn estimated_usage(prompt_tokens: u64, answer: &str) -> TokenUsage {
    TokenUsage::new(prompt_tokens, estimate_tokens(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnstile_domain::{ChatMode, DialogTurn};

    fn request(turns: &[(&str, &str)], message: &str) -> GenerationRequest {
        GenerationRequest {
            message: message.to_string(),
            dialog: turns.iter().map(|(u, b)| DialogTurn::new(*u, *b)).collect(),
            mode: ChatMode::new("test", "Test", "sys"),
            model: "m".to_string(),
        }
    }

    #[test]
    fn everything_fits() {
        let prompt = Prompt::build(&request(&[("hi", "hello")], "next"), 100, 0).unwrap();
        assert_eq!(prompt.dropped_turns, 0);
        let roles: Vec<_> = prompt.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(prompt.messages[3].content, "next");
    }

    #[test]
    fn oldest_turns_are_dropped_first() {
        // fixed = 3 + 1, each turn = 10
        let req = request(&[("aaaaa", "bbbbb"), ("ccccc", "ddddd"), ("eeeee", "fffff")], "q");
        let prompt = Prompt::build(&req, 24, 0).unwrap();
        assert_eq!(prompt.dropped_turns, 1);
        assert_eq!(prompt.messages[1].content, "ccccc");
    }

    #[test]
    fn minimum_drop_is_honoured() {
        let req = request(&[("a", "b"), ("c", "d")], "q");
        let prompt = Prompt::build(&req, 1000, 1).unwrap();
        assert_eq!(prompt.dropped_turns, 1);
        assert_eq!(prompt.messages.len(), 4);
    }

    #[test]
    fn overflow_without_any_history() {
        let req = request(&[("a", "b")], "a very long question");
        assert_eq!(
            Prompt::build(&req, 5, 0),
            Err(GenerationError::ContextOverflow)
        );
        assert_eq!(
            Prompt::build(&req, 1000, 2),
            Err(GenerationError::ContextOverflow)
        );
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimated_usage(7, "abcd"), TokenUsage::new(7, 1));
    }
}
