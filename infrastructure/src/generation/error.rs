//! Errors of the OpenAI-compatible backend.

use thiserror::Error;
use turnstile_application::GenerationError;

#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response contained no choices")]
    NoChoices,
}

impl OpenAiError {
    /// Whether the backend rejected the prompt as too long.
    pub fn is_context_overflow(&self) -> bool {
        matches!(
            self,
            OpenAiError::Api { status: 400, message } if message.contains("context_length_exceeded")
        )
    }
}

impl From<OpenAiError> for GenerationError {
    fn from(e: OpenAiError) -> Self {
        match e {
            OpenAiError::Request(e) => GenerationError::RequestFailed(e.to_string()),
            e @ OpenAiError::Api { .. } => GenerationError::Backend(e.to_string()),
            e @ (OpenAiError::Decode(_) | OpenAiError::NoChoices) => {
                GenerationError::Decode(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_overflow_is_detected_from_error_code() {
        let e = OpenAiError::Api {
            status: 400,
            message: r#"{"error":{"code":"context_length_exceeded"}}"#.to_string(),
        };
        assert!(e.is_context_overflow());

        let other = OpenAiError::Api {
            status: 429,
            message: "context_length_exceeded".to_string(),
        };
        assert!(!other.is_context_overflow());
    }

    #[test]
    fn api_errors_map_to_backend_failures() {
        let e = OpenAiError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(
            GenerationError::from(e),
            GenerationError::Backend("API error (status 500): boom".to_string())
        );
        assert!(matches!(
            GenerationError::from(OpenAiError::NoChoices),
            GenerationError::Decode(_)
        ));
    }
}
