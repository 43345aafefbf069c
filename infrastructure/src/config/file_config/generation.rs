//! Generation backend settings from TOML (`[generation]` section)

use serde::{Deserialize, Serialize};
use turnstile_application::config::DEFAULT_MODEL;

/// OpenAI-compatible chat completion backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGenerationConfig {
    /// Base URL of the API, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Environment variable name for the API key (default: "OPENAI_API_KEY").
    pub api_key_env: String,
    /// Direct API key. Prefer `api_key_env`.
    pub api_key: Option<String>,
    /// Model used for users that have none stored.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Timeout for a whole non-streaming request.
    pub request_timeout_secs: u64,
    /// Timeout for establishing the connection.
    pub connect_timeout_secs: u64,
    /// Prompt budget in characters; the oldest turns are dropped to fit.
    pub max_context_chars: usize,
}

impl Default for FileGenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            max_context_chars: 48_000,
        }
    }
}

impl FileGenerationConfig {
    /// Resolve the API key: explicit value first, then the named variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}
