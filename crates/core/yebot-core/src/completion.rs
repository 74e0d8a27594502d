//! Completion API contract
//!
//! Providers return `Result`; the bot turns failures into a channel message
//! with [`complete_or_apologize`] so that every prompt gets an answer.

use crate::{Result, YebotError};
use async_trait::async_trait;
use std::str::FromStr;

/// Prefix of the text sent back when the completion call fails
pub const ERROR_PREFIX: &str = "You did an error :";
/// Sent instead of an empty or whitespace-only answer
pub const EMPTY_ANSWER: &str = "(the model had nothing to say)";

/// Which generation of the completion API to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiStyle {
    /// Chat API with a single user message
    #[default]
    Chat,
    /// Legacy prompt completion API
    Completions,
}

impl ApiStyle {
    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            ApiStyle::Chat => "gpt-3.5-turbo",
            ApiStyle::Completions => "text-davinci-003",
        }
    }
}

impl FromStr for ApiStyle {
    type Err = YebotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(ApiStyle::Chat),
            "completions" | "completion" | "legacy" => Ok(ApiStyle::Completions),
            other => Err(YebotError::config(format!(
                "Unknown completion API style '{}', expected 'chat' or 'completions'",
                other
            ))),
        }
    }
}

/// Completion API settings
#[derive(Clone)]
pub struct CompletionSettings {
    /// API key
    pub api_key: String,
    /// Chat or legacy completions
    pub api_style: ApiStyle,
    /// Model name
    pub model: String,
    /// Fixed token budget per answer
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Alternative API endpoint, for proxies and compatible servers
    pub api_base: Option<String>,
}

impl std::fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("api_key", &"<redacted>")
            .field("api_style", &self.api_style)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Something that turns a prompt into generated text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Generate text for `prompt`
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Call the provider; on failure return the error as text instead
///
/// Never returns blank text: an empty answer becomes [`EMPTY_ANSWER`].
pub async fn complete_or_apologize(provider: &dyn CompletionProvider, prompt: &str) -> String {
    match provider.complete(prompt).await {
        Ok(text) if text.trim().is_empty() => {
            tracing::warn!(provider = %provider.name(), "Completion was empty");
            EMPTY_ANSWER.to_string()
        }
        Ok(text) => text,
        Err(e) => {
            tracing::error!(provider = %provider.name(), error = %e, "Completion call failed");
            format!("{} {}", ERROR_PREFIX, e)
        }
    }
}
