//! OpenAI completion provider for yebot

#![warn(missing_docs)]
#![warn(clippy::all)]

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateCompletionRequest,
        CreateCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;
use yebot_core::{ApiStyle, CompletionProvider, CompletionSettings, Result, YebotError};

/// Completion provider backed by the OpenAI API
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    settings: CompletionSettings,
}

impl OpenAIProvider {
    /// Create a provider with its own client
    pub fn new(settings: CompletionSettings) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(settings.api_key.clone());
        if let Some(base) = &settings.api_base {
            config = config.with_api_base(base.clone());
        }
        log_settings(&settings);

        Self {
            client: Client::with_config(config).with_backoff(no_retry()),
            settings,
        }
    }

    /// Settings this provider was built with
    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let request = chat_request(&self.settings, prompt)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| YebotError::model(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| YebotError::model("No choices returned"))?;
        Ok(choice.message.content.unwrap_or_default())
    }

    async fn legacy(&self, prompt: &str) -> Result<String> {
        let request = completion_request(&self.settings, prompt)?;
        let response = self
            .client
            .completions()
            .create(request)
            .await
            .map_err(|e| YebotError::model(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| YebotError::model("No choices returned"))?;
        Ok(choice.text)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let start = std::time::Instant::now();
        let text = match self.settings.api_style {
            ApiStyle::Chat => self.chat(prompt).await?,
            ApiStyle::Completions => self.legacy(prompt).await?,
        };
        tracing::debug!(
            model = %self.settings.model,
            latency_ms = %start.elapsed().as_millis(),
            chars = %text.chars().count(),
            "Completion finished"
        );
        Ok(text.trim().to_string())
    }
}

/// Chat request carrying `prompt` as the only user message
pub fn chat_request(settings: &CompletionSettings, prompt: &str) -> Result<CreateChatCompletionRequest> {
    let message = ChatCompletionRequestUserMessageArgs::default()
        .content(prompt)
        .build()
        .map_err(|e| YebotError::model(e.to_string()))?;

    CreateChatCompletionRequestArgs::default()
        .model(settings.model.clone())
        .messages(vec![ChatCompletionRequestMessage::User(message)])
        .max_tokens(settings.max_tokens)
        .temperature(settings.temperature)
        .build()
        .map_err(|e| YebotError::model(e.to_string()))
}

/// Legacy completion request for `prompt`
pub fn completion_request(settings: &CompletionSettings, prompt: &str) -> Result<CreateCompletionRequest> {
    CreateCompletionRequestArgs::default()
        .model(settings.model.clone())
        .prompt(prompt)
        .max_tokens(settings.max_tokens)
        .temperature(settings.temperature)
        .build()
        .map_err(|e| YebotError::model(e.to_string()))
}

/// One attempt per request; rate limits and 5xx answers surface as errors
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn log_settings(settings: &CompletionSettings) {
    let style = match settings.api_style {
        ApiStyle::Chat => "chat",
        ApiStyle::Completions => "completions",
    };
    tracing::info!(
        api_style = style,
        model = %settings.model,
        max_tokens = %settings.max_tokens,
        temperature = %settings.temperature,
        api_base = settings.api_base.as_deref().unwrap_or("default"),
        "openai settings (change via OPENAI_* env vars)"
    );
}
