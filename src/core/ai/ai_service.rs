use super::models::{AiConfig, AiMessage, AiProviderResponse};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error: {status} - {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Missing field in provider response: {0}")]
    MissingContent(&'static str),

    #[error("No API key configured for {0}")]
    NotConfigured(&'static str),
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request and returns the model's raw text.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

// Blanket implementation for Box<dyn AiProvider>
// This allows the provider to be picked at runtime (OpenRouter, Gemini, ...).
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        (**self).chat_complete(messages, config).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
