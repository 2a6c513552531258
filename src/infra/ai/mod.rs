pub mod gemini_client;
pub mod openrouter_client;

pub use gemini_client::GeminiClient;
pub use openrouter_client::OpenRouterClient;

use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider, AiProviderResponse};
use async_trait::async_trait;

/// Stand-in used when no API key is configured. Every call fails, so the
/// pipeline always falls back to the rule verdict.
pub struct UnconfiguredProvider {
    provider: &'static str,
}

impl UnconfiguredProvider {
    pub fn new(provider: &'static str) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AiProvider for UnconfiguredProvider {
    async fn chat_complete(
        &self,
        _messages: &[AiMessage],
        _config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        Err(AiError::NotConfigured(self.provider))
    }

    fn name(&self) -> &'static str {
        self.provider
    }
}
