// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// Implementation of the `AiProvider` trait over Google's Gemini API.
//
// **Differences from OpenRouter:**
// - Authentication: API key is a query parameter (`?key=API_KEY`).
// - Request format: `contents[]` with nested `parts`; the system prompt is a
//   separate top-level `systemInstruction` field.
// - Response format: content is at `candidates[0].content.parts[0].text`.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - model name, e.g. `gemini-2.5-flash`

use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider, AiProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// A message in Gemini's format. Gemini says "model" where we say "assistant".
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

/// See: https://ai.google.dev/api/generate-content#generationconfig
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    /// Ask for raw JSON output instead of prose.
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, AiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_key })
    }

    fn text_part(text: &str) -> Part {
        Part {
            text: Some(text.to_string()),
        }
    }

    /// Converts our generic `AiMessage` to Gemini's `Content` format.
    fn convert_message(msg: &AiMessage) -> Content {
        let role = match msg.role.as_str() {
            "assistant" => "model".to_string(),
            other => other.to_string(),
        };

        Content {
            role,
            parts: vec![Self::text_part(&msg.content)],
        }
    }

    fn build_request(messages: &[AiMessage], config: &AiConfig) -> GenerateContentRequest {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| Content {
                role: "user".to_string(),
                parts: vec![Self::text_part(&m.content)],
            });

        let contents = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(Self::convert_message)
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig {
                temperature: Some(config.temperature),
                max_output_tokens: config.max_tokens,
                response_mime_type: Some("application/json".to_string()),
            }),
        }
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, AiError> {
        response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
            .ok_or(AiError::MissingContent("candidates[0].content.parts[0].text"))
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            config.model, self.api_key
        );

        let request = Self::build_request(messages, config);

        // Never log the URL, it carries the API key.
        tracing::debug!(
            "Gemini request to model {}: {} messages",
            config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            let body = match serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                Ok(error_response) => error_response.error.message,
                Err(_) => error_text,
            };
            return Err(AiError::Status {
                provider: "Gemini",
                status,
                body,
            });
        }

        let response_json: GenerateContentResponse = response.json().await?;
        let content = Self::extract_text(response_json)?;

        Ok(AiProviderResponse { content })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// =============================================================================
// TESTS
// =============================================================================
