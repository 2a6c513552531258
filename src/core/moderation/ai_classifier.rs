// External classifier client - a generative model used as a second opinion.
//
// The model is asked for a JSON-only verdict. Whatever comes back is parsed
// against the strict `Verdict` schema; anything that does not fit is an
// error and the pipeline falls back to the rule verdict.

use super::moderation_models::Verdict;
use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier provider failed: {0}")]
    Provider(#[from] AiError),

    #[error("Classifier timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Classifier response is not valid verdict JSON: {0}")]
    MalformedResponse(String),

    #[error("Classifier verdict violates invariants: {0}")]
    SchemaViolation(String),
}

/// Port for any remote text classifier.
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Verdict, ClassifierError>;
}

/// Fixed instruction sent with every classification request.
pub const CLASSIFIER_INSTRUCTIONS: &str = r#"You are the content moderator for a community forum where people publish posts and comments about technology, hobbies and everyday life.
Review the user's text for: profanity, insults or harassment, hate speech, sexual content, violence, advertising or spam, and personal data such as phone numbers.
Ordinary disagreement, criticism and casual language are acceptable.

Respond with ONLY a JSON object of exactly this shape, with no prose and no markdown:
{"isClean": boolean, "issues": [string, ...], "severity": "low" | "medium" | "high", "suggestions": [string, ...]}

Rules:
- "isClean" is true only when "issues" is empty.
- "severity" is "high" for content that must be blocked, "medium" for content that needs changes, "low" otherwise.
- A "high" severity verdict is never clean.
- "suggestions" tell the author how to fix each issue."#;

/// `ContentClassifier` backed by a chat-completion provider.
pub struct AiClassifier<P: AiProvider> {
    provider: P,
    config: AiConfig,
}

impl<P: AiProvider> AiClassifier<P> {
    pub fn new(provider: P, config: AiConfig) -> Self {
        Self { provider, config }
    }
}

#[async_trait]
impl<P: AiProvider> ContentClassifier for AiClassifier<P> {
    async fn classify(&self, text: &str) -> Result<Verdict, ClassifierError> {
        let messages = [
            AiMessage::system(CLASSIFIER_INSTRUCTIONS),
            AiMessage::user(text),
        ];

        let response = self
            .provider
            .chat_complete(&messages, &self.config)
            .await?;

        parse_verdict(&response.content)
    }
}

/// Parse a model reply into a verdict. Only a surrounding code fence is
/// removed; the remainder must be exactly one valid verdict object.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ClassifierError> {
    let body = strip_code_fence(raw);
    let verdict: Verdict = serde_json::from_str(body)
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;
    verdict
        .validate()
        .map_err(ClassifierError::SchemaViolation)?;
    Ok(verdict)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening line. JSON
    // starting right after the fence is kept.
    let rest = match rest.split_once('\n') {
        Some((first_line, remainder)) if is_info_string(first_line) => remainder,
        _ => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}
