// Moderation pipeline - the hybrid decision policy.
//
// Rule engine first, then (only when the rule result is clean or low) the
// external classifier. Never fails: any classifier problem degrades to the
// rule verdict.

use super::ai_classifier::{ClassifierError, ContentClassifier};
use super::moderation_models::{Severity, Verdict};
use super::rule_engine::RuleEngine;
use crate::core::audit::ClassifierUsed;
use std::time::Duration;

pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(10);

/// A verdict together with the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub verdict: Verdict,
    pub classifier_used: ClassifierUsed,
}

impl ModerationOutcome {
    fn rule(verdict: Verdict) -> Self {
        Self {
            verdict,
            classifier_used: ClassifierUsed::Rule,
        }
    }
}

pub struct ModerationPipeline<C: ContentClassifier> {
    rules: RuleEngine,
    classifier: C,
    classifier_timeout: Duration,
}

impl<C: ContentClassifier> ModerationPipeline<C> {
    pub fn new(rules: RuleEngine, classifier: C) -> Self {
        Self {
            rules,
            classifier,
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.classifier_timeout = timeout;
        self
    }

    /// Moderate `text` and return the final verdict.
    #[allow(dead_code)]
    pub async fn moderate(&self, text: &str) -> Verdict {
        self.moderate_detailed(text).await.verdict
    }

    /// Moderate `text`, also reporting which stage's verdict was returned.
    pub async fn moderate_detailed(&self, text: &str) -> ModerationOutcome {
        let rule_verdict = self.rules.evaluate(text);

        if rule_verdict.severity == Severity::High {
            tracing::info!(
                issues = rule_verdict.issues.len(),
                "Rule verdict is high severity, skipping classifier"
            );
            return ModerationOutcome::rule(rule_verdict);
        }

        if rule_verdict.severity == Severity::Low || rule_verdict.is_clean {
            return match self.classify_bounded(text).await {
                Ok(verdict) => {
                    tracing::debug!(
                        severity = %verdict.severity,
                        is_clean = verdict.is_clean,
                        "Using classifier verdict"
                    );
                    ModerationOutcome {
                        verdict,
                        classifier_used: ClassifierUsed::Ai,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Classifier failed, falling back to rule verdict");
                    ModerationOutcome::rule(rule_verdict)
                }
            };
        }

        // Medium and already flagged: the rule verdict stands on its own.
        tracing::debug!(
            issues = rule_verdict.issues.len(),
            "Rule verdict is medium severity, skipping classifier"
        );
        ModerationOutcome::rule(rule_verdict)
    }

    async fn classify_bounded(&self, text: &str) -> Result<Verdict, ClassifierError> {
        match tokio::time::timeout(self.classifier_timeout, self.classifier.classify(text)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.classifier_timeout)),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
