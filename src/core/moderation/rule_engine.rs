// Rule engine - deterministic, offline first stage of moderation.
//
// Pure function of (config, text): no I/O, no clock, no randomness. The same
// input always produces a structurally equal verdict.

use super::moderation_models::{ModerationConfig, Severity, Verdict};
use std::sync::Arc;

/// Tokens must be longer than this to count towards the shouting heuristic.
const SHOUT_MIN_TOKEN_CHARS: usize = 3;

/// Accumulates findings while severity only ever ratchets upwards.
struct Findings {
    issues: Vec<String>,
    suggestions: Vec<String>,
    severity: Severity,
}

impl Findings {
    fn new() -> Self {
        Self {
            issues: Vec::new(),
            suggestions: Vec::new(),
            severity: Severity::Low,
        }
    }

    fn flag(&mut self, issue: impl Into<String>, suggestion: impl Into<String>, at_least: Severity) {
        self.issues.push(issue.into());
        self.suggestions.push(suggestion.into());
        self.severity = self.severity.max(at_least);
    }

    fn into_verdict(self) -> Verdict {
        Verdict {
            is_clean: self.issues.is_empty(),
            issues: self.issues,
            severity: self.severity,
            suggestions: self.suggestions,
        }
    }
}

/// Offline classifier over sensitive terms, spam patterns and shouting.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: Arc<ModerationConfig>,
}

impl RuleEngine {
    pub fn new(config: Arc<ModerationConfig>) -> Self {
        Self { config }
    }

    /// Evaluate `text` against every rule, in order.
    pub fn evaluate(&self, text: &str) -> Verdict {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Verdict {
                is_clean: false,
                issues: vec!["Content is empty".to_string()],
                severity: Severity::High,
                suggestions: vec!["Please enter some content".to_string()],
            };
        }

        let mut findings = Findings::new();

        let min_length = self.config.min_length();
        if trimmed.chars().count() < min_length {
            findings.flag(
                "Content is too short",
                format!("Please write at least {min_length} characters"),
                Severity::Medium,
            );
        }

        let lowered = trimmed.to_lowercase();
        if self
            .config
            .sensitive_terms()
            .any(|term| lowered.contains(term))
        {
            findings.flag(
                "Inappropriate language detected",
                "Please remove offensive or inappropriate language",
                Severity::High,
            );
        }

        for pattern in self.config.spam_patterns() {
            if pattern.is_match(trimmed) {
                findings.flag(pattern.issue(), pattern.suggestion(), Severity::Medium);
            }
        }

        if is_shouting(trimmed) {
            findings.flag(
                "Excessive use of capital letters",
                "Please avoid writing in all caps",
                Severity::Low,
            );
        }

        findings.into_verdict()
    }
}

/// More than half of the long tokens are fully upper-case.
fn is_shouting(text: &str) -> bool {
    let long_tokens: Vec<&str> = text
        .split_whitespace()
        .filter(|t| t.chars().count() > SHOUT_MIN_TOKEN_CHARS)
        .collect();
    if long_tokens.is_empty() {
        return false;
    }

    let upper = long_tokens.iter().filter(|t| is_upper_token(t)).count();
    upper * 2 > long_tokens.len()
}

// Needs at least one cased letter so "12345" or "好好学习" never count as shouting.
fn is_upper_token(token: &str) -> bool {
    token.chars().any(char::is_uppercase) && !token.chars().any(char::is_lowercase)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RuleEngine {
        RuleEngine::new(Arc::new(ModerationConfig::builtin().unwrap()))
    }

    #[test]
    fn test_empty_content_is_blocked() {
        let verdict = engine().evaluate("");
        assert_eq!(
            verdict,
            Verdict {
                is_clean: false,
                issues: vec!["Content is empty".to_string()],
                severity: Severity::High,
                suggestions: vec!["Please enter some content".to_string()],
            }
        );
    }

    #[test]
    fn test_whitespace_only_short_circuits() {
        let verdict = engine().evaluate("   \n\t  ");
        assert_eq!(verdict.issues, vec!["Content is empty".to_string()]);
        assert_eq!(verdict.severity, Severity::High);
    }

    #[test]
    fn test_short_content_is_at_least_medium() {
        let verdict = engine().evaluate("ok");
        assert!(!verdict.is_clean);
        assert!(verdict.severity >= Severity::Medium);
        assert!(verdict.issues.iter().any(|i| i.contains("too short")));
    }

    #[test]
    fn test_sensitive_term_dominates() {
        for text in [
            "FUCK YOU ALL",
            "a perfectly normal sentence with shit in the middle",
            "你这个傻逼，真的是",
            "visit www.example.com you bastard",
        ] {
            let verdict = engine().evaluate(text);
            assert_eq!(verdict.severity, Severity::High, "{text}");
            assert!(!verdict.is_clean);
            assert!(verdict
                .issues
                .contains(&"Inappropriate language detected".to_string()));
        }
    }

    #[test]
    fn test_spam_patterns_each_add_an_issue() {
        let verdict = engine()
            .evaluate("Great deal!!!!!!! see https://spam.example.com or call 13800138000");
        assert_eq!(verdict.severity, Severity::Medium);
        assert_eq!(
            verdict.issues,
            vec![
                "Excessive repeated characters".to_string(),
                "Contains links".to_string(),
                "Contains long number sequences".to_string(),
            ]
        );
        assert_eq!(verdict.suggestions.len(), 3);
    }

    #[test]
    fn test_spam_does_not_downgrade_high() {
        let verdict = engine().evaluate("shit shit https://example.com");
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(verdict.issues.len(), 2);
    }

    #[test]
    fn test_shouting_is_low() {
        let verdict = engine().evaluate("THIS FORUM NEEDS MORE moderators today");
        assert!(!verdict.is_clean);
        assert_eq!(verdict.severity, Severity::Low);
        assert_eq!(
            verdict.issues,
            vec!["Excessive use of capital letters".to_string()]
        );
    }

    #[test]
    fn test_shouting_does_not_lower_medium() {
        let verdict = engine().evaluate("CHECK THIS LINK http://example.com");
        assert_eq!(verdict.severity, Severity::Medium);
        assert!(verdict
            .issues
            .contains(&"Excessive use of capital letters".to_string()));
    }

    #[test]
    fn test_half_upper_is_not_shouting() {
        assert!(!is_shouting("HELLO there EVERY person"));
        assert!(is_shouting("HELLO THERE every"));
        assert!(!is_shouting("OK NO YES"));
    }

    #[test]
    fn test_clean_text() {
        let verdict = engine().evaluate("Has anyone tried the new release of the toolkit?");
        assert_eq!(verdict, Verdict::clean());
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let engine = engine();
        let text = "WOW!!!!!!! call 12345678901 now";
        assert_eq!(engine.evaluate(text), engine.evaluate(text));
    }

    #[test]
    fn test_verdicts_satisfy_invariants() {
        let engine = engine();
        for text in ["", "ok", "fine words here", "LOUD LOUD quiet", "fuck"] {
            assert!(engine.evaluate(text).validate().is_ok(), "{text}");
        }
    }
}
