// Moderation domain models - verdicts, severities and rule configuration.
//
// These are pure domain types with no I/O. The rule engine and the external
// classifier both produce a `Verdict`; the pipeline decides which one wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// ============================================================================
// VERDICT
// ============================================================================

/// Ordinal classification of a finding. `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// The structured outcome of evaluating one piece of text.
///
/// The serde shape is the exact wire contract expected from the external
/// classifier: camelCase field names, every field required, nothing extra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Verdict {
    pub is_clean: bool,
    /// Findings in detection order
    pub issues: Vec<String>,
    pub severity: Severity,
    pub suggestions: Vec<String>,
}

impl Verdict {
    /// A verdict with no findings.
    #[allow(dead_code)]
    pub fn clean() -> Self {
        Self {
            is_clean: true,
            issues: Vec::new(),
            severity: Severity::Low,
            suggestions: Vec::new(),
        }
    }

    /// Check the invariants every verdict must hold:
    /// `high` implies not clean, and `issues` is empty iff clean.
    pub fn validate(&self) -> Result<(), String> {
        if self.severity == Severity::High && self.is_clean {
            return Err("severity \"high\" on a clean verdict".to_string());
        }
        if self.is_clean != self.issues.is_empty() {
            return Err(format!(
                "isClean={} disagrees with {} reported issue(s)",
                self.is_clean,
                self.issues.len()
            ));
        }
        Ok(())
    }
}

// ============================================================================
// RULE CONFIGURATION
// ============================================================================

/// One spam heuristic together with the finding it produces.
#[derive(Debug, Clone)]
pub enum SpamPattern {
    /// Any single character repeated at least `min_run` times in a row.
    RepeatedChar {
        min_run: usize,
        issue: String,
        suggestion: String,
    },
    /// Any match of a compiled regular expression.
    Regex {
        regex: Regex,
        issue: String,
        suggestion: String,
    },
}

impl SpamPattern {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            SpamPattern::RepeatedChar { min_run, .. } => has_char_run(text, *min_run),
            SpamPattern::Regex { regex, .. } => regex.is_match(text),
        }
    }

    pub fn issue(&self) -> &str {
        match self {
            SpamPattern::RepeatedChar { issue, .. } | SpamPattern::Regex { issue, .. } => issue,
        }
    }

    pub fn suggestion(&self) -> &str {
        match self {
            SpamPattern::RepeatedChar { suggestion, .. }
            | SpamPattern::Regex { suggestion, .. } => suggestion,
        }
    }
}

/// True if some character occurs `min_run` or more times consecutively.
fn has_char_run(text: &str, min_run: usize) -> bool {
    if min_run == 0 {
        return true;
    }
    let mut previous = None;
    let mut run = 0;
    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= min_run {
            return true;
        }
    }
    false
}

/// Raw, serializable form of a spam pattern (as found in a settings file).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpamPatternSettings {
    RepeatedChar {
        min_run: usize,
        issue: String,
        suggestion: String,
    },
    Regex {
        pattern: String,
        issue: String,
        suggestion: String,
    },
}

/// Raw rule settings, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationSettings {
    pub sensitive_terms: Vec<String>,
    pub spam_patterns: Vec<SpamPatternSettings>,
    pub min_length: usize,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            sensitive_terms: DEFAULT_SENSITIVE_TERMS
                .iter()
                .map(|t| t.to_string())
                .collect(),
            spam_patterns: vec![
                SpamPatternSettings::RepeatedChar {
                    min_run: 6,
                    issue: "Excessive repeated characters".to_string(),
                    suggestion: "Avoid repeating the same character many times".to_string(),
                },
                SpamPatternSettings::Regex {
                    pattern: r"(?i)(https?://|www\.)\S+".to_string(),
                    issue: "Contains links".to_string(),
                    suggestion: "Remove external links from your post".to_string(),
                },
                SpamPatternSettings::Regex {
                    pattern: r"[0-9]{10,}".to_string(),
                    issue: "Contains long number sequences".to_string(),
                    suggestion: "Remove phone numbers or other long digit sequences".to_string(),
                },
            ],
            min_length: 5,
        }
    }
}

// English and Chinese terms; deployments can replace the list via a settings file.
const DEFAULT_SENSITIVE_TERMS: &[&str] = &[
    "fuck", "shit", "bitch", "asshole", "bastard", "cunt", "dickhead", "motherfucker", "retard",
    "傻逼", "煞笔", "操你", "他妈的", "去死", "滚蛋", "贱人", "婊子",
];

/// Immutable rule configuration injected into the rule engine.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Lower-cased, deduplicated
    sensitive_terms: BTreeSet<String>,
    spam_patterns: Vec<SpamPattern>,
    min_length: usize,
}

impl ModerationConfig {
    pub fn new(
        sensitive_terms: impl IntoIterator<Item = String>,
        spam_patterns: Vec<SpamPattern>,
        min_length: usize,
    ) -> Self {
        Self {
            sensitive_terms: sensitive_terms
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            spam_patterns,
            min_length,
        }
    }

    /// Compile raw settings. Fails on any invalid regular expression.
    pub fn from_settings(settings: ModerationSettings) -> Result<Self, ModerationError> {
        let spam_patterns = settings
            .spam_patterns
            .into_iter()
            .map(|p| match p {
                SpamPatternSettings::RepeatedChar {
                    min_run,
                    issue,
                    suggestion,
                } => Ok(SpamPattern::RepeatedChar {
                    min_run,
                    issue,
                    suggestion,
                }),
                SpamPatternSettings::Regex {
                    pattern,
                    issue,
                    suggestion,
                } => Regex::new(&pattern)
                    .map(|regex| SpamPattern::Regex {
                        regex,
                        issue,
                        suggestion,
                    })
                    .map_err(|e| {
                        ModerationError::ConfigError(format!("invalid pattern {pattern:?}: {e}"))
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(
            settings.sensitive_terms,
            spam_patterns,
            settings.min_length,
        ))
    }

    /// The built-in term list and spam patterns.
    pub fn builtin() -> Result<Self, ModerationError> {
        Self::from_settings(ModerationSettings::default())
    }

    /// Load settings from a JSON file and compile them.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModerationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ModerationError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings: ModerationSettings = serde_json::from_str(&raw).map_err(|e| {
            ModerationError::ConfigError(format!("cannot parse {}: {e}", path.display()))
        })?;
        Self::from_settings(settings)
    }

    pub fn sensitive_terms(&self) -> impl Iterator<Item = &str> {
        self.sensitive_terms.iter().map(String::as_str)
    }

    pub fn spam_patterns(&self) -> &[SpamPattern] {
        &self.spam_patterns
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }
}
