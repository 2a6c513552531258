use crate::core::moderation::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Terminal decision taken on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Blocked,
    Warned,
    Passed,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Blocked => "blocked",
            ModerationAction::Warned => "warned",
            ModerationAction::Passed => "passed",
        }
    }
}

impl FromStr for ModerationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocked" => Ok(ModerationAction::Blocked),
            "warned" => Ok(ModerationAction::Warned),
            "passed" => Ok(ModerationAction::Passed),
            other => Err(format!("unknown moderation action: {other}")),
        }
    }
}

/// Which stage produced the recorded verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierUsed {
    Rule,
    Ai,
    /// Kept so records written by other tooling can still be read back.
    Hybrid,
}

impl ClassifierUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierUsed::Rule => "rule",
            ClassifierUsed::Ai => "ai",
            ClassifierUsed::Hybrid => "hybrid",
        }
    }
}

impl FromStr for ClassifierUsed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rule" => Ok(ClassifierUsed::Rule),
            "ai" => Ok(ClassifierUsed::Ai),
            "hybrid" => Ok(ClassifierUsed::Hybrid),
            other => Err(format!("unknown classifier: {other}")),
        }
    }
}

/// Everything the caller knows about a decision. The store adds the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub content: String,
    pub title: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub verdict: Verdict,
    pub action: ModerationAction,
    pub classifier_used: ClassifierUsed,
    pub post_id: Option<String>,
    /// Published on a bypass token; the verdict is the one that warned.
    pub bypassed: bool,
}

/// An immutable, persisted audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub content: String,
    pub title: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub verdict: Verdict,
    pub action: ModerationAction,
    pub classifier_used: ClassifierUsed,
    pub timestamp: DateTime<Utc>,
    pub post_id: Option<String>,
    pub bypassed: bool,
}

impl AuditRecord {
    pub fn from_entry(entry: AuditEntry, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: entry.content,
            title: entry.title,
            user_id: entry.user_id,
            user_name: entry.user_name,
            verdict: entry.verdict,
            action: entry.action,
            classifier_used: entry.classifier_used,
            timestamp,
            post_id: entry.post_id,
            bypassed: entry.bypassed,
        }
    }
}
