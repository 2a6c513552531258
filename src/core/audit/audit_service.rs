// Audit log - append-only record of every terminal moderation decision.
//
// Writes are best-effort: a failing store is reported through tracing and
// never surfaces to the submission flow.

use super::audit_models::{AuditEntry, AuditRecord};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit write failed: {0}")]
    WriteFailed(String),

    #[error("Audit read failed: {0}")]
    ReadFailed(String),
}

/// Append-only storage for audit records.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist a new record, assigning its timestamp.
    async fn append(&self, entry: AuditEntry) -> Result<AuditRecord, AuditError>;

    /// Most recent records first, for compliance review.
    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError>;
}

// Lets the composition root choose SQLite or in-memory storage at runtime.
#[async_trait]
impl AuditStore for Box<dyn AuditStore> {
    async fn append(&self, entry: AuditEntry) -> Result<AuditRecord, AuditError> {
        (**self).append(entry).await
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        (**self).recent(limit).await
    }
}

pub struct AuditLog<S: AuditStore> {
    store: S,
}

impl<S: AuditStore> AuditLog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a decision. Failures are logged and swallowed.
    pub async fn record(&self, entry: AuditEntry) {
        let action = entry.action;
        let user_id = entry.user_id.clone();

        match self.store.append(entry).await {
            Ok(record) => tracing::debug!(
                action = record.action.as_str(),
                classifier = record.classifier_used.as_str(),
                user_id = %record.user_id,
                "Recorded moderation decision"
            ),
            Err(e) => tracing::error!(
                action = action.as_str(),
                user_id = %user_id,
                error = %e,
                "Failed to write moderation audit record"
            ),
        }
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        self.store.recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::{ClassifierUsed, ModerationAction};
    use crate::core::moderation::Verdict;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl AuditStore for BrokenStore {
        async fn append(&self, _entry: AuditEntry) -> Result<AuditRecord, AuditError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::WriteFailed("disk full".to_string()))
        }

        async fn recent(&self, _limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
            Err(AuditError::ReadFailed("disk full".to_string()))
        }
    }

    fn entry() -> AuditEntry {
        AuditEntry {
            content: "hello".to_string(),
            title: None,
            user_id: "u1".to_string(),
            user_name: "Ada".to_string(),
            verdict: Verdict::clean(),
            action: ModerationAction::Passed,
            classifier_used: ClassifierUsed::Ai,
            post_id: Some("p1".to_string()),
            bypassed: false,
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let log = AuditLog::new(BrokenStore {
            attempts: AtomicUsize::new(0),
        });

        // Must return normally even though the store fails.
        log.record(entry()).await;

        assert_eq!(log.store.attempts.load(Ordering::SeqCst), 1);
        assert!(log.recent(10).await.is_err());
    }

    #[test]
    fn test_record_keeps_entry_fields() {
        let now = Utc::now();
        let record = AuditRecord::from_entry(entry(), now);
        assert_eq!(record.timestamp, now);
        assert_eq!(record.post_id.as_deref(), Some("p1"));
        assert_eq!(record.action, ModerationAction::Passed);
    }

    #[test]
    fn test_enum_names_round_trip() {
        for action in [
            ModerationAction::Blocked,
            ModerationAction::Warned,
            ModerationAction::Passed,
        ] {
            assert_eq!(action.as_str().parse::<ModerationAction>(), Ok(action));
        }
        assert_eq!("hybrid".parse::<ClassifierUsed>(), Ok(ClassifierUsed::Hybrid));
        assert!("gpt".parse::<ClassifierUsed>().is_err());
    }
}
