// Submission gate - per-editor state machine in front of the pipeline.
//
//   Draft -> Checking -> Blocked | Warned | Clean
//
// A warning hands out a single-use bypass token. The next submit consumes it
// and goes straight to Clean without moderating again, even if the text
// changed in between.

use crate::core::audit::{AuditEntry, AuditLog, AuditStore, ClassifierUsed, ModerationAction};
use crate::core::moderation::{ContentClassifier, ModerationPipeline, Severity, Verdict};
use std::sync::Arc;

/// Separator placed between title and body before moderation.
pub const TITLE_BODY_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub title: Option<String>,
    pub body: String,
    pub user_id: String,
    pub user_name: String,
}

impl Submission {
    /// The text the pipeline sees: title and body joined by a blank line.
    pub fn moderation_text(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => {
                format!("{title}{TITLE_BODY_SEPARATOR}{}", self.body)
            }
            _ => self.body.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Draft,
    Checking,
    Blocked,
    Warned,
    Clean,
}

/// Permission for exactly one unmoderated resubmission after a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassToken {
    verdict: Verdict,
    classifier_used: ClassifierUsed,
}

/// A submission cleared for publishing. Recording it consumes it, so each
/// pass is written to the audit log once. Not `Clone` for the same reason.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingPass {
    submission: Submission,
    verdict: Verdict,
    classifier_used: ClassifierUsed,
    bypassed: bool,
}

impl PendingPass {
    #[allow(dead_code)]
    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// True when this pass came from consuming a bypass token.
    #[allow(dead_code)]
    pub fn bypassed(&self) -> bool {
        self.bypassed
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Rejected; the author must edit before resubmitting.
    Blocked(Verdict),
    /// Rejected this time; the next submit goes through unmoderated.
    Warned(Verdict),
    /// Cleared; call `SubmissionGate::publish` once the post is stored.
    Clean(PendingPass),
}

pub struct SubmissionGate<C: ContentClassifier, S: AuditStore> {
    pipeline: Arc<ModerationPipeline<C>>,
    audit: Arc<AuditLog<S>>,
    state: GateState,
    bypass: Option<BypassToken>,
}

impl<C: ContentClassifier, S: AuditStore> SubmissionGate<C, S> {
    pub fn new(pipeline: Arc<ModerationPipeline<C>>, audit: Arc<AuditLog<S>>) -> Self {
        Self {
            pipeline,
            audit,
            state: GateState::Draft,
            bypass: None,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> GateState {
        self.state
    }

    #[allow(dead_code)]
    pub fn has_bypass(&self) -> bool {
        self.bypass.is_some()
    }

    /// The author went back to editing. An outstanding bypass token survives.
    /// Also recovers from a submit that was dropped while `Checking`.
    #[allow(dead_code)]
    pub fn edit(&mut self) {
        self.state = GateState::Draft;
    }

    /// Handle one explicit submit action.
    ///
    /// Gate state and the bypass token only change after the pipeline
    /// returns, so dropping this future mid-check leaves nothing behind
    /// except `GateState::Checking`.
    pub async fn submit(&mut self, submission: Submission) -> GateOutcome {
        if let Some(token) = self.bypass.take() {
            tracing::info!(
                user_id = %submission.user_id,
                "Bypass token consumed, skipping moderation"
            );
            self.state = GateState::Clean;
            return GateOutcome::Clean(PendingPass {
                submission,
                verdict: token.verdict,
                classifier_used: token.classifier_used,
                bypassed: true,
            });
        }

        self.state = GateState::Checking;
        let outcome = self
            .pipeline
            .moderate_detailed(&submission.moderation_text())
            .await;
        let verdict = outcome.verdict;
        let classifier_used = outcome.classifier_used;

        if verdict.severity == Severity::High {
            self.state = GateState::Blocked;
            self.audit
                .record(audit_entry(
                    &submission,
                    verdict.clone(),
                    ModerationAction::Blocked,
                    classifier_used,
                    None,
                    false,
                ))
                .await;
            return GateOutcome::Blocked(verdict);
        }

        if !verdict.issues.is_empty() {
            self.state = GateState::Warned;
            // Replaces any earlier token; tokens never stack.
            self.bypass = Some(BypassToken {
                verdict: verdict.clone(),
                classifier_used,
            });
            self.audit
                .record(audit_entry(
                    &submission,
                    verdict.clone(),
                    ModerationAction::Warned,
                    classifier_used,
                    None,
                    false,
                ))
                .await;
            return GateOutcome::Warned(verdict);
        }

        self.state = GateState::Clean;
        GateOutcome::Clean(PendingPass {
            submission,
            verdict,
            classifier_used,
            bypassed: false,
        })
    }

    /// Write the `passed` record once the post has been stored.
    pub async fn publish(&self, pass: PendingPass, post_id: Option<String>) {
        let entry = audit_entry(
            &pass.submission,
            pass.verdict,
            ModerationAction::Passed,
            pass.classifier_used,
            post_id,
            pass.bypassed,
        );
        self.audit.record(entry).await;
    }
}

fn audit_entry(
    submission: &Submission,
    verdict: Verdict,
    action: ModerationAction,
    classifier_used: ClassifierUsed,
    post_id: Option<String>,
    bypassed: bool,
) -> AuditEntry {
    AuditEntry {
        content: submission.body.clone(),
        title: submission.title.clone(),
        user_id: submission.user_id.clone(),
        user_name: submission.user_name.clone(),
        verdict,
        action,
        classifier_used,
        post_id,
        bypassed,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_service::tests::{
        flagged, rules, Behavior, MockClassifier,
    };
    use crate::infra::audit::InMemoryAuditStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Gate = SubmissionGate<MockClassifier, InMemoryAuditStore>;

    fn gate(behavior: Behavior) -> (Gate, Arc<AtomicUsize>, Arc<AuditLog<InMemoryAuditStore>>) {
        let (classifier, calls) = MockClassifier::new(behavior);
        let pipeline = Arc::new(ModerationPipeline::new(rules(), classifier));
        let audit = Arc::new(AuditLog::new(InMemoryAuditStore::new()));
        (
            SubmissionGate::new(pipeline, Arc::clone(&audit)),
            calls,
            audit,
        )
    }

    fn submission(title: Option<&str>, body: &str) -> Submission {
        Submission {
            title: title.map(str::to_string),
            body: body.to_string(),
            user_id: "u-42".to_string(),
            user_name: "Grace".to_string(),
        }
    }

    #[test]
    fn test_moderation_text_joins_title_and_body() {
        assert_eq!(
            submission(Some("Title"), "Body").moderation_text(),
            "Title\n\nBody"
        );
        assert_eq!(submission(Some("  "), "Body").moderation_text(), "Body");
        assert_eq!(submission(None, "Body").moderation_text(), "Body");
    }

    #[tokio::test]
    async fn test_blocked_submission_records_blocked() {
        let (mut gate, calls, audit) = gate(Behavior::Return(Verdict::clean()));

        let outcome = gate.submit(submission(None, "FUCK YOU ALL")).await;

        assert!(matches!(outcome, GateOutcome::Blocked(ref v) if v.severity == Severity::High));
        assert_eq!(gate.state(), GateState::Blocked);
        assert!(!gate.has_bypass());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let records = audit.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, ModerationAction::Blocked);
        assert_eq!(records[0].classifier_used, ClassifierUsed::Rule);

        gate.edit();
        assert_eq!(gate.state(), GateState::Draft);
    }

    #[tokio::test]
    async fn test_warned_then_bypass_skips_pipeline() {
        let (mut gate, calls, audit) = gate(Behavior::Return(flagged(Severity::Medium)));

        let first = gate
            .submit(submission(Some("Meetup"), "Anyone around this weekend for coffee?"))
            .await;
        assert!(matches!(first, GateOutcome::Warned(_)));
        assert_eq!(gate.state(), GateState::Warned);
        assert!(gate.has_bypass());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Different text on resubmission still goes straight through.
        let second = gate
            .submit(submission(Some("Meetup"), "Completely different text now"))
            .await;
        let GateOutcome::Clean(pass) = second else {
            panic!("expected bypass to clear the submission");
        };
        assert!(pass.bypassed());
        assert_eq!(gate.state(), GateState::Clean);
        assert!(!gate.has_bypass());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        gate.publish(pass, Some("post-7".to_string())).await;

        let records = audit.recent(10).await.unwrap();
        assert_eq!(records.len(), 2);
        // Newest first
        assert_eq!(records[0].action, ModerationAction::Passed);
        assert_eq!(records[0].post_id.as_deref(), Some("post-7"));
        assert_eq!(records[0].content, "Completely different text now");
        assert_eq!(records[0].classifier_used, ClassifierUsed::Ai);
        assert!(records[0].bypassed);
        assert_eq!(records[1].action, ModerationAction::Warned);
        assert_eq!(records[1].post_id, None);
        assert!(!records[1].bypassed);
    }

    #[tokio::test]
    async fn test_bypass_is_single_use() {
        let (mut gate, calls, _audit) = gate(Behavior::Return(flagged(Severity::Low)));
        let text = "Anyone around this weekend for coffee?";

        assert!(matches!(
            gate.submit(submission(None, text)).await,
            GateOutcome::Warned(_)
        ));
        assert!(matches!(
            gate.submit(submission(None, text)).await,
            GateOutcome::Clean(_)
        ));
        // Token is gone: the pipeline runs again and warns again.
        assert!(matches!(
            gate.submit(submission(None, text)).await,
            GateOutcome::Warned(_)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_edit_keeps_bypass_token() {
        let (mut gate, _calls, _audit) = gate(Behavior::Return(flagged(Severity::Medium)));

        gate.submit(submission(None, "Anyone around this weekend for coffee?"))
            .await;
        gate.edit();

        assert_eq!(gate.state(), GateState::Draft);
        assert!(gate.has_bypass());
    }

    #[tokio::test]
    async fn test_clean_submission_records_only_on_publish() {
        let (mut gate, _calls, audit) = gate(Behavior::Return(Verdict::clean()));

        let outcome = gate
            .submit(submission(Some("Release notes"), "Version two ships next Tuesday."))
            .await;
        let GateOutcome::Clean(pass) = outcome else {
            panic!("expected clean outcome");
        };
        assert!(!pass.bypassed());
        assert!(audit.recent(10).await.unwrap().is_empty());

        gate.publish(pass, Some("post-1".to_string())).await;

        let records = audit.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, ModerationAction::Passed);
        assert_eq!(records[0].title.as_deref(), Some("Release notes"));
        assert_eq!(records[0].user_name, "Grace");
        assert!(!records[0].bypassed);
    }

    #[tokio::test]
    async fn test_single_publish_writes_single_passed_record() {
        let (mut gate, _calls, audit) = gate(Behavior::Return(Verdict::clean()));

        let GateOutcome::Clean(pass) = gate
            .submit(submission(None, "Version two ships next Tuesday."))
            .await
        else {
            panic!("expected clean outcome");
        };
        gate.publish(pass, Some("p1".to_string())).await;

        let records = audit.recent(10).await.unwrap();
        let passed: Vec<_> = records
            .iter()
            .filter(|r| r.action == ModerationAction::Passed)
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].post_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_dropped_submit_does_not_affect_next_submission() {
        let (classifier, calls) = MockClassifier::new(Behavior::Hang);
        let pipeline = Arc::new(
            ModerationPipeline::new(rules(), classifier).with_timeout(Duration::from_millis(100)),
        );
        let audit = Arc::new(AuditLog::new(InMemoryAuditStore::new()));
        let mut gate = SubmissionGate::new(pipeline, Arc::clone(&audit));

        // Abandon the first submit while the classifier is still pending.
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            gate.submit(submission(None, "First draft about my keyboard build.")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(gate.state(), GateState::Checking);
        assert!(!gate.has_bypass());
        assert!(audit.recent(10).await.unwrap().is_empty());

        gate.edit();
        assert_eq!(gate.state(), GateState::Draft);

        let outcome = gate
            .submit(submission(None, "Second draft about my keyboard build."))
            .await;
        let GateOutcome::Clean(pass) = outcome else {
            panic!("expected rule fallback to pass clean text");
        };
        assert_eq!(gate.state(), GateState::Clean);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        gate.publish(pass, None).await;
        let records = audit.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "Second draft about my keyboard build.");
    }

    #[tokio::test]
    async fn test_classifier_failure_still_passes_clean_text() {
        let (mut gate, calls, _audit) = gate(Behavior::Fail);

        let outcome = gate
            .submit(submission(None, "Version two ships next Tuesday."))
            .await;

        let GateOutcome::Clean(pass) = outcome else {
            panic!("expected rule fallback to pass clean text");
        };
        assert_eq!(pass.verdict(), &Verdict::clean());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
