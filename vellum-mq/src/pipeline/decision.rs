//! Decision engine: apply one reviewer verdict to one submission
//!
//! The verdict itself (queue status, notes, reviewer, timestamp) commits in one
//! transaction together with the outbox rows for its three follow-ups:
//! the resolution entry, resolving related reports, and the audit record.
//! Follow-ups are then applied one by one; a failing follow-up stays in the
//! outbox and never undoes the verdict or blocks the other follow-ups.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use vellum_common::db::{
    CommunityReport, ResolutionStatus, Severity, Submission, Verdict, DEFAULT_REVIEW_NOTES,
};
use vellum_common::{time, uuid_utils, ModerationEvent};

use super::{ModerationPipeline, Reviewer};
use crate::db::audit::NewAuditRecord;
use crate::db::effects::{self, DecisionEffect};
use crate::db::submissions;
use crate::error::{PipelineError, PipelineResult};

/// Reporter handle on resolution entries written by decisions
pub const SYSTEM_REPORTER: &str = "@system_integrity";

impl ModerationPipeline {
    /// Apply `verdict` to a submission and return the updated submission
    ///
    /// Fails with `NotFound` for an unknown id and leaves the store untouched.
    /// Terminal submissions may be decided again; the later verdict wins.
    pub async fn apply_decision(
        &self,
        reviewer: &Reviewer,
        submission_id: &str,
        verdict: Verdict,
        notes: Option<&str>,
    ) -> PipelineResult<Submission> {
        reviewer.validate()?;

        let notes = normalize_notes(notes);
        let reviewed_at = time::now();

        let mut tx = self.db.begin().await?;

        let Some(submission) = submissions::record_decision(
            &mut *tx,
            submission_id,
            verdict,
            &notes,
            &reviewer.handle,
            &reviewed_at,
        )
        .await?
        else {
            tx.rollback().await?;
            return Err(PipelineError::submission_not_found(submission_id));
        };

        let mut effect_ids = Vec::with_capacity(3);
        for effect in follow_up_effects(&submission, verdict, reviewer, reviewed_at) {
            let id = effects::enqueue_effect(&mut *tx, submission_id, &effect, &reviewed_at).await?;
            effect_ids.push(id);
        }

        tx.commit().await?;

        info!(
            submission_id = %submission.id,
            verdict = %verdict,
            reviewer = %reviewer.handle,
            "Decision applied"
        );

        self.event_bus.emit_lossy(ModerationEvent::DecisionApplied {
            submission_id: submission.id.clone(),
            verdict,
            reviewer: reviewer.handle.clone(),
            timestamp: reviewed_at,
        });

        for id in effect_ids {
            if !self.relay.settle(id).await {
                warn!(
                    submission_id = %submission.id,
                    effect_id = id,
                    "Decision follow-up deferred to outbox"
                );
            }
        }

        Ok(submission)
    }
}

/// Blank or missing notes become the sentinel text
fn normalize_notes(notes: Option<&str>) -> String {
    match notes.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => DEFAULT_REVIEW_NOTES.to_string(),
    }
}

/// The three follow-up writes owed by a decision, in application order
fn follow_up_effects(
    submission: &Submission,
    verdict: Verdict,
    reviewer: &Reviewer,
    decided_at: DateTime<Utc>,
) -> Vec<DecisionEffect> {
    let (severity, reason) = match verdict {
        Verdict::Rejected => (Severity::High, "AI Integrity Violation"),
        Verdict::Approved => (Severity::Low, "Standard Verification"),
    };

    let suffix = uuid_utils::generate_id();
    let resolution = CommunityReport {
        id: format!("#{}-{}", submission.id, &suffix[..8]),
        content_label: submission.title.clone(),
        reported_creator_handle: submission.creator_handle.clone(),
        reason: reason.to_string(),
        reporter_handle: SYSTEM_REPORTER.to_string(),
        severity,
        resolution_status: ResolutionStatus::Resolved,
        linked_submission_id: Some(submission.id.clone()),
        created_at: decided_at,
    };

    let audit = NewAuditRecord {
        actor_handle: reviewer.handle.clone(),
        action_label: format!("{} Content", verdict),
        target_description: format!("{} by {}", submission.title, submission.creator_handle),
        occurred_at: decided_at,
        origin_address: reviewer.origin_address.clone(),
    };

    vec![
        DecisionEffect::ResolutionEntry { report: resolution },
        DecisionEffect::ResolveReports {
            submission_id: submission.id.clone(),
            title: submission.title.clone(),
        },
        DecisionEffect::AppendAudit { record: audit },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_common::db::QueueStatus;

    fn neon_horizon() -> Submission {
        Submission {
            id: "1".to_string(),
            creator_handle: "Julian Vane".to_string(),
            title: "Neon Horizon".to_string(),
            media_category: "Digital Illustration".to_string(),
            submitted_at: Utc::now(),
            queue_status: QueueStatus::Rejected,
            ai_confidence_score: Some(92.4),
            ai_checked: true,
            metadata_attributes: vec![],
            review_notes: Some("no attribution".to_string()),
            reviewer: Some("Alex Riviera".to_string()),
            reviewed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_notes_default_to_sentinel() {
        assert_eq!(normalize_notes(None), DEFAULT_REVIEW_NOTES);
        assert_eq!(normalize_notes(Some("   ")), DEFAULT_REVIEW_NOTES);
        assert_eq!(normalize_notes(Some(" no attribution ")), "no attribution");
    }

    #[test]
    fn test_rejection_effects() {
        let reviewer = Reviewer::new("Alex Riviera", "192.168.1.1");
        let effects = follow_up_effects(&neon_horizon(), Verdict::Rejected, &reviewer, Utc::now());

        assert_eq!(effects.len(), 3);
        match &effects[0] {
            DecisionEffect::ResolutionEntry { report } => {
                assert_eq!(report.severity, Severity::High);
                assert_eq!(report.reason, "AI Integrity Violation");
                assert_eq!(report.resolution_status, ResolutionStatus::Resolved);
                assert_eq!(report.content_label, "Neon Horizon");
                assert!(report.id.starts_with("#1-"));
            }
            other => panic!("unexpected first effect: {:?}", other),
        }
        match &effects[2] {
            DecisionEffect::AppendAudit { record } => {
                assert_eq!(record.action_label, "Rejected Content");
                assert_eq!(record.target_description, "Neon Horizon by Julian Vane");
                assert_eq!(record.origin_address, "192.168.1.1");
            }
            other => panic!("unexpected last effect: {:?}", other),
        }
    }

    #[test]
    fn test_approval_effects() {
        let reviewer = Reviewer::new("Alex Riviera", "10.0.0.8");
        let effects = follow_up_effects(&neon_horizon(), Verdict::Approved, &reviewer, Utc::now());

        match &effects[0] {
            DecisionEffect::ResolutionEntry { report } => {
                assert_eq!(report.severity, Severity::Low);
                assert_eq!(report.reason, "Standard Verification");
            }
            other => panic!("unexpected first effect: {:?}", other),
        }
        assert!(matches!(
            &effects[2],
            DecisionEffect::AppendAudit { record } if record.action_label == "Approved Content"
        ));
    }
}
