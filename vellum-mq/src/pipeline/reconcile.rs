//! Report reconciliation
//!
//! Binds a community report to the submission it refers to so a reviewer can
//! open it in the decision workbench. Matching is by exact title; when nothing
//! matches, a Flagged submission is synthesized from the report.

use tracing::{info, warn};
use vellum_common::db::{CommunityReport, MetadataAttribute, QueueStatus, Submission};
use vellum_common::{time, uuid_utils, ModerationEvent};

use super::ModerationPipeline;
use crate::db::{reports, submissions};
use crate::error::{PipelineError, PipelineResult};

/// Media category given to submissions synthesized from a report
pub const SYNTHESIZED_MEDIA_CATEGORY: &str = "Digital Media";

impl ModerationPipeline {
    /// Resolve `report_id` to a submission id, creating the link if needed
    ///
    /// An already linked report returns its existing link. Several title
    /// matches bind to the earliest submitted one.
    pub async fn reconcile_report(&self, report_id: &str) -> PipelineResult<String> {
        let report = reports::get_report(&self.db, report_id)
            .await?
            .ok_or_else(|| PipelineError::report_not_found(report_id))?;

        if let Some(linked) = &report.linked_submission_id {
            return Ok(linked.clone());
        }

        // Guarded insert first; the title lookup below runs under the write lock
        let mut tx = self.db.begin().await?;

        let candidate = synthesize_submission(&report);
        let inserted = submissions::insert_submission_if_title_absent(&mut *tx, &candidate).await?;

        let (submission_id, synthesized) = if inserted {
            (candidate.id.clone(), Some(candidate))
        } else {
            let matches = submissions::find_ids_by_title(&mut *tx, &report.content_label).await?;
            if matches.len() > 1 {
                warn!(
                    report_id = %report.id,
                    title = %report.content_label,
                    matches = matches.len(),
                    chosen = %matches[0],
                    "Several submissions share the reported title; binding to the earliest"
                );
            }
            match matches.into_iter().next() {
                Some(id) => (id, None),
                None => {
                    tx.rollback().await?;
                    return Err(PipelineError::Store(vellum_common::Error::Internal(format!(
                        "no submission titled {:?} after guarded insert",
                        report.content_label
                    ))));
                }
            }
        };

        if !reports::link_report(&mut *tx, &report.id, &submission_id).await? {
            // Linked concurrently; keep whichever link landed first
            tx.rollback().await?;
            let current = reports::get_report(&self.db, &report.id)
                .await?
                .and_then(|r| r.linked_submission_id)
                .ok_or_else(|| PipelineError::report_not_found(&report.id))?;
            return Ok(current);
        }

        tx.commit().await?;

        info!(
            report_id = %report.id,
            submission_id = %submission_id,
            synthesized = synthesized.is_some(),
            "Report reconciled"
        );

        if let Some(submission) = &synthesized {
            self.event_bus.emit_lossy(ModerationEvent::SubmissionCreated {
                submission_id: submission.id.clone(),
                creator_handle: submission.creator_handle.clone(),
                synthesized: true,
                timestamp: submission.submitted_at,
            });
        }
        self.event_bus.emit_lossy(ModerationEvent::ReportLinked {
            report_id: report.id.clone(),
            submission_id: submission_id.clone(),
            timestamp: time::now(),
        });

        Ok(submission_id)
    }
}

/// Flagged, untriaged submission standing in for reported content
fn synthesize_submission(report: &CommunityReport) -> Submission {
    Submission {
        id: uuid_utils::generate_id(),
        creator_handle: report.reported_creator_handle.clone(),
        title: report.content_label.clone(),
        media_category: SYNTHESIZED_MEDIA_CATEGORY.to_string(),
        submitted_at: time::now(),
        queue_status: QueueStatus::Flagged,
        ai_confidence_score: None,
        ai_checked: false,
        metadata_attributes: vec![
            MetadataAttribute::new("Reason", &report.reason),
            MetadataAttribute::new("Reporter", &report.reporter_handle),
        ],
        review_notes: None,
        reviewer: None,
        reviewed_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_common::db::{ResolutionStatus, Severity};

    #[test]
    fn test_synthesized_submission_shape() {
        let report = CommunityReport {
            id: "r-7".to_string(),
            content_label: "City Lights".to_string(),
            reported_creator_handle: "Mara Chen".to_string(),
            reason: "Suspected AI generation".to_string(),
            reporter_handle: "@watcher".to_string(),
            severity: Severity::Medium,
            resolution_status: ResolutionStatus::Pending,
            linked_submission_id: None,
            created_at: time::now(),
        };

        let submission = synthesize_submission(&report);
        assert_eq!(submission.title, "City Lights");
        assert_eq!(submission.creator_handle, "Mara Chen");
        assert_eq!(submission.queue_status, QueueStatus::Flagged);
        assert_eq!(submission.media_category, SYNTHESIZED_MEDIA_CATEGORY);
        assert!(submission.awaits_triage());
        assert_eq!(
            submission.metadata_attributes,
            vec![
                MetadataAttribute::new("Reason", "Suspected AI generation"),
                MetadataAttribute::new("Reporter", "@watcher"),
            ]
        );
    }
}
