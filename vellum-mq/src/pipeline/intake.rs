//! Intake: new submissions, community reports and triage write-back

use serde::Deserialize;
use tracing::info;
use vellum_common::db::{
    CommunityReport, MetadataAttribute, QueueStatus, ResolutionStatus, Severity, Submission,
};
use vellum_common::{time, uuid_utils, ModerationEvent};

use super::{require, ModerationPipeline};
use crate::db::{reports, submissions};
use crate::error::{PipelineError, PipelineResult};

/// A submission arriving from the upload flow
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    #[serde(default)]
    pub id: Option<String>,
    pub creator_handle: String,
    pub title: String,
    pub media_category: String,
    /// Initial queue position; defaults to Regular
    #[serde(default)]
    pub queue_status: Option<QueueStatus>,
    #[serde(default)]
    pub metadata_attributes: Vec<MetadataAttribute>,
}

/// A report filed by a community member
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    #[serde(default)]
    pub id: Option<String>,
    pub content_label: String,
    pub reported_creator_handle: String,
    pub reason: String,
    pub reporter_handle: String,
    pub severity: Severity,
}

impl ModerationPipeline {
    /// Store a new, untriaged submission
    pub async fn submit(&self, new: NewSubmission) -> PipelineResult<Submission> {
        require("creator_handle", &new.creator_handle)?;
        require("title", &new.title)?;
        require("media_category", &new.media_category)?;

        let queue_status = new.queue_status.unwrap_or(QueueStatus::Regular);
        if queue_status.is_terminal() {
            return Err(PipelineError::Validation(format!(
                "new submissions cannot start as {}",
                queue_status
            )));
        }

        let submission = Submission {
            id: new.id.unwrap_or_else(uuid_utils::generate_id),
            creator_handle: new.creator_handle,
            title: new.title,
            media_category: new.media_category,
            submitted_at: time::now(),
            queue_status,
            ai_confidence_score: None,
            ai_checked: false,
            metadata_attributes: new.metadata_attributes,
            review_notes: None,
            reviewer: None,
            reviewed_at: None,
        };

        match submissions::insert_submission(&self.db, &submission).await {
            Ok(()) => {}
            Err(vellum_common::Error::Database(sqlx::Error::Database(db_err)))
                if db_err.is_unique_violation() =>
            {
                return Err(PipelineError::Validation(format!(
                    "submission id already exists: {}",
                    submission.id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            submission_id = %submission.id,
            creator = %submission.creator_handle,
            "Submission received"
        );
        self.event_bus.emit_lossy(ModerationEvent::SubmissionCreated {
            submission_id: submission.id.clone(),
            creator_handle: submission.creator_handle.clone(),
            synthesized: false,
            timestamp: submission.submitted_at,
        });

        Ok(submission)
    }

    /// File a pending community report
    pub async fn file_report(&self, new: NewReport) -> PipelineResult<CommunityReport> {
        require("content_label", &new.content_label)?;
        require("reported_creator_handle", &new.reported_creator_handle)?;
        require("reason", &new.reason)?;
        require("reporter_handle", &new.reporter_handle)?;

        let report = CommunityReport {
            id: new.id.unwrap_or_else(uuid_utils::generate_id),
            content_label: new.content_label,
            reported_creator_handle: new.reported_creator_handle,
            reason: new.reason,
            reporter_handle: new.reporter_handle,
            severity: new.severity,
            resolution_status: ResolutionStatus::Pending,
            linked_submission_id: None,
            created_at: time::now(),
        };

        reports::insert_report(&self.db, &report).await?;

        info!(report_id = %report.id, label = %report.content_label, "Report filed");
        self.event_bus.emit_lossy(ModerationEvent::ReportFiled {
            report_id: report.id.clone(),
            timestamp: report.created_at,
        });

        Ok(report)
    }

    /// Store the analyzer's confidence score and mark the submission checked
    pub async fn record_triage(&self, submission_id: &str, score: f64) -> PipelineResult<Submission> {
        if !(0.0..=100.0).contains(&score) {
            return Err(PipelineError::Validation(format!(
                "confidence score {} outside 0..=100",
                score
            )));
        }

        let submission = submissions::record_triage(&self.db, submission_id, score)
            .await?
            .ok_or_else(|| PipelineError::submission_not_found(submission_id))?;

        info!(submission_id = %submission.id, score, "Triage recorded");
        self.event_bus.emit_lossy(ModerationEvent::TriageRecorded {
            submission_id: submission.id.clone(),
            score,
            timestamp: time::now(),
        });

        Ok(submission)
    }
}
