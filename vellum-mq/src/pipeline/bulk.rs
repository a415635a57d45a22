//! Bulk decisions: one verdict over a selection of submissions

use std::collections::HashSet;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use vellum_common::db::{QueueStatus, Verdict};

use super::{ModerationPipeline, Reviewer};

/// Outcome for a single id in a bulk decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItemOutcome {
    pub submission_id: String,
    pub applied: bool,
    /// Queue status after the decision, when it applied
    pub queue_status: Option<QueueStatus>,
    pub error: Option<String>,
}

/// Per-id results of a bulk decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub verdict: Verdict,
    pub items: Vec<BulkItemOutcome>,
    pub applied_count: usize,
    pub failed_count: usize,
}

impl BulkOutcome {
    pub fn all_applied(&self) -> bool {
        self.failed_count == 0
    }
}

impl ModerationPipeline {
    /// Apply `verdict` to every id independently
    ///
    /// Items run concurrently with no shared transaction. A failure is reported
    /// in that item's outcome and never affects the other items. Repeated ids
    /// are decided once, in first-seen order.
    pub async fn apply_bulk_decision(
        &self,
        reviewer: &Reviewer,
        submission_ids: &[String],
        verdict: Verdict,
    ) -> BulkOutcome {
        let mut seen = HashSet::new();
        let unique_ids: Vec<&String> = submission_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .collect();

        let results = join_all(
            unique_ids
                .iter()
                .map(|id| self.apply_decision(reviewer, id, verdict, None)),
        )
        .await;

        let items: Vec<BulkItemOutcome> = unique_ids
            .into_iter()
            .zip(results)
            .map(|(id, result)| match result {
                Ok(submission) => BulkItemOutcome {
                    submission_id: id.clone(),
                    applied: true,
                    queue_status: Some(submission.queue_status),
                    error: None,
                },
                Err(e) => {
                    warn!(submission_id = %id, error = %e, "Bulk decision item failed");
                    BulkItemOutcome {
                        submission_id: id.clone(),
                        applied: false,
                        queue_status: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let applied_count = items.iter().filter(|item| item.applied).count();
        let failed_count = items.len() - applied_count;

        info!(
            verdict = %verdict,
            reviewer = %reviewer.handle,
            applied = applied_count,
            failed = failed_count,
            "Bulk decision finished"
        );

        BulkOutcome {
            verdict,
            items,
            applied_count,
            failed_count,
        }
    }
}
