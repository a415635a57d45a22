//! Analysis trigger
//!
//! Requests triage for every observed submission that is still unscanned
//! (`ai_checked = false`, no score). Each id is dispatched at most once per
//! trigger instance until its triage is recorded; a restart forgets the guard
//! and the startup sweep picks up anything still unscanned. Results come back only through the triage
//! write-back endpoint, never from the dispatch response.

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vellum_common::db::Submission;
use vellum_common::{time, EventBus, ModerationEvent};

use super::analyzer_client::AnalyzerClient;
use crate::db::submissions;
use crate::error::PipelineResult;

/// Dispatches analyzer requests for unscanned submissions
#[derive(Clone)]
pub struct AnalysisTrigger {
    client: AnalyzerClient,
    event_bus: EventBus,
    /// Media categories eligible for analysis; None = all
    categories: Option<Arc<HashSet<String>>>,
    dispatched: Arc<Mutex<HashSet<String>>>,
}

impl AnalysisTrigger {
    pub fn new(
        client: AnalyzerClient,
        event_bus: EventBus,
        analyzable_categories: Option<Vec<String>>,
    ) -> Self {
        let categories = analyzable_categories
            .filter(|list| !list.is_empty())
            .map(|list| Arc::new(list.into_iter().collect::<HashSet<_>>()));

        Self {
            client,
            event_bus,
            categories,
            dispatched: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn is_eligible(&self, submission: &Submission) -> bool {
        if !submission.awaits_triage() {
            return false;
        }
        match &self.categories {
            Some(categories) => categories.contains(&submission.media_category),
            None => true,
        }
    }

    /// Dispatch analysis for `submission` if it needs it and was not dispatched yet
    ///
    /// Returns true when a request was dispatched. The request runs on its own
    /// task; this call never waits for the analyzer.
    pub async fn observe(&self, submission: &Submission) -> bool {
        if !self.is_eligible(submission) {
            return false;
        }

        if !self.dispatched.lock().await.insert(submission.id.clone()) {
            return false;
        }

        let client = self.client.clone();
        let submission_id = submission.id.clone();
        tokio::spawn(async move {
            if let Err(e) = client.request_analysis(&submission_id).await {
                debug!(submission_id = %submission_id, error = %e, "Analysis request failed");
            }
        });

        debug!(submission_id = %submission.id, "Analysis dispatched");
        self.event_bus.emit_lossy(ModerationEvent::AnalysisDispatched {
            submission_id: submission.id.clone(),
            timestamp: time::now(),
        });

        true
    }

    /// Observe a batch, returning how many dispatches it caused
    pub async fn observe_all(&self, submissions: &[Submission]) -> usize {
        let mut count = 0;
        for submission in submissions {
            if self.observe(submission).await {
                count += 1;
            }
        }
        count
    }

    /// Whether this instance already dispatched `submission_id`
    pub async fn was_dispatched(&self, submission_id: &str) -> bool {
        self.dispatched.lock().await.contains(submission_id)
    }

    /// Drop `submission_id` from the dispatch guard once its triage is in
    pub async fn forget(&self, submission_id: &str) -> bool {
        self.dispatched.lock().await.remove(submission_id)
    }

    /// Dispatch every unscanned submission in the store
    pub async fn sweep(&self, db: &SqlitePool) -> PipelineResult<usize> {
        let pending = submissions::list_awaiting_triage(db).await?;
        let count = self.observe_all(&pending).await;
        info!(unscanned = pending.len(), dispatched = count, "Analysis sweep finished");
        Ok(count)
    }

    /// Observe new submissions as they are announced on the event bus
    ///
    /// Recorded triage releases the submission's dispatch guard.
    pub fn spawn_watcher(&self, db: SqlitePool) -> JoinHandle<()> {
        let trigger = self.clone();
        let mut rx = self.event_bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ModerationEvent::SubmissionCreated { submission_id, .. }) => {
                        match submissions::get_submission(&db, &submission_id).await {
                            Ok(Some(submission)) => {
                                trigger.observe(&submission).await;
                            }
                            Ok(None) => {
                                debug!(submission_id = %submission_id, "Announced submission not found");
                            }
                            Err(e) => {
                                warn!(submission_id = %submission_id, error = %e, "Failed to load announced submission");
                            }
                        }
                    }
                    Ok(ModerationEvent::TriageRecorded { submission_id, .. }) => {
                        if trigger.forget(&submission_id).await {
                            debug!(submission_id = %submission_id, "Triage recorded; dispatch guard released");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Analysis watcher lagged; sweeping store");
                        if let Err(e) = trigger.sweep(&db).await {
                            warn!(error = %e, "Analysis sweep failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Event bus closed; analysis watcher stopping");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vellum_common::db::QueueStatus;

    fn submission(id: &str, category: &str, checked: bool) -> Submission {
        Submission {
            id: id.to_string(),
            creator_handle: "Julian Vane".to_string(),
            title: format!("Work {}", id),
            media_category: category.to_string(),
            submitted_at: time::now(),
            queue_status: QueueStatus::Regular,
            ai_confidence_score: if checked { Some(12.0) } else { None },
            ai_checked: checked,
            metadata_attributes: vec![],
            review_notes: None,
            reviewer: None,
            reviewed_at: None,
        }
    }

    fn trigger(categories: Option<Vec<String>>) -> AnalysisTrigger {
        // Nothing listens on the discard port
        let client = AnalyzerClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        AnalysisTrigger::new(client, EventBus::new(16), categories)
    }

    #[tokio::test]
    async fn test_dispatches_once_per_id() {
        let trigger = trigger(None);
        let s = submission("1", "Digital Illustration", false);

        assert!(trigger.observe(&s).await);
        assert!(!trigger.observe(&s).await);
        assert!(trigger.was_dispatched("1").await);
    }

    #[tokio::test]
    async fn test_forget_releases_guard() {
        let trigger = trigger(None);
        let s = submission("7", "Photography", false);

        assert!(trigger.observe(&s).await);
        assert!(trigger.forget("7").await);
        assert!(!trigger.was_dispatched("7").await);
        assert!(!trigger.forget("7").await);
    }

    #[tokio::test]
    async fn test_skips_checked_submissions() {
        let trigger = trigger(None);
        assert!(!trigger.observe(&submission("2", "Photography", true)).await);
        assert!(!trigger.was_dispatched("2").await);
    }

    #[tokio::test]
    async fn test_category_filter() {
        let trigger = trigger(Some(vec!["Digital Illustration".to_string()]));
        let batch = vec![
            submission("3", "Digital Illustration", false),
            submission("4", "Music", false),
        ];

        assert_eq!(trigger.observe_all(&batch).await, 1);
        assert!(trigger.was_dispatched("3").await);
        assert!(!trigger.was_dispatched("4").await);
    }

    #[tokio::test]
    async fn test_empty_category_list_allows_all() {
        let trigger = trigger(Some(vec![]));
        assert!(trigger.observe(&submission("5", "Music", false)).await);
    }

    #[tokio::test]
    async fn test_emits_dispatch_event() {
        let trigger = trigger(None);
        let mut rx = trigger.event_bus.subscribe();

        trigger.observe(&submission("6", "Photography", false)).await;

        match rx.recv().await.unwrap() {
            ModerationEvent::AnalysisDispatched { submission_id, .. } => {
                assert_eq!(submission_id, "6")
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
