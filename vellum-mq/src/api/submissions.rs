//! Submission endpoints: listing, upload intake, queue/history views, triage write-back

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use vellum_common::db::{CommunityReport, QueueStatus, Submission, Verdict};

use crate::db::reports;
use crate::db::submissions::{self, SubmissionFilter, SubmissionOrder};
use crate::error::{ApiError, ApiResult};
use crate::pipeline::{NewSubmission, VerificationStatus};
use crate::AppState;

/// A submission with its derived verification status
#[derive(Debug, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub verification_status: VerificationStatus,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        let verification_status = VerificationStatus::for_submission(&submission);
        Self {
            submission,
            verification_status,
        }
    }
}

/// Detail view: the submission plus reports linked to it
#[derive(Debug, Serialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub view: SubmissionView,
    pub linked_reports: Vec<CommunityReport>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionQuery {
    pub status: Option<String>,
    pub creator: Option<String>,
    pub title_contains: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub verdict: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TriageRequest {
    pub score: f64,
}

fn parse_status(status: Option<&str>) -> ApiResult<Option<QueueStatus>> {
    status
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<QueueStatus>().map_err(ApiError::from))
        .transpose()
}

fn views(list: Vec<Submission>) -> Vec<SubmissionView> {
    list.into_iter().map(SubmissionView::from).collect()
}

/// GET /api/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<SubmissionQuery>,
) -> ApiResult<Json<Vec<SubmissionView>>> {
    let filter = SubmissionFilter {
        status: parse_status(query.status.as_deref())?,
        creator_handle: query.creator,
        title_contains: query.title_contains.filter(|t| !t.is_empty()),
        limit: query.limit,
        ..Default::default()
    };

    let list = submissions::list_submissions(&state.db, &filter).await?;
    Ok(Json(views(list)))
}

/// POST /api/submissions
///
/// Entry point for the upload flow. New submissions start unscanned, which
/// the analysis watcher picks up from the change notification.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(new): Json<NewSubmission>,
) -> ApiResult<(StatusCode, Json<SubmissionView>)> {
    let submission = state.pipeline.submit(new).await?;
    Ok((StatusCode::CREATED, Json(submission.into())))
}

/// GET /api/submissions/:id
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SubmissionDetail>> {
    let submission = submissions::get_submission(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {}", id)))?;
    let linked_reports = reports::list_reports_for_submission(&state.db, &id).await?;

    Ok(Json(SubmissionDetail {
        view: submission.into(),
        linked_reports,
    }))
}

/// POST /api/submissions/:id/triage
///
/// Analyzer write-back of the AI confidence score.
pub async fn record_triage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TriageRequest>,
) -> ApiResult<Json<SubmissionView>> {
    let submission = state.pipeline.record_triage(&id, request.score).await?;
    Ok(Json(submission.into()))
}

/// GET /api/queue
///
/// Submissions still awaiting a verdict, oldest first.
pub async fn list_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<Vec<SubmissionView>>> {
    let filter = SubmissionFilter {
        status: parse_status(query.status.as_deref())?,
        terminal: Some(false),
        ..Default::default()
    };

    let list = submissions::list_submissions(&state.db, &filter).await?;
    Ok(Json(views(list)))
}

/// GET /api/history
///
/// Decided submissions, most recent verdict first.
pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<SubmissionView>>> {
    let status = query
        .verdict
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<Verdict>().map(|verdict| verdict.queue_status()))
        .transpose()?;

    let filter = SubmissionFilter {
        status,
        terminal: Some(true),
        order: SubmissionOrder::ReviewedDesc,
        limit: query.limit,
        ..Default::default()
    };

    let list = submissions::list_submissions(&state.db, &filter).await?;
    Ok(Json(views(list)))
}

/// GET /api/creators/:handle/feed
///
/// The creator's submissions, newest first. Viewing the feed dispatches
/// analysis for any submission still unscanned.
pub async fn creator_feed(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<Vec<SubmissionView>>> {
    let filter = SubmissionFilter {
        creator_handle: Some(handle),
        order: SubmissionOrder::SubmittedDesc,
        ..Default::default()
    };

    let list = submissions::list_submissions(&state.db, &filter).await?;
    state.trigger.observe_all(&list).await;

    Ok(Json(views(list)))
}
