//! Decision endpoints: single verdicts and bulk verdicts

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use vellum_common::db::Verdict;

use super::origin_address;
use crate::api::submissions::SubmissionView;
use crate::error::ApiResult;
use crate::pipeline::{BulkOutcome, Reviewer};
use crate::AppState;

/// Body of a single decision
///
/// `verdict` is parsed by the handler; unknown values answer 400.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub verdict: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub reviewer: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkDecisionRequest {
    pub ids: Vec<String>,
    pub verdict: String,
    pub reviewer: String,
}

/// POST /api/submissions/:id/decision
pub async fn apply_decision(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<SubmissionView>> {
    let verdict: Verdict = request.verdict.parse()?;
    let reviewer = Reviewer::new(request.reviewer, origin_address(&headers));

    let submission = state
        .pipeline
        .apply_decision(&reviewer, &id, verdict, request.notes.as_deref())
        .await?;

    Ok(Json(submission.into()))
}

/// POST /api/decisions/bulk
///
/// Always answers 200 with per-id outcomes once the request itself is valid;
/// individual failures are listed in the body.
pub async fn apply_bulk_decision(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BulkDecisionRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    let verdict: Verdict = request.verdict.parse()?;
    let reviewer = Reviewer::new(request.reviewer, origin_address(&headers));

    let outcome = state
        .pipeline
        .apply_bulk_decision(&reviewer, &request.ids, verdict)
        .await;

    Ok(Json(outcome))
}
