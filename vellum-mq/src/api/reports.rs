//! Community report endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use vellum_common::db::CommunityReport;

use crate::db::reports::{self, ReportTab};
use crate::error::{ApiError, ApiResult};
use crate::pipeline::NewReport;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub tab: Option<String>,
}

/// Result of reconciling a report
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub report_id: String,
    pub submission_id: String,
}

fn parse_tab(tab: Option<&str>) -> ApiResult<ReportTab> {
    match tab.map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("all") => Ok(ReportTab::All),
        Some("pending") => Ok(ReportTab::Pending),
        Some("resolved") => Ok(ReportTab::Resolved),
        Some(other) => Err(ApiError::BadRequest(format!("Unknown report tab: {}", other))),
    }
}

/// GET /api/reports
///
/// `tab=pending` includes reports In Review.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<CommunityReport>>> {
    let tab = parse_tab(query.tab.as_deref())?;
    let list = reports::list_reports(&state.db, tab).await?;
    Ok(Json(list))
}

/// POST /api/reports
pub async fn file_report(
    State(state): State<AppState>,
    Json(new): Json<NewReport>,
) -> ApiResult<(StatusCode, Json<CommunityReport>)> {
    let report = state.pipeline.file_report(new).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// POST /api/reports/:id/reconcile
pub async fn reconcile_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReconcileResponse>> {
    let submission_id = state.pipeline.reconcile_report(&id).await?;
    Ok(Json(ReconcileResponse {
        report_id: id,
        submission_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tab() {
        assert_eq!(parse_tab(None).unwrap(), ReportTab::All);
        assert_eq!(parse_tab(Some("Pending")).unwrap(), ReportTab::Pending);
        assert_eq!(parse_tab(Some("resolved")).unwrap(), ReportTab::Resolved);
        assert!(parse_tab(Some("archived")).is_err());
    }
}
