//! Audit trail listing

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use vellum_common::db::AuditRecord;

use super::clamp_limit;
use crate::db::audit;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /api/audit
///
/// Newest record first.
pub async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditRecord>>> {
    let records = audit::list_audit(&state.db, clamp_limit(query.limit)).await?;
    Ok(Json(records))
}
