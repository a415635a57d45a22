//! Decision outbox inspection and manual retry

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use vellum_common::db::get_setting;

use super::{clamp_limit, DEFAULT_LIST_LIMIT};
use crate::db::effects::PendingEffect;
use crate::error::ApiResult;
use crate::pipeline::DrainSummary;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OutboxQuery {
    pub limit: Option<i64>,
}

/// GET /api/outbox
///
/// Follow-up effects that have not been applied yet, oldest first.
pub async fn list_outbox(
    State(state): State<AppState>,
    Query(query): Query<OutboxQuery>,
) -> ApiResult<Json<Vec<PendingEffect>>> {
    let pending = state.pipeline.relay().pending(clamp_limit(query.limit)).await?;
    Ok(Json(pending))
}

/// POST /api/outbox/drain
pub async fn drain_outbox(State(state): State<AppState>) -> ApiResult<Json<DrainSummary>> {
    let batch_size = get_setting(&state.db, "outbox_batch_size", DEFAULT_LIST_LIMIT).await?;
    let summary = state.pipeline.relay().drain(batch_size).await?;
    Ok(Json(summary))
}
