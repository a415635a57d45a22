//! HTTP API handlers for vellum-mq

pub mod audit;
pub mod decisions;
pub mod health;
pub mod outbox;
pub mod reports;
pub mod sse;
pub mod submissions;

pub use audit::list_audit;
pub use decisions::{apply_bulk_decision, apply_decision};
pub use health::health_routes;
pub use outbox::{drain_outbox, list_outbox};
pub use reports::{file_report, list_reports, reconcile_report};
pub use sse::event_stream;
pub use submissions::{
    create_submission, creator_feed, get_submission, list_history, list_queue, list_submissions,
    record_triage,
};

use axum::http::HeaderMap;

use crate::pipeline::UNKNOWN_ORIGIN;

/// Default page size for listings that accept `limit`
pub(crate) const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;

/// Client address from the first `X-Forwarded-For` hop
pub(crate) fn origin_address(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}

/// Clamp a caller-supplied limit into 1..=1000
pub(crate) fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}
