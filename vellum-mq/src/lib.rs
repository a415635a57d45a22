//! vellum-mq library - Moderation Queue service
//!
//! Reviewer decisions, community report reconciliation and automated triage
//! dispatch over a SQLite record store.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vellum_common::EventBus;

pub mod api;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod services;

use pipeline::ModerationPipeline;
use services::AnalysisTrigger;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store connection pool
    pub db: SqlitePool,
    /// Change notifications for SSE clients and the analysis watcher
    pub event_bus: EventBus,
    pub pipeline: ModerationPipeline,
    pub trigger: AnalysisTrigger,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, trigger: AnalysisTrigger) -> Self {
        let pipeline = ModerationPipeline::new(db.clone(), event_bus.clone());
        Self {
            db,
            event_bus,
            pipeline,
            trigger,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api_routes = Router::new()
        .route(
            "/api/submissions",
            get(api::list_submissions).post(api::create_submission),
        )
        .route("/api/submissions/:id", get(api::get_submission))
        .route("/api/submissions/:id/decision", post(api::apply_decision))
        .route("/api/submissions/:id/triage", post(api::record_triage))
        .route("/api/queue", get(api::list_queue))
        .route("/api/history", get(api::list_history))
        .route("/api/decisions/bulk", post(api::apply_bulk_decision))
        .route("/api/reports", get(api::list_reports).post(api::file_report))
        .route("/api/reports/:id/reconcile", post(api::reconcile_report))
        .route("/api/audit", get(api::list_audit))
        .route("/api/creators/:handle/feed", get(api::creator_feed))
        .route("/api/outbox", get(api::list_outbox))
        .route("/api/outbox/drain", post(api::drain_outbox))
        .route("/events", get(api::event_stream));

    Router::new()
        .merge(api_routes)
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
