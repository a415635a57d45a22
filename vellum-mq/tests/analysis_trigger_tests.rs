//! Integration tests for analysis dispatch
//!
//! A local axum listener stands in for the analyzer and records every
//! `POST /process/:id` it receives.

use axum::{extract::Path, extract::State, routing::post, Router};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use vellum_common::db::{init_database, QueueStatus};
use vellum_common::EventBus;
use vellum_mq::pipeline::{ModerationPipeline, NewSubmission};
use vellum_mq::services::{AnalysisTrigger, AnalyzerClient};

/// Start a fake analyzer, returning its base URL and the ids it receives
async fn start_analyzer() -> (String, mpsc::UnboundedReceiver<(String, usize)>) {
    let (tx, rx) = mpsc::unbounded_channel();

    async fn process(
        State(tx): State<mpsc::UnboundedSender<(String, usize)>>,
        Path(id): Path<String>,
        body: axum::body::Bytes,
    ) -> &'static str {
        let _ = tx.send((id, body.len()));
        "accepted"
    }

    let app = Router::new()
        .route("/process/:id", post(process))
        .with_state(tx);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), rx)
}

async fn next_request(rx: &mut mpsc::UnboundedReceiver<(String, usize)>) -> Option<(String, usize)> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .ok()
        .flatten()
}

fn upload(id: &str, title: &str) -> NewSubmission {
    NewSubmission {
        id: Some(id.to_string()),
        creator_handle: "Julian Vane".to_string(),
        title: title.to_string(),
        media_category: "Digital Illustration".to_string(),
        queue_status: Some(QueueStatus::Regular),
        metadata_attributes: vec![],
    }
}

#[tokio::test]
async fn test_sweep_posts_empty_body_for_unscanned_submissions() {
    let (base_url, mut rx) = start_analyzer().await;
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vellum.db")).await.unwrap();
    let bus = EventBus::new(64);
    let pipeline = ModerationPipeline::new(pool.clone(), bus.clone());

    pipeline.submit(upload("1", "Neon Horizon")).await.unwrap();
    pipeline.submit(upload("2", "City Lights")).await.unwrap();
    pipeline.record_triage("2", 12.0).await.unwrap();

    let client = AnalyzerClient::new(base_url, Duration::from_secs(5)).unwrap();
    let trigger = AnalysisTrigger::new(client, bus, None);

    assert_eq!(trigger.sweep(&pool).await.unwrap(), 1);

    let (id, body_len) = next_request(&mut rx).await.expect("analyzer should be called");
    assert_eq!(id, "1");
    assert_eq!(body_len, 0);

    // Guard holds for the rest of the session
    assert_eq!(trigger.sweep(&pool).await.unwrap(), 0);
    assert!(tokio::time::timeout(Duration::from_millis(300), rx.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn test_watcher_dispatches_new_submissions() {
    let (base_url, mut rx) = start_analyzer().await;
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vellum.db")).await.unwrap();
    let bus = EventBus::new(64);
    let pipeline = ModerationPipeline::new(pool.clone(), bus.clone());

    let client = AnalyzerClient::new(base_url, Duration::from_secs(5)).unwrap();
    let trigger = AnalysisTrigger::new(client, bus, None);
    let watcher = trigger.spawn_watcher(pool.clone());

    pipeline.submit(upload("42", "Glass Orchard")).await.unwrap();

    let (id, _) = next_request(&mut rx).await.expect("analyzer should be called");
    assert_eq!(id, "42");
    assert!(trigger.was_dispatched("42").await);

    watcher.abort();
}

#[tokio::test]
async fn test_watcher_releases_guard_when_triage_is_recorded() {
    let (base_url, mut rx) = start_analyzer().await;
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vellum.db")).await.unwrap();
    let bus = EventBus::new(64);
    let pipeline = ModerationPipeline::new(pool.clone(), bus.clone());

    let client = AnalyzerClient::new(base_url, Duration::from_secs(5)).unwrap();
    let trigger = AnalysisTrigger::new(client, bus, None);
    let watcher = trigger.spawn_watcher(pool.clone());

    pipeline.submit(upload("51", "Salt Flats")).await.unwrap();
    next_request(&mut rx).await.expect("analyzer should be called");
    assert!(trigger.was_dispatched("51").await);

    pipeline.record_triage("51", 64.0).await.unwrap();

    let mut released = false;
    for _ in 0..50 {
        if !trigger.was_dispatched("51").await {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(released, "guard should be released after triage");

    // Checked submissions are not dispatched again
    assert_eq!(trigger.sweep(&pool).await.unwrap(), 0);

    watcher.abort();
}

#[tokio::test]
async fn test_reconciled_report_is_dispatched() {
    let (base_url, mut rx) = start_analyzer().await;
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vellum.db")).await.unwrap();
    let bus = EventBus::new(64);
    let pipeline = ModerationPipeline::new(pool.clone(), bus.clone());

    let client = AnalyzerClient::new(base_url, Duration::from_secs(5)).unwrap();
    let trigger = AnalysisTrigger::new(client, bus, None);
    let watcher = trigger.spawn_watcher(pool.clone());

    let report = pipeline
        .file_report(vellum_mq::pipeline::NewReport {
            id: None,
            content_label: "Ghost Piece".to_string(),
            reported_creator_handle: "Mara Chen".to_string(),
            reason: "Suspected AI generation".to_string(),
            reporter_handle: "@watcher".to_string(),
            severity: vellum_common::db::Severity::High,
        })
        .await
        .unwrap();
    let submission_id = pipeline.reconcile_report(&report.id).await.unwrap();

    let (id, _) = next_request(&mut rx).await.expect("analyzer should be called");
    assert_eq!(id, submission_id);

    watcher.abort();
}
