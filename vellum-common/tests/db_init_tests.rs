//! Database initialization tests

use tempfile::TempDir;
use vellum_common::db::get_setting;
use vellum_common::db::init::init_database;
use vellum_common::db::migrations::get_schema_version;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("vellum.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("vellum.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_moderation_tables_exist() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vellum.db")).await.unwrap();

    for table in ["submissions", "community_reports", "audit_records", "decision_effects", "settings"] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }

    assert_eq!(get_schema_version(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vellum.db")).await.unwrap();

    let interval: u64 = get_setting(&pool, "outbox_retry_interval_secs", 0).await.unwrap();
    assert_eq!(interval, 30);

    let missing: u64 = get_setting(&pool, "no_such_setting", 7).await.unwrap();
    assert_eq!(missing, 7);
}

#[tokio::test]
async fn test_terminal_submission_requires_reviewer() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("vellum.db")).await.unwrap();

    let result = sqlx::query(
        r#"
        INSERT INTO submissions (id, creator_handle, title, media_category, submitted_at, queue_status)
        VALUES ('x', '@a', 'Untitled', 'Digital Art', '2024-01-01T00:00:00.000000Z', 'Approved')
        "#,
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Approved row without reviewer must be rejected");
}
