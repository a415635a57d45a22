//! Database initialization
//!
//! Opens (or creates) the SQLite record store, creates the moderation tables,
//! runs versioned migrations and seeds default settings.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas apply to every pooled connection
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Idempotent - safe to call multiple times
    create_schema_version_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_submissions_table(&pool).await?;
    create_community_reports_table(&pool).await?;
    create_audit_records_table(&pool).await?;
    create_decision_effects_table(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    init_default_settings(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            creator_handle TEXT NOT NULL,
            title TEXT NOT NULL,
            media_category TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            queue_status TEXT NOT NULL CHECK (queue_status IN
                ('Priority', 'Regular', 'Flagged', 'Approved', 'Rejected')),
            ai_confidence_score REAL CHECK (ai_confidence_score IS NULL OR
                (ai_confidence_score >= 0.0 AND ai_confidence_score <= 100.0)),
            ai_checked INTEGER NOT NULL DEFAULT 0,
            metadata_attributes TEXT NOT NULL DEFAULT '[]',
            review_notes TEXT,
            reviewer TEXT,
            reviewed_at TEXT,
            CHECK (queue_status NOT IN ('Approved', 'Rejected')
                OR (reviewer IS NOT NULL AND reviewed_at IS NOT NULL AND review_notes IS NOT NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_community_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS community_reports (
            id TEXT PRIMARY KEY,
            content_label TEXT NOT NULL,
            reported_creator_handle TEXT NOT NULL,
            reason TEXT NOT NULL,
            reporter_handle TEXT NOT NULL,
            severity TEXT NOT NULL CHECK (severity IN ('Critical', 'High', 'Medium', 'Low')),
            resolution_status TEXT NOT NULL DEFAULT 'Pending'
                CHECK (resolution_status IN ('Pending', 'In Review', 'Resolved')),
            linked_submission_id TEXT REFERENCES submissions(id),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_audit_records_table(pool: &SqlitePool) -> Result<()> {
    // AUTOINCREMENT keeps ids strictly increasing even after the highest row is gone
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            actor_handle TEXT NOT NULL,
            action_label TEXT NOT NULL,
            target_description TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            origin_address TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Outbox of decision follow-up effects awaiting application
async fn create_decision_effects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS decision_effects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_id TEXT NOT NULL REFERENCES submissions(id),
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist, resetting NULL values to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "outbox_retry_interval_secs", "30").await?;
    ensure_setting(pool, "outbox_batch_size", "100").await?;
    ensure_setting(pool, "analyzer_timeout_secs", "10").await?;
    ensure_setting(pool, "triage_sweep_on_startup", "true").await?;

    Ok(())
}

/// Insert a setting if missing, or reset it if NULL
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read a setting, falling back to `default` when missing or unparsable
pub async fn get_setting<T: std::str::FromStr>(pool: &SqlitePool, key: &str, default: T) -> Result<T> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value
        .flatten()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default))
}
