//! Database schema migrations
//!
//! Versioned migrations tracked in the `schema_version` table. Each migration is
//! idempotent so a partially applied upgrade can simply be re-run.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use IF NOT EXISTS** - migrations must be safe to repeat

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: lookup indexes
///
/// Reconciliation matches reports to submissions by title, and decisions
/// resolve reports by link or by content label.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: moderation lookup indexes");

    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_submissions_title ON submissions(title)",
        "CREATE INDEX IF NOT EXISTS idx_submissions_queue_status ON submissions(queue_status)",
        "CREATE INDEX IF NOT EXISTS idx_submissions_creator ON submissions(creator_handle)",
        "CREATE INDEX IF NOT EXISTS idx_reports_linked_submission ON community_reports(linked_submission_id)",
        "CREATE INDEX IF NOT EXISTS idx_reports_content_label ON community_reports(content_label)",
        "CREATE INDEX IF NOT EXISTS idx_effects_submission ON decision_effects(submission_id)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    info!("  ✓ Created {} indexes", statements.len());
    Ok(())
}

/// Migration v2: make audit records append-only
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: audit record immutability triggers");

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS audit_records_no_update
        BEFORE UPDATE ON audit_records
        BEGIN
            SELECT RAISE(ABORT, 'audit records are immutable');
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS audit_records_no_delete
        BEFORE DELETE ON audit_records
        BEGIN
            SELECT RAISE(ABORT, 'audit records are immutable');
        END
        "#,
    )
    .execute(pool)
    .await?;

    info!("  ✓ Audit records are now append-only");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        // Single connection: every pooled connection to :memory: is its own database
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn create_tables(pool: &SqlitePool) {
        for sql in [
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
            "CREATE TABLE submissions (id TEXT PRIMARY KEY, title TEXT, queue_status TEXT, creator_handle TEXT)",
            "CREATE TABLE community_reports (id TEXT PRIMARY KEY, linked_submission_id TEXT, content_label TEXT)",
            "CREATE TABLE decision_effects (id INTEGER PRIMARY KEY, submission_id TEXT)",
            "CREATE TABLE audit_records (id INTEGER PRIMARY KEY AUTOINCREMENT, action_label TEXT)",
        ] {
            sqlx::query(sql).execute(pool).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_schema_version_without_table_is_zero() {
        let pool = setup_test_db().await;
        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_migrations_reach_current_version() {
        let pool = setup_test_db().await;
        create_tables(&pool).await;

        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

        // Second run is a no-op
        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_audit_records_reject_update_and_delete() {
        let pool = setup_test_db().await;
        create_tables(&pool).await;
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO audit_records (action_label) VALUES ('Approved Content')")
            .execute(&pool)
            .await
            .unwrap();

        let update = sqlx::query("UPDATE audit_records SET action_label = 'tampered'")
            .execute(&pool)
            .await;
        assert!(update.is_err(), "UPDATE on audit_records must abort");

        let delete = sqlx::query("DELETE FROM audit_records").execute(&pool).await;
        assert!(delete.is_err(), "DELETE on audit_records must abort");

        let label: String = sqlx::query_scalar("SELECT action_label FROM audit_records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(label, "Approved Content");
    }
}
