//! Append-only audit trail
//!
//! Only insert and select live here; table triggers abort UPDATE and DELETE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use vellum_common::db::AuditRecord;
use vellum_common::{time, Result};

use super::parse_column;

/// Audit entry before the store assigns its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub actor_handle: String,
    pub action_label: String,
    pub target_description: String,
    pub occurred_at: DateTime<Utc>,
    pub origin_address: String,
}

/// Append one audit record, returning its id
pub async fn append_audit<'e, E>(executor: E, record: &NewAuditRecord) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO audit_records (actor_handle, action_label, target_description, occurred_at, origin_address)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.actor_handle)
    .bind(&record.action_label)
    .bind(&record.target_description)
    .bind(time::to_db(&record.occurred_at))
    .bind(&record.origin_address)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent audit records first
pub async fn list_audit<'e, E>(executor: E, limit: i64) -> Result<Vec<AuditRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, actor_handle, action_label, target_description, occurred_at, origin_address
        FROM audit_records ORDER BY id DESC LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await?;

    rows.iter().map(audit_from_row).collect()
}

fn audit_from_row(row: &SqliteRow) -> Result<AuditRecord> {
    let occurred_at: String = row.try_get("occurred_at")?;

    Ok(AuditRecord {
        id: row.try_get("id")?,
        actor_handle: row.try_get("actor_handle")?,
        action_label: row.try_get("action_label")?,
        target_description: row.try_get("target_description")?,
        occurred_at: parse_column(&occurred_at)?,
        origin_address: row.try_get("origin_address")?,
    })
}
