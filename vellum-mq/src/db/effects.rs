//! Decision outbox persistence
//!
//! A decision commits its submission update together with one row per
//! follow-up effect. Each row is deleted in the same transaction that applies
//! it, so an effect lands exactly once no matter how often it is retried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use vellum_common::db::CommunityReport;
use vellum_common::{time, Error, Result};

use super::audit::NewAuditRecord;
use super::parse_column;

/// A follow-up write owed by a committed decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DecisionEffect {
    /// Record the verdict as a resolved report entry
    ResolutionEntry { report: CommunityReport },
    /// Resolve reports bound to the submission by link or title
    ResolveReports { submission_id: String, title: String },
    /// Append the decision to the audit trail
    AppendAudit { record: NewAuditRecord },
}

impl DecisionEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionEffect::ResolutionEntry { .. } => "ResolutionEntry",
            DecisionEffect::ResolveReports { .. } => "ResolveReports",
            DecisionEffect::AppendAudit { .. } => "AppendAudit",
        }
    }
}

/// An outbox row that has not been applied yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingEffect {
    pub id: i64,
    pub submission_id: String,
    pub effect: DecisionEffect,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn effect_from_row(row: &SqliteRow) -> Result<PendingEffect> {
    let payload: String = row.try_get("payload")?;
    let created_at: String = row.try_get("created_at")?;

    let effect = serde_json::from_str(&payload)
        .map_err(|e| Error::Internal(format!("Corrupt outbox payload: {}", e)))?;

    Ok(PendingEffect {
        id: row.try_get("id")?,
        submission_id: row.try_get("submission_id")?,
        effect,
        attempts: row.try_get("attempts")?,
        last_error: row.try_get("last_error")?,
        created_at: parse_column(&created_at)?,
    })
}

/// Queue an effect, returning its outbox id
pub async fn enqueue_effect<'e, E>(
    executor: E,
    submission_id: &str,
    effect: &DecisionEffect,
    created_at: &DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let payload = serde_json::to_string(effect)
        .map_err(|e| Error::Internal(format!("Failed to serialize effect: {}", e)))?;

    let result = sqlx::query(
        "INSERT INTO decision_effects (submission_id, kind, payload, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(submission_id)
    .bind(effect.kind())
    .bind(payload)
    .bind(time::to_db(created_at))
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Remove an effect from the outbox, returning it
///
/// Run inside the transaction that applies the effect; a rollback puts the
/// row back.
pub async fn take_effect<'e, E>(executor: E, id: i64) -> Result<Option<PendingEffect>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        DELETE FROM decision_effects WHERE id = ?
        RETURNING id, submission_id, payload, attempts, last_error, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(effect_from_row).transpose()
}

/// Count a failed application attempt
pub async fn record_failure<'e, E>(executor: E, id: i64, error: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE decision_effects SET attempts = attempts + 1, last_error = ? WHERE id = ?")
        .bind(error)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Submission id and kind of a pending effect
pub async fn describe_effect<'e, E>(executor: E, id: i64) -> Result<Option<(String, String)>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as("SELECT submission_id, kind FROM decision_effects WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row)
}

/// Pending effects in enqueue order
pub async fn list_pending<'e, E>(executor: E, limit: i64) -> Result<Vec<PendingEffect>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT id, submission_id, payload, attempts, last_error, created_at
        FROM decision_effects ORDER BY id ASC LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await?;

    rows.iter().map(effect_from_row).collect()
}
