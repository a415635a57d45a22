//! Submission persistence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, QueryBuilder, Row, Sqlite};
use vellum_common::db::{MetadataAttribute, QueueStatus, Submission, Verdict};
use vellum_common::{time, Error, Result};

use super::parse_column;

const SUBMISSION_COLUMNS: &str = "id, creator_handle, title, media_category, submitted_at, \
     queue_status, ai_confidence_score, ai_checked, metadata_attributes, \
     review_notes, reviewer, reviewed_at";

/// Ordering for submission listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionOrder {
    /// Queue order: oldest submission first
    #[default]
    SubmittedAsc,
    /// Feed order: newest submission first
    SubmittedDesc,
    /// History order: most recent verdict first
    ReviewedDesc,
}

/// Equality and substring filters for submission queries
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub status: Option<QueueStatus>,
    pub creator_handle: Option<String>,
    pub title_contains: Option<String>,
    /// Some(true) = decided only, Some(false) = still queued only
    pub terminal: Option<bool>,
    pub order: SubmissionOrder,
    pub limit: Option<i64>,
}

pub(crate) fn submission_from_row(row: &SqliteRow) -> Result<Submission> {
    let status: String = row.try_get("queue_status")?;
    let submitted_at: String = row.try_get("submitted_at")?;
    let reviewed_at: Option<String> = row.try_get("reviewed_at")?;
    let attributes: String = row.try_get("metadata_attributes")?;

    let metadata_attributes: Vec<MetadataAttribute> = serde_json::from_str(&attributes)
        .map_err(|e| Error::Internal(format!("Corrupt metadata_attributes: {}", e)))?;

    Ok(Submission {
        id: row.try_get("id")?,
        creator_handle: row.try_get("creator_handle")?,
        title: row.try_get("title")?,
        media_category: row.try_get("media_category")?,
        submitted_at: parse_column(&submitted_at)?,
        queue_status: status.parse()?,
        ai_confidence_score: row.try_get("ai_confidence_score")?,
        ai_checked: row.try_get("ai_checked")?,
        metadata_attributes,
        review_notes: row.try_get("review_notes")?,
        reviewer: row.try_get("reviewer")?,
        reviewed_at: reviewed_at.as_deref().map(parse_column).transpose()?,
    })
}

/// Insert a new submission
pub async fn insert_submission<'e, E>(executor: E, submission: &Submission) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let attributes = serde_json::to_string(&submission.metadata_attributes)
        .map_err(|e| Error::Internal(format!("Failed to serialize metadata: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO submissions (
            id, creator_handle, title, media_category, submitted_at,
            queue_status, ai_confidence_score, ai_checked, metadata_attributes,
            review_notes, reviewer, reviewed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&submission.id)
    .bind(&submission.creator_handle)
    .bind(&submission.title)
    .bind(&submission.media_category)
    .bind(time::to_db(&submission.submitted_at))
    .bind(submission.queue_status.as_str())
    .bind(submission.ai_confidence_score)
    .bind(submission.ai_checked)
    .bind(attributes)
    .bind(&submission.review_notes)
    .bind(&submission.reviewer)
    .bind(submission.reviewed_at.as_ref().map(time::to_db))
    .execute(executor)
    .await?;

    Ok(())
}

/// Insert `submission` unless a submission with the same title already exists
///
/// The existence check and the insert are one statement, so inside a
/// transaction this takes the write lock before anything is read. Returns true
/// when the row was inserted.
pub async fn insert_submission_if_title_absent<'e, E>(
    executor: E,
    submission: &Submission,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let attributes = serde_json::to_string(&submission.metadata_attributes)
        .map_err(|e| Error::Internal(format!("Failed to serialize metadata: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO submissions (
            id, creator_handle, title, media_category, submitted_at,
            queue_status, ai_confidence_score, ai_checked, metadata_attributes,
            review_notes, reviewer, reviewed_at
        )
        SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM submissions WHERE title = ?)
        "#,
    )
    .bind(&submission.id)
    .bind(&submission.creator_handle)
    .bind(&submission.title)
    .bind(&submission.media_category)
    .bind(time::to_db(&submission.submitted_at))
    .bind(submission.queue_status.as_str())
    .bind(submission.ai_confidence_score)
    .bind(submission.ai_checked)
    .bind(attributes)
    .bind(&submission.review_notes)
    .bind(&submission.reviewer)
    .bind(submission.reviewed_at.as_ref().map(time::to_db))
    .bind(&submission.title)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Load one submission by id
pub async fn get_submission<'e, E>(executor: E, id: &str) -> Result<Option<Submission>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM submissions WHERE id = ?", SUBMISSION_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;

    row.as_ref().map(submission_from_row).transpose()
}

/// Ids of submissions whose title equals `title`, in first-match order
///
/// First match is the earliest submission; ties on time fall back to id.
pub async fn find_ids_by_title<'e, E>(executor: E, title: &str) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids = sqlx::query_scalar(
        "SELECT id FROM submissions WHERE title = ? ORDER BY submitted_at ASC, id ASC",
    )
    .bind(title)
    .fetch_all(executor)
    .await?;

    Ok(ids)
}

/// List submissions matching `filter`
pub async fn list_submissions<'e, E>(executor: E, filter: &SubmissionFilter) -> Result<Vec<Submission>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM submissions WHERE 1 = 1", SUBMISSION_COLUMNS));

    if let Some(status) = filter.status {
        qb.push(" AND queue_status = ").push_bind(status.as_str());
    }
    if let Some(creator) = &filter.creator_handle {
        qb.push(" AND creator_handle = ").push_bind(creator.clone());
    }
    if let Some(fragment) = &filter.title_contains {
        qb.push(" AND instr(lower(title), lower(")
            .push_bind(fragment.clone())
            .push(")) > 0");
    }
    match filter.terminal {
        Some(true) => {
            qb.push(" AND queue_status IN ('Approved', 'Rejected')");
        }
        Some(false) => {
            qb.push(" AND queue_status NOT IN ('Approved', 'Rejected')");
        }
        None => {}
    }

    qb.push(match filter.order {
        SubmissionOrder::SubmittedAsc => " ORDER BY submitted_at ASC, id ASC",
        SubmissionOrder::SubmittedDesc => " ORDER BY submitted_at DESC, id DESC",
        SubmissionOrder::ReviewedDesc => " ORDER BY reviewed_at DESC, id DESC",
    });

    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }

    let rows = qb.build().fetch_all(executor).await?;
    rows.iter().map(submission_from_row).collect()
}

/// Submissions still waiting for automated triage
pub async fn list_awaiting_triage<'e, E>(executor: E) -> Result<Vec<Submission>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM submissions WHERE ai_checked = 0 AND ai_confidence_score IS NULL \
         ORDER BY submitted_at ASC, id ASC",
        SUBMISSION_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(submission_from_row).collect()
}

/// Write a verdict onto a submission, returning the updated row
///
/// Returns `None` when no submission has this id. The UPDATE is the first
/// statement so a surrounding transaction takes the write lock immediately.
pub async fn record_decision<'e, E>(
    executor: E,
    id: &str,
    verdict: Verdict,
    notes: &str,
    reviewer: &str,
    reviewed_at: &DateTime<Utc>,
) -> Result<Option<Submission>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "UPDATE submissions SET queue_status = ?, review_notes = ?, reviewer = ?, reviewed_at = ? \
         WHERE id = ? RETURNING {}",
        SUBMISSION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(verdict.queue_status().as_str())
        .bind(notes)
        .bind(reviewer)
        .bind(time::to_db(reviewed_at))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(submission_from_row).transpose()
}

/// Store the analyzer's triage result, returning the updated row
pub async fn record_triage<'e, E>(executor: E, id: &str, score: f64) -> Result<Option<Submission>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "UPDATE submissions SET ai_confidence_score = ?, ai_checked = 1 WHERE id = ? RETURNING {}",
        SUBMISSION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(score)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(submission_from_row).transpose()
}
