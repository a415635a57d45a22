//! Community report persistence

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use vellum_common::db::CommunityReport;
use vellum_common::{time, Result};

use super::parse_column;

const REPORT_COLUMNS: &str = "id, content_label, reported_creator_handle, reason, \
     reporter_handle, severity, resolution_status, linked_submission_id, created_at";

/// Report listing tabs
///
/// The pending tab covers both Pending and In Review reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportTab {
    #[default]
    All,
    Pending,
    Resolved,
}

fn report_from_row(row: &SqliteRow) -> Result<CommunityReport> {
    let severity: String = row.try_get("severity")?;
    let status: String = row.try_get("resolution_status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(CommunityReport {
        id: row.try_get("id")?,
        content_label: row.try_get("content_label")?,
        reported_creator_handle: row.try_get("reported_creator_handle")?,
        reason: row.try_get("reason")?,
        reporter_handle: row.try_get("reporter_handle")?,
        severity: severity.parse()?,
        resolution_status: status.parse()?,
        linked_submission_id: row.try_get("linked_submission_id")?,
        created_at: parse_column(&created_at)?,
    })
}

/// Insert a community report
pub async fn insert_report<'e, E>(executor: E, report: &CommunityReport) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO community_reports (
            id, content_label, reported_creator_handle, reason, reporter_handle,
            severity, resolution_status, linked_submission_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&report.id)
    .bind(&report.content_label)
    .bind(&report.reported_creator_handle)
    .bind(&report.reason)
    .bind(&report.reporter_handle)
    .bind(report.severity.as_str())
    .bind(report.resolution_status.as_str())
    .bind(&report.linked_submission_id)
    .bind(time::to_db(&report.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Load one report by id
pub async fn get_report<'e, E>(executor: E, id: &str) -> Result<Option<CommunityReport>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM community_reports WHERE id = ?", REPORT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;

    row.as_ref().map(report_from_row).transpose()
}

/// List reports for a tab, newest first
pub async fn list_reports<'e, E>(executor: E, tab: ReportTab) -> Result<Vec<CommunityReport>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let condition = match tab {
        ReportTab::All => "1 = 1",
        ReportTab::Pending => "resolution_status IN ('Pending', 'In Review')",
        ReportTab::Resolved => "resolution_status = 'Resolved'",
    };
    let sql = format!(
        "SELECT {} FROM community_reports WHERE {} ORDER BY created_at DESC, id DESC",
        REPORT_COLUMNS, condition
    );

    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(report_from_row).collect()
}

/// Reports bound to a submission by foreign key
pub async fn list_reports_for_submission<'e, E>(
    executor: E,
    submission_id: &str,
) -> Result<Vec<CommunityReport>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM community_reports WHERE linked_submission_id = ? ORDER BY created_at ASC, id ASC",
        REPORT_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(submission_id).fetch_all(executor).await?;
    rows.iter().map(report_from_row).collect()
}

/// Bind an unlinked report to a submission
///
/// Returns false when the report is missing or was already linked.
pub async fn link_report<'e, E>(executor: E, report_id: &str, submission_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE community_reports SET linked_submission_id = ? WHERE id = ? AND linked_submission_id IS NULL",
    )
    .bind(submission_id)
    .bind(report_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Resolve every open report tied to a submission by link or by content label
pub async fn resolve_reports_for<'e, E>(executor: E, submission_id: &str, title: &str) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE community_reports SET resolution_status = 'Resolved'
        WHERE (linked_submission_id = ? OR content_label = ?)
          AND resolution_status != 'Resolved'
        "#,
    )
    .bind(submission_id)
    .bind(title)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
