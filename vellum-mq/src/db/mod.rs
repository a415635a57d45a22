//! Record store access for the moderation queue
//!
//! Thin query functions over the SQLite pool. Each takes any sqlx executor so the
//! same call works on the pool or inside a pipeline transaction.

pub mod audit;
pub mod effects;
pub mod reports;
pub mod submissions;

use chrono::{DateTime, Utc};
use vellum_common::{time, Error, Result};

/// Parse a stored timestamp column
fn parse_column(value: &str) -> Result<DateTime<Utc>> {
    time::from_db(value).map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", value, e)))
}
