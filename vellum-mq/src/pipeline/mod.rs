//! Moderation decision pipeline
//!
//! - [`ModerationPipeline::apply_decision`]: one verdict on one submission
//! - [`ModerationPipeline::apply_bulk_decision`]: one verdict fanned out over many
//! - [`ModerationPipeline::reconcile_report`]: bind a community report to a submission
//! - [`EffectRelay`]: applies and retries decision follow-ups from the outbox
//! - [`VerificationStatus`]: display label derived from persisted triage/verdict state
//!
//! Every operation takes the acting [`Reviewer`] explicitly; there is no
//! process-wide "current operator".

mod bulk;
mod decision;
mod intake;
mod outbox;
mod reconcile;
mod verification;

pub use bulk::{BulkItemOutcome, BulkOutcome};
pub use decision::SYSTEM_REPORTER;
pub use intake::{NewReport, NewSubmission};
pub use outbox::{DrainSummary, EffectRelay};
pub use reconcile::SYNTHESIZED_MEDIA_CATEGORY;
pub use verification::VerificationStatus;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use vellum_common::EventBus;

use crate::error::{PipelineError, PipelineResult};

/// Origin recorded when the caller's address is unknown
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// The human operator performing a moderation action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub handle: String,
    pub origin_address: String,
}

impl Reviewer {
    pub fn new(handle: impl Into<String>, origin_address: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            origin_address: origin_address.into(),
        }
    }

    fn validate(&self) -> PipelineResult<()> {
        if self.handle.trim().is_empty() {
            return Err(PipelineError::Validation("reviewer handle is required".to_string()));
        }
        Ok(())
    }
}

/// Entry point for all moderation pipeline operations
#[derive(Clone)]
pub struct ModerationPipeline {
    db: SqlitePool,
    event_bus: EventBus,
    relay: EffectRelay,
}

impl ModerationPipeline {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        let relay = EffectRelay::new(db.clone(), event_bus.clone());
        Self {
            db,
            event_bus,
            relay,
        }
    }

    /// Outbox relay sharing this pipeline's store and bus
    pub fn relay(&self) -> &EffectRelay {
        &self.relay
    }
}

/// Reject blank required text fields
fn require(field: &str, value: &str) -> PipelineResult<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
