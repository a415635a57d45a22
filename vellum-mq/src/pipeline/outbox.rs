//! Outbox relay for decision follow-ups

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use vellum_common::{time, EventBus, ModerationEvent};

use crate::db::effects::{self, DecisionEffect, PendingEffect};
use crate::db::{audit, reports};
use crate::error::PipelineResult;

/// Write one effect, returning the notification it owes
async fn apply_effect(
    conn: &mut SqliteConnection,
    effect: &DecisionEffect,
) -> PipelineResult<ModerationEvent> {
    let event = match effect {
        DecisionEffect::ResolutionEntry { report } => {
            reports::insert_report(&mut *conn, report).await?;
            ModerationEvent::ReportFiled {
                report_id: report.id.clone(),
                timestamp: time::now(),
            }
        }
        DecisionEffect::ResolveReports {
            submission_id,
            title,
        } => {
            let resolved_count = reports::resolve_reports_for(&mut *conn, submission_id, title).await?;
            ModerationEvent::ReportsResolved {
                submission_id: submission_id.clone(),
                resolved_count,
                timestamp: time::now(),
            }
        }
        DecisionEffect::AppendAudit { record } => {
            let audit_id = audit::append_audit(&mut *conn, record).await?;
            ModerationEvent::AuditAppended {
                audit_id,
                action_label: record.action_label.clone(),
                timestamp: time::now(),
            }
        }
    };
    Ok(event)
}

/// Result of one pass over the outbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub applied: usize,
    pub deferred: usize,
}

/// Applies pending decision effects, each exactly once
#[derive(Clone)]
pub struct EffectRelay {
    db: SqlitePool,
    event_bus: EventBus,
}

impl EffectRelay {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Apply one outbox entry
    ///
    /// Returns `Ok(false)` when the entry is already gone (applied elsewhere).
    pub async fn apply(&self, effect_id: i64) -> PipelineResult<bool> {
        let mut tx = self.db.begin().await?;

        let Some(pending) = effects::take_effect(&mut *tx, effect_id).await? else {
            return Ok(false);
        };

        let event = match apply_effect(&mut *tx, &pending.effect).await {
            Ok(event) => event,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };

        tx.commit().await?;

        debug!(
            effect_id,
            kind = pending.effect.kind(),
            submission_id = %pending.submission_id,
            "Decision effect applied"
        );
        self.event_bus.emit_lossy(event);

        Ok(true)
    }

    /// Apply one entry, recording a failure on the entry instead of returning it
    ///
    /// Returns true when the entry no longer needs work.
    pub async fn settle(&self, effect_id: i64) -> bool {
        match self.apply(effect_id).await {
            Ok(_) => true,
            Err(e) => {
                let error = e.to_string();
                if let Err(record_err) = effects::record_failure(&self.db, effect_id, &error).await {
                    warn!(effect_id, error = %record_err, "Could not record outbox failure");
                }

                let (submission_id, kind) = self.describe(effect_id).await;
                warn!(effect_id, kind = %kind, error = %error, "Decision effect failed");
                self.event_bus.emit_lossy(ModerationEvent::EffectDeferred {
                    submission_id,
                    effect_kind: kind,
                    error,
                    timestamp: time::now(),
                });
                false
            }
        }
    }

    /// Retry every pending effect once, oldest first
    pub async fn drain(&self, batch_size: i64) -> PipelineResult<DrainSummary> {
        let pending = effects::list_pending(&self.db, batch_size).await?;
        let mut summary = DrainSummary::default();

        for effect in pending {
            if self.settle(effect.id).await {
                summary.applied += 1;
            } else {
                summary.deferred += 1;
            }
        }

        if summary.applied + summary.deferred > 0 {
            info!(
                applied = summary.applied,
                deferred = summary.deferred,
                "Outbox drain finished"
            );
        }
        Ok(summary)
    }

    /// Pending effects, oldest first
    pub async fn pending(&self, limit: i64) -> PipelineResult<Vec<PendingEffect>> {
        Ok(effects::list_pending(&self.db, limit).await?)
    }

    /// Submission id and kind of a still-pending entry, for diagnostics
    async fn describe(&self, effect_id: i64) -> (String, String) {
        match effects::describe_effect(&self.db, effect_id).await {
            Ok(Some(described)) => described,
            Ok(None) => ("unknown".to_string(), "unknown".to_string()),
            Err(e) => {
                debug!(effect_id, error = %e, "Could not describe outbox entry");
                ("unknown".to_string(), "unknown".to_string())
            }
        }
    }
}
