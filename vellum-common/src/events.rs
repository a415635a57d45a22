//! Change-notification events for the Vellum record store
//!
//! Every committed write to the store emits one [`ModerationEvent`] on the
//! [`EventBus`]. Observers (reviewer views over SSE, the analysis trigger) refresh
//! from these notifications. No ordering guarantee holds across subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::models::Verdict;

/// Vellum event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModerationEvent {
    /// A submission entered the queue
    ///
    /// Triggers:
    /// - Analysis trigger: dispatch triage if still unscanned
    /// - SSE: refresh queue views
    SubmissionCreated {
        submission_id: String,
        creator_handle: String,
        /// True when reconciliation synthesized the submission from a report
        synthesized: bool,
        timestamp: DateTime<Utc>,
    },

    /// A reviewer verdict was written to a submission
    DecisionApplied {
        submission_id: String,
        verdict: Verdict,
        reviewer: String,
        timestamp: DateTime<Utc>,
    },

    /// The analyzer wrote back a triage result
    TriageRecorded {
        submission_id: String,
        /// Confidence percentage reported by the analyzer
        score: f64,
        timestamp: DateTime<Utc>,
    },

    /// A community report was filed (or synthesized as a resolution entry)
    ReportFiled {
        report_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Reconciliation bound a report to a submission
    ReportLinked {
        report_id: String,
        submission_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Reports tied to a decided submission were marked Resolved
    ReportsResolved {
        submission_id: String,
        resolved_count: u64,
        timestamp: DateTime<Utc>,
    },

    /// An audit record was appended
    AuditAppended {
        audit_id: i64,
        action_label: String,
        timestamp: DateTime<Utc>,
    },

    /// A triage request was sent to the analyzer (response not awaited)
    AnalysisDispatched {
        submission_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A decision follow-up failed and stays in the outbox for retry
    EffectDeferred {
        submission_id: String,
        effect_kind: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl ModerationEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ModerationEvent::SubmissionCreated { .. } => "SubmissionCreated",
            ModerationEvent::DecisionApplied { .. } => "DecisionApplied",
            ModerationEvent::TriageRecorded { .. } => "TriageRecorded",
            ModerationEvent::ReportFiled { .. } => "ReportFiled",
            ModerationEvent::ReportLinked { .. } => "ReportLinked",
            ModerationEvent::ReportsResolved { .. } => "ReportsResolved",
            ModerationEvent::AuditAppended { .. } => "AuditAppended",
            ModerationEvent::AnalysisDispatched { .. } => "AnalysisDispatched",
            ModerationEvent::EffectDeferred { .. } => "EffectDeferred",
        }
    }
}

/// Central event distribution bus for store change notifications
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use vellum_common::events::{EventBus, ModerationEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ModerationEvent::ReportFiled {
///     report_id: "#880".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "ReportFiled");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ModerationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before the oldest are
    /// dropped for lagging subscribers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ModerationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ModerationEvent,
    ) -> Result<usize, broadcast::error::SendError<ModerationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ModerationEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        let result = bus.emit(ModerationEvent::ReportFiled {
            report_id: "#1".to_string(),
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(ModerationEvent::DecisionApplied {
            submission_id: "1".to_string(),
            verdict: Verdict::Rejected,
            reviewer: "Alex Riviera".to_string(),
            timestamp: Utc::now(),
        })
        .expect("emit should succeed");

        assert_eq!(rx1.try_recv().unwrap().event_type(), "DecisionApplied");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "DecisionApplied");
    }

    #[test]
    fn test_eventbus_emit_lossy_on_full_channel() {
        let bus = EventBus::new(2);
        let _rx = bus.subscribe();

        for i in 0..10 {
            bus.emit_lossy(ModerationEvent::AnalysisDispatched {
                submission_id: i.to_string(),
                timestamp: Utc::now(),
            });
        }

        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ModerationEvent::ReportLinked {
            report_id: "#880".to_string(),
            submission_id: "report_link_1".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"ReportLinked\""));
        assert!(json.contains("\"submission_id\":\"report_link_1\""));

        let back: ModerationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "ReportLinked");
    }
}
