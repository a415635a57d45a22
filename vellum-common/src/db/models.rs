//! Moderation record models
//!
//! Enum values are persisted as their display strings (`"Priority"`,
//! `"In Review"`, ...) so the stored rows read the same way reviewers see them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Notes recorded when a reviewer decides without writing any
pub const DEFAULT_REVIEW_NOTES: &str = "No reviewer notes provided.";

/// Position of a submission in the moderation queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueStatus {
    Priority,
    Regular,
    Flagged,
    Approved,
    Rejected,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Priority => "Priority",
            QueueStatus::Regular => "Regular",
            QueueStatus::Flagged => "Flagged",
            QueueStatus::Approved => "Approved",
            QueueStatus::Rejected => "Rejected",
        }
    }

    /// Approved and Rejected are verdicts; everything else is still queued
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Approved | QueueStatus::Rejected)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Priority" => Ok(QueueStatus::Priority),
            "Regular" => Ok(QueueStatus::Regular),
            "Flagged" => Ok(QueueStatus::Flagged),
            "Approved" => Ok(QueueStatus::Approved),
            "Rejected" => Ok(QueueStatus::Rejected),
            other => Err(Error::InvalidInput(format!("Unknown queue status: {}", other))),
        }
    }
}

/// Human decision outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "Approved",
            Verdict::Rejected => "Rejected",
        }
    }

    pub fn queue_status(&self) -> QueueStatus {
        match self {
            Verdict::Approved => QueueStatus::Approved,
            Verdict::Rejected => QueueStatus::Rejected,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(Verdict::Approved),
            "Rejected" => Ok(Verdict::Rejected),
            other => Err(Error::InvalidInput(format!("Unknown verdict: {}", other))),
        }
    }
}

/// Severity of a community report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Critical" => Ok(Severity::Critical),
            "High" => Ok(Severity::High),
            "Medium" => Ok(Severity::Medium),
            "Low" => Ok(Severity::Low),
            other => Err(Error::InvalidInput(format!("Unknown severity: {}", other))),
        }
    }
}

/// Resolution state of a community report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    Pending,
    #[serde(rename = "In Review")]
    InReview,
    Resolved,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Pending => "Pending",
            ResolutionStatus::InReview => "In Review",
            ResolutionStatus::Resolved => "Resolved",
        }
    }
}

impl FromStr for ResolutionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ResolutionStatus::Pending),
            "In Review" => Ok(ResolutionStatus::InReview),
            "Resolved" => Ok(ResolutionStatus::Resolved),
            other => Err(Error::InvalidInput(format!(
                "Unknown resolution status: {}",
                other
            ))),
        }
    }
}

/// One (label, value) pair of submission metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub label: String,
    pub value: String,
}

impl MetadataAttribute {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A content item moving through the moderation queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub creator_handle: String,
    pub title: String,
    pub media_category: String,
    pub submitted_at: DateTime<Utc>,
    pub queue_status: QueueStatus,
    /// Percentage in [0, 100], unset until triage completes
    pub ai_confidence_score: Option<f64>,
    pub ai_checked: bool,
    /// Insertion order is significant
    pub metadata_attributes: Vec<MetadataAttribute>,
    pub review_notes: Option<String>,
    pub reviewer: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Whether automated triage still needs to run for this submission
    pub fn awaits_triage(&self) -> bool {
        !self.ai_checked && self.ai_confidence_score.is_none()
    }
}

/// A flag raised by a community member against some content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityReport {
    pub id: String,
    /// Free-text description of the reported item (usually its title)
    pub content_label: String,
    pub reported_creator_handle: String,
    pub reason: String,
    pub reporter_handle: String,
    pub severity: Severity,
    pub resolution_status: ResolutionStatus,
    pub linked_submission_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Immutable trail entry for one moderation decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub actor_handle: String,
    pub action_label: String,
    pub target_description: String,
    pub occurred_at: DateTime<Utc>,
    pub origin_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_status_terminality() {
        assert!(QueueStatus::Approved.is_terminal());
        assert!(QueueStatus::Rejected.is_terminal());
        assert!(!QueueStatus::Priority.is_terminal());
        assert!(!QueueStatus::Regular.is_terminal());
        assert!(!QueueStatus::Flagged.is_terminal());
    }

    #[test]
    fn test_verdict_maps_to_terminal_status() {
        assert_eq!(Verdict::Approved.queue_status(), QueueStatus::Approved);
        assert_eq!(Verdict::Rejected.queue_status(), QueueStatus::Rejected);
    }

    #[test]
    fn test_verdict_rejects_non_verdict_status() {
        assert!("Flagged".parse::<Verdict>().is_err());
        assert!("approved".parse::<Verdict>().is_err());
        assert_eq!("Rejected".parse::<Verdict>().unwrap(), Verdict::Rejected);
    }

    #[test]
    fn test_in_review_uses_display_spelling() {
        assert_eq!(ResolutionStatus::InReview.as_str(), "In Review");
        assert_eq!(
            "In Review".parse::<ResolutionStatus>().unwrap(),
            ResolutionStatus::InReview
        );
        let json = serde_json::to_string(&ResolutionStatus::InReview).unwrap();
        assert_eq!(json, "\"In Review\"");
    }

    #[test]
    fn test_awaits_triage_requires_both_fields_unset() {
        let mut submission = Submission {
            id: "1".to_string(),
            creator_handle: "@jul_vane".to_string(),
            title: "Neon Horizon".to_string(),
            media_category: "Digital Illustration".to_string(),
            submitted_at: Utc::now(),
            queue_status: QueueStatus::Priority,
            ai_confidence_score: None,
            ai_checked: false,
            metadata_attributes: vec![],
            review_notes: None,
            reviewer: None,
            reviewed_at: None,
        };
        assert!(submission.awaits_triage());

        submission.ai_confidence_score = Some(92.4);
        assert!(!submission.awaits_triage());

        submission.ai_confidence_score = None;
        submission.ai_checked = true;
        assert!(!submission.awaits_triage());
    }
}
