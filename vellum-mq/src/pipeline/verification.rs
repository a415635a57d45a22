//! Verification status shown on creator feeds

use serde::{Deserialize, Serialize};
use std::fmt;
use vellum_common::db::{QueueStatus, Submission};

/// Display status derived from triage and verdict state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    Scanning,
    #[serde(rename = "Pending Review")]
    PendingReview,
    Verified,
}

impl VerificationStatus {
    /// Project `(ai_checked, approved)` onto a status
    pub fn project(ai_checked: bool, approved: bool) -> Self {
        match (ai_checked, approved) {
            (false, _) => VerificationStatus::Scanning,
            (true, false) => VerificationStatus::PendingReview,
            (true, true) => VerificationStatus::Verified,
        }
    }

    pub fn for_submission(submission: &Submission) -> Self {
        Self::project(
            submission.ai_checked,
            submission.queue_status == QueueStatus::Approved,
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::Scanning => "Scanning",
            VerificationStatus::PendingReview => "Pending Review",
            VerificationStatus::Verified => "Verified",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchecked_is_scanning_regardless_of_verdict() {
        assert_eq!(VerificationStatus::project(false, false), VerificationStatus::Scanning);
        assert_eq!(VerificationStatus::project(false, true), VerificationStatus::Scanning);
    }

    #[test]
    fn test_checked_projection() {
        assert_eq!(
            VerificationStatus::project(true, false),
            VerificationStatus::PendingReview
        );
        assert_eq!(VerificationStatus::project(true, true), VerificationStatus::Verified);
    }

    #[test]
    fn test_projection_is_stable() {
        for checked in [false, true] {
            for approved in [false, true] {
                assert_eq!(
                    VerificationStatus::project(checked, approved),
                    VerificationStatus::project(checked, approved)
                );
            }
        }
    }

    #[test]
    fn test_serialized_label() {
        let json = serde_json::to_string(&VerificationStatus::PendingReview).unwrap();
        assert_eq!(json, "\"Pending Review\"");
        assert_eq!(VerificationStatus::Verified.to_string(), "Verified");
    }
}
