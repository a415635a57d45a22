//! Outbound integrations
//!
//! - Analyzer client: requests triage for a submission
//! - Analysis trigger: decides when to request triage, once per submission per session

pub mod analysis_trigger;
pub mod analyzer_client;

pub use analysis_trigger::AnalysisTrigger;
pub use analyzer_client::{AnalyzerClient, AnalyzerError};
