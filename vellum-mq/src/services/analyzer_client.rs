//! Analyzer service client
//!
//! The analyzer scores a submission for likely AI generation and writes the
//! result back through the triage endpoint. Requests carry no body and the
//! response content is not used.

use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("vellum-mq/", env!("CARGO_PKG_VERSION"));

/// Analyzer client errors
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Client could not be built or the request never completed
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Analyzer answered with a non-success status
    #[error("Analyzer returned {0}")]
    Rejected(u16),

    /// Base URL cannot carry a request path
    #[error("Invalid analyzer URL: {0}")]
    InvalidUrl(String),
}

/// HTTP client for `POST {base}/process/{id}`
#[derive(Debug, Clone)]
pub struct AnalyzerClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AnalyzerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AnalyzerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyzerError::NetworkError(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| AnalyzerError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(AnalyzerError::InvalidUrl(base_url));
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL the analyzer is asked to process for `submission_id`
    ///
    /// The id is one percent-encoded path segment.
    pub fn process_url(&self, submission_id: &str) -> Result<reqwest::Url, AnalyzerError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AnalyzerError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| AnalyzerError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["process", submission_id]);
        Ok(url)
    }

    /// Ask the analyzer to triage one submission
    pub async fn request_analysis(&self, submission_id: &str) -> Result<(), AnalyzerError> {
        let url = self.process_url(submission_id)?;

        tracing::debug!(submission_id = %submission_id, url = %url, "Requesting analysis");

        let response = self
            .http_client
            .post(url)
            .send()
            .await
            .map_err(|e| AnalyzerError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::Rejected(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_url_trims_trailing_slash() {
        let client = AnalyzerClient::new("http://127.0.0.1:8787/", Duration::from_secs(10)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8787");
        assert_eq!(
            client.process_url("42").unwrap().as_str(),
            "http://127.0.0.1:8787/process/42"
        );
    }

    #[test]
    fn test_process_url_encodes_submission_id() {
        let client = AnalyzerClient::new("http://127.0.0.1:8787/api", Duration::from_secs(10)).unwrap();
        assert_eq!(
            client.process_url("a/b?c#d").unwrap().as_str(),
            "http://127.0.0.1:8787/api/process/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn test_rejects_base_without_path() {
        assert!(matches!(
            AnalyzerClient::new("mailto:analyzer@example.com", Duration::from_secs(10)),
            Err(AnalyzerError::InvalidUrl(_))
        ));
        assert!(matches!(
            AnalyzerClient::new("not a url", Duration::from_secs(10)),
            Err(AnalyzerError::InvalidUrl(_))
        ));
    }
}
