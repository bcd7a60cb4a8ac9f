//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use zdmerge_client::RetryPolicy;

/// Tunables for a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Records per scanner page (default: 100).
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Directory the audit report is written to (default: "./files").
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Retry budget for the re-primary step.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_page_size() -> i64 {
    100
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./files")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            report_dir: default_report_dir(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Set the scanner page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the report directory.
    #[must_use]
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Set the re-primary retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.report_dir, PathBuf::from("./files"));
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn test_deserialize_with_partial_fields() {
        let config: EngineConfig = serde_json::from_str(r#"{"page_size": 50}"#).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.report_dir, PathBuf::from("./files"));
    }
}
