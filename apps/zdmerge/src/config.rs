//! Tool configuration: JSON file plus environment overrides.
//!
//! Credentials can live in the environment (`ZENDESK_TOKEN`,
//! `DATABASE_URL`) so the file checked into an ops repo stays
//! secret-free.

use serde::Deserialize;
use std::path::Path;
use zdmerge_client::GatewayConfig;
use zdmerge_engine::EngineConfig;

use crate::error::{CliError, CliResult};

/// Full tool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Zendesk instance and call budget.
    pub zendesk: GatewayConfig,
    /// Engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Read the configuration file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| CliError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Overlay environment variables onto the file values.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(url) = std::env::var("ZENDESK_URL") {
            self.zendesk.base_url = url;
        }
        if let Ok(email) = std::env::var("ZENDESK_EMAIL") {
            self.zendesk.credentials.email = email;
        }
        if let Ok(token) = std::env::var("ZENDESK_TOKEN") {
            self.zendesk.credentials.token = token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "database_url": "postgres://localhost/app",
                "zendesk": {
                    "base_url": "https://acme.zendesk.com",
                    "credentials": {"email": "agent@acme.com", "token": "t0k3n"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/app");
        assert_eq!(config.zendesk.base_url, "https://acme.zendesk.com");
        // Ambient defaults fill in the rest.
        assert_eq!(config.zendesk.rate_limit.min_interval_ms, 600);
        assert_eq!(config.zendesk.rate_limit.max_concurrent, 1);
        assert_eq!(config.engine.page_size, 100);
    }

    #[test]
    fn test_parse_with_overrides() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "database_url": "postgres://localhost/app",
                "zendesk": {
                    "base_url": "https://acme.zendesk.com",
                    "credentials": {"email": "agent@acme.com", "token": "t"},
                    "rate_limit": {"reservoir": 200, "refresh_interval_secs": 60}
                },
                "engine": {"page_size": 50, "report_dir": "/var/reports"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.zendesk.rate_limit.reservoir, 200);
        assert_eq!(config.engine.page_size, 50);
    }
}
