use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

use crate::services::extractor::HermessSettings;

#[derive(Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,

    /// HermessApp account email
    #[garde(length(min = 1))]
    pub hermess_email: String,

    /// HermessApp account password
    #[garde(length(min = 1))]
    pub hermess_password: String,

    #[serde(default = "default_login_url")]
    #[garde(url)]
    pub hermess_login_url: String,

    #[serde(default = "default_birthdays_url")]
    #[garde(url)]
    pub hermess_birthdays_url: String,

    /// Deployment label reported by `/` and `/health`
    #[serde(default = "default_environment")]
    #[garde(skip)]
    pub environment: String,

    /// Source label written into download metadata
    #[serde(default = "default_source_label")]
    #[garde(length(min = 1))]
    pub source_label: String,

    /// Age after which finished tasks are removed by cleanup
    #[serde(default = "default_task_retention_secs")]
    #[garde(skip)]
    pub task_retention_secs: u64,

    /// Enables a background sweep every N seconds when set
    #[serde(default)]
    #[garde(range(min = 1))]
    pub sweep_interval_secs: Option<u64>,

    /// Number of concurrent scrape workers
    #[serde(default = "default_worker_count")]
    #[garde(range(min = 1, max = 32))]
    pub worker_count: usize,

    /// Upper bound on a single extraction; unbounded when unset
    #[serde(default)]
    #[garde(range(min = 1))]
    pub extraction_timeout_secs: Option<u64>,

    /// Per-request timeout towards HermessApp
    #[serde(default = "default_http_timeout_secs")]
    #[garde(range(min = 1))]
    pub http_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_login_url() -> String {
    "https://hermessapp.com/login".to_string()
}

fn default_birthdays_url() -> String {
    "https://hermessapp.com/pacientescumple".to_string()
}

fn default_environment() -> String {
    "shared_hosting".to_string()
}

fn default_source_label() -> String {
    "HermessApp".to_string()
}

fn default_task_retention_secs() -> u64 {
    3600
}

fn default_worker_count() -> usize {
    1
}

fn default_http_timeout_secs() -> u64 {
    30
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs (upper-case env names).
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn hermess_settings(&self) -> HermessSettings {
        HermessSettings {
            email: self.hermess_email.clone(),
            password: self.hermess_password.clone(),
            login_url: self.hermess_login_url.clone(),
            birthdays_url: self.hermess_birthdays_url.clone(),
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    pub fn retention(&self) -> chrono::Duration {
        i64::try_from(self.task_retention_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_vars(vars(&[
            ("HERMESS_EMAIL", "front@clinic.co"),
            ("HERMESS_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.hermess_login_url, "https://hermessapp.com/login");
        assert_eq!(config.task_retention_secs, 3600);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.sweep_interval_secs, None);
        assert_eq!(config.extraction_timeout_secs, None);
        assert_eq!(config.retention(), chrono::Duration::hours(1));
        assert_eq!(config.hermess_settings().http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_credentials_required() {
        assert!(matches!(
            AppConfig::from_vars(vars(&[("HERMESS_EMAIL", "front@clinic.co")])),
            Err(ConfigError::Env(_))
        ));
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = AppConfig::from_vars(vars(&[
            ("HERMESS_EMAIL", "front@clinic.co"),
            ("HERMESS_PASSWORD", "secret"),
            ("WORKER_COUNT", "4"),
            ("SWEEP_INTERVAL_SECS", "600"),
            ("EXTRACTION_TIMEOUT_SECS", "300"),
        ]))
        .unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.sweep_interval_secs, Some(600));
        assert_eq!(config.extraction_timeout_secs, Some(300));

        assert!(matches!(
            AppConfig::from_vars(vars(&[
                ("HERMESS_EMAIL", "front@clinic.co"),
                ("HERMESS_PASSWORD", "secret"),
                ("WORKER_COUNT", "0"),
            ])),
            Err(ConfigError::Invalid(_))
        ));
    }
}
