//! Connection settings for the Tableau REST API

use crate::error::{Result, TableauError};
use siteflow_cloud::RetryConfig;
use std::time::Duration;

pub const ENV_API_URL: &str = "TABLEAU_API_URL";
pub const ENV_AUTH_TOKEN: &str = "TABLEAU_AUTH_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "TABLEAU_TIMEOUT_SECS";
pub const ENV_SETTLE_ATTEMPTS: &str = "TABLEAU_SETTLE_ATTEMPTS";

/// Configuration for the Tableau client
///
/// `api_url` is the site-scoped base, e.g.
/// `https://tableau.example.com/api/3.19/sites/<site-id>`. The session token
/// comes from a sign-in performed elsewhere.
#[derive(Debug, Clone)]
pub struct TableauConfig {
    pub api_url: String,
    pub auth_token: String,

    /// Per-request timeout, `None` leaves reqwest's default
    pub timeout: Option<Duration>,

    /// Read-back policy applied after a project is created
    pub settle: RetryConfig,
}

impl TableauConfig {
    pub fn new(api_url: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(TableauError::InvalidConfig(format!(
                "API URL must start with http:// or https://, got {:?}",
                api_url
            )));
        }

        Ok(Self {
            api_url,
            auth_token: auth_token.into(),
            timeout: None,
            settle: RetryConfig::default(),
        })
    }

    /// Create TableauConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var(ENV_API_URL)
            .map_err(|_| TableauError::MissingEnvVar(ENV_API_URL.to_string()))?;
        let auth_token = std::env::var(ENV_AUTH_TOKEN)
            .map_err(|_| TableauError::MissingEnvVar(ENV_AUTH_TOKEN.to_string()))?;

        let mut config = Self::new(api_url, auth_token)?;

        if let Some(secs) = parse_env_u64(ENV_TIMEOUT_SECS)? {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(attempts) = parse_env_u64(ENV_SETTLE_ATTEMPTS)? {
            config.settle.max_attempts = u32::try_from(attempts).map_err(|_| {
                TableauError::InvalidConfig(format!("{} is too large", ENV_SETTLE_ATTEMPTS))
            })?;
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_settle(mut self, settle: RetryConfig) -> Self {
        self.settle = settle;
        self
    }
}

fn parse_env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
            TableauError::InvalidConfig(format!("{} must be a whole number, got {:?}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = TableauConfig::new("https://tableau.example.com/api/3.19/sites/s1/", "t").unwrap();
        assert_eq!(config.api_url, "https://tableau.example.com/api/3.19/sites/s1");
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let result = TableauConfig::new("tableau.example.com", "t");
        assert!(matches!(result, Err(TableauError::InvalidConfig(_))));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        temp_env::with_vars(
            [
                (ENV_API_URL, Some("https://tableau.example.com/api/3.19/sites/s1")),
                (ENV_AUTH_TOKEN, Some("token-abc")),
                (ENV_TIMEOUT_SECS, Some("15")),
                (ENV_SETTLE_ATTEMPTS, Some("5")),
            ],
            || {
                let config = TableauConfig::from_env().unwrap();
                assert_eq!(config.auth_token, "token-abc");
                assert_eq!(config.timeout, Some(Duration::from_secs(15)));
                assert_eq!(config.settle.max_attempts, 5);
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_missing_token() {
        temp_env::with_vars(
            [
                (ENV_API_URL, Some("https://tableau.example.com")),
                (ENV_AUTH_TOKEN, None),
            ],
            || {
                let err = TableauConfig::from_env().unwrap_err();
                assert!(matches!(err, TableauError::MissingEnvVar(name) if name == ENV_AUTH_TOKEN));
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_bad_timeout() {
        temp_env::with_vars(
            [
                (ENV_API_URL, Some("https://tableau.example.com")),
                (ENV_AUTH_TOKEN, Some("t")),
                (ENV_TIMEOUT_SECS, Some("soon")),
            ],
            || {
                let err = TableauConfig::from_env().unwrap_err();
                assert!(matches!(err, TableauError::InvalidConfig(_)));
            },
        );
    }
}
