//! Application configuration.

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::{AppError, AppResult};

/// Upper bound accepted for the per-request probe timeout.
pub const MAX_PROBE_TIMEOUT_SECS: u64 = 60;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Directory identity configuration.
    pub directory: DirectoryConfig,
    /// Outbound direct-message configuration.
    pub messaging: MessagingConfig,
    /// Remote instance probing configuration.
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Reconciliation sweep configuration.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of the directory.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Directory identity used in verification challenges.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Human-readable directory name.
    #[serde(default = "default_directory_name")]
    pub name: String,
    /// Base of the verification link; the access credential is appended to it.
    pub verify_url_base: String,
}

/// Account used to deliver verification challenges as direct messages.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Base URL of the Mastodon-compatible server hosting the directory account.
    pub base_url: String,
    /// Access token of the directory account.
    pub access_token: String,
}

/// Remote instance probing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Timeout applied to each request sent to a remote instance, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

/// Reconciliation sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Whether the built-in scheduler runs sweeps.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between retry sweeps over health-banned instances, in seconds.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    /// Interval between health checks of active instances, in seconds.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Maximum number of instances probed concurrently within one sweep.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl ProbeConfig {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_interval_secs: default_retry_interval_secs(),
            check_interval_secs: default_check_interval_secs(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_directory_name() -> String {
    "FurryFediverse".to_string()
}

const fn default_probe_timeout_secs() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

const fn default_retry_interval_secs() -> u64 {
    3600
}

const fn default_check_interval_secs() -> u64 {
    21600
}

const fn default_max_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FEDIDIR_ENV`)
    /// 3. Environment variables with `FEDIDIR_` prefix
    pub fn load() -> AppResult<Self> {
        let env = std::env::var("FEDIDIR_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FEDIDIR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Check the loaded values before the service starts accepting requests.
    pub fn validate(&self) -> Result<(), AppError> {
        require_http_url("server.url", &self.server.url)?;

        if self.database.url.trim().is_empty() {
            return Err(AppError::Config("database.url must be set".to_string()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::Config(
                "database.min_connections exceeds database.max_connections".to_string(),
            ));
        }

        if self.directory.name.trim().is_empty() {
            return Err(AppError::Config("directory.name must not be empty".to_string()));
        }
        require_http_url("directory.verify_url_base", &self.directory.verify_url_base)?;
        if !self.directory.verify_url_base.ends_with('/') {
            return Err(AppError::Config(
                "directory.verify_url_base must end with '/'".to_string(),
            ));
        }

        require_http_url("messaging.base_url", &self.messaging.base_url)?;
        if self.messaging.access_token.trim().is_empty() {
            return Err(AppError::Config(
                "messaging.access_token must be set".to_string(),
            ));
        }

        if self.probe.timeout_secs == 0 || self.probe.timeout_secs > MAX_PROBE_TIMEOUT_SECS {
            return Err(AppError::Config(format!(
                "probe.timeout_secs must be between 1 and {MAX_PROBE_TIMEOUT_SECS}"
            )));
        }

        let sweeps = &self.reconciliation;
        if sweeps.max_concurrency == 0 {
            return Err(AppError::Config(
                "reconciliation.max_concurrency must be at least 1".to_string(),
            ));
        }
        if sweeps.retry_interval_secs == 0 || sweeps.check_interval_secs == 0 {
            return Err(AppError::Config(
                "reconciliation intervals must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_http_url(field: &str, value: &str) -> Result<(), AppError> {
    let url = Url::parse(value)
        .map_err(|e| AppError::Config(format!("{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::Config(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                url: "https://directory.example".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/fedidir".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            directory: DirectoryConfig {
                name: "FurryFediverse".to_string(),
                verify_url_base: "https://directory.example/api/instances/verify/".to_string(),
            },
            messaging: MessagingConfig {
                base_url: "https://social.example".to_string(),
                access_token: "token".to_string(),
            },
            probe: ProbeConfig::default(),
            reconciliation: ReconciliationConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let probe = ProbeConfig::default();
        assert_eq!(probe.timeout(), Duration::from_secs(10));

        let sweeps = ReconciliationConfig::default();
        assert!(sweeps.enabled);
        assert_eq!(sweeps.max_concurrency, 4);
    }

    #[test]
    fn test_rejects_missing_access_token() {
        let mut config = valid_config();
        config.messaging.access_token = "  ".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_verify_base_without_trailing_slash() {
        let mut config = valid_config();
        config.directory.verify_url_base = "https://directory.example/verify".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unbounded_probe_timeout() {
        let mut config = valid_config();
        config.probe.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.probe.timeout_secs = MAX_PROBE_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_messaging_url() {
        let mut config = valid_config();
        config.messaging.base_url = "ftp://social.example".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.reconciliation.max_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
