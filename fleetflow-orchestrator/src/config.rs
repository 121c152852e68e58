//! Orchestrator configuration
//!
//! Defines the bind address, shared storage root, stage service location,
//! trigger timeouts and housekeeping intervals of the orchestrator.

use std::path::PathBuf;
use std::time::Duration;

use fleetflow_core::normalize::value::parse_bool;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Root of the storage area shared with the stage services
    pub shared_storage_path: PathBuf,

    /// Base URL of the simulation / MOO / RL services
    pub fast_api_base_uri: String,

    /// Postgres URL; `None` selects the in-memory train store
    pub database_url: Option<String>,

    /// Ingest the RL result into the train store when a run completes
    pub update_database_on_completion: bool,

    /// Client-side timeout of the simulation trigger
    pub simulation_timeout: Duration,

    /// Client-side timeout of the MOO and RL triggers
    pub stage_timeout: Duration,

    /// Days passed to the simulation when a start request omits it
    pub default_days_to_simulate: u32,

    /// Files in the temp area older than this are removed
    pub temp_cleanup_age: Duration,

    /// How often the temp cleanup runs
    pub temp_cleanup_interval: Duration,

    /// Largest accepted CSV upload
    pub max_upload_bytes: usize,
}

impl Config {
    /// Creates a configuration with defaults for everything but the storage root
    pub fn new(shared_storage_path: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            shared_storage_path: shared_storage_path.into(),
            fast_api_base_uri: "http://localhost:8000".to_string(),
            database_url: None,
            update_database_on_completion: true,
            simulation_timeout: Duration::from_secs(300),
            stage_timeout: Duration::from_secs(30),
            default_days_to_simulate: 1,
            temp_cleanup_age: Duration::from_secs(24 * 3600),
            temp_cleanup_interval: Duration::from_secs(3600),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Every variable is optional:
    /// - ORCHESTRATOR_BIND_ADDR (default: 0.0.0.0:3000)
    /// - SHARED_STORAGE_PATH (default: /shared/storage)
    /// - FAST_API_BASE_URI (default: http://localhost:8000)
    /// - DATABASE_URL (default: unset, in-memory store)
    /// - UPDATE_DATABASE_ON_COMPLETION (default: true)
    /// - SIMULATION_TIMEOUT (seconds, default: 300)
    /// - STAGE_TIMEOUT (seconds, default: 30)
    /// - DEFAULT_DAYS_TO_SIMULATE (default: 1)
    /// - TEMP_CLEANUP_HOURS (default: 24)
    /// - TEMP_CLEANUP_INTERVAL (seconds, default: 3600)
    /// - MAX_UPLOAD_BYTES (default: 10485760)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("ORCHESTRATOR_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let shared_storage_path = std::env::var("SHARED_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.shared_storage_path);

        let fast_api_base_uri =
            std::env::var("FAST_API_BASE_URI").unwrap_or(defaults.fast_api_base_uri);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let update_database_on_completion = std::env::var("UPDATE_DATABASE_ON_COMPLETION")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(defaults.update_database_on_completion);

        let simulation_timeout = env_secs("SIMULATION_TIMEOUT").unwrap_or(defaults.simulation_timeout);

        let stage_timeout = env_secs("STAGE_TIMEOUT").unwrap_or(defaults.stage_timeout);

        let default_days_to_simulate = std::env::var("DEFAULT_DAYS_TO_SIMULATE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.default_days_to_simulate);

        let temp_cleanup_age = std::env::var("TEMP_CLEANUP_HOURS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|h| Duration::from_secs(h * 3600))
            .unwrap_or(defaults.temp_cleanup_age);

        let temp_cleanup_interval =
            env_secs("TEMP_CLEANUP_INTERVAL").unwrap_or(defaults.temp_cleanup_interval);

        let max_upload_bytes = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_upload_bytes);

        Ok(Self {
            bind_addr,
            shared_storage_path,
            fast_api_base_uri,
            database_url,
            update_database_on_completion,
            simulation_timeout,
            stage_timeout,
            default_days_to_simulate,
            temp_cleanup_age,
            temp_cleanup_interval,
            max_upload_bytes,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.shared_storage_path.as_os_str().is_empty() {
            anyhow::bail!("shared_storage_path cannot be empty");
        }

        if !self.fast_api_base_uri.starts_with("http://")
            && !self.fast_api_base_uri.starts_with("https://")
        {
            anyhow::bail!("fast_api_base_uri must start with http:// or https://");
        }

        if self.simulation_timeout.is_zero() || self.stage_timeout.is_zero() {
            anyhow::bail!("stage timeouts must be greater than 0");
        }

        if self.temp_cleanup_interval.is_zero() {
            anyhow::bail!("temp_cleanup_interval must be greater than 0");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("/shared/storage")
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.shared_storage_path, PathBuf::from("/shared/storage"));
        assert_eq!(config.simulation_timeout, Duration::from_secs(300));
        assert_eq!(config.stage_timeout, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, 10_485_760);
        assert!(config.update_database_on_completion);
        assert!(config.database_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.fast_api_base_uri = "fastapi:8000".to_string();
        assert!(config.validate().is_err());

        config.fast_api_base_uri = "https://fastapi:8000".to_string();
        assert!(config.validate().is_ok());

        config.stage_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.stage_timeout = Duration::from_secs(1);
        config.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }
}
