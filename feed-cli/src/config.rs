//! Configuration loading for feedq.
//!
//! Configuration is loaded from an optional TOML file (`--config`). Every
//! section and field may be omitted.

use feedq_client::ManagerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for feedq.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Heartbeat configuration.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// Search box configuration.
    #[serde(default)]
    pub search: SearchConfig,
    /// Batch-fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Heartbeat configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    /// Poll interval in milliseconds (default: 15000). Zero disables polling.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Search box configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke (default: 200).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Shortest query sent to the server (default: 3).
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

/// Batch-fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Attempts before a flush gives up (default: 3).
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// First retry delay in milliseconds, doubled per attempt (default: 250).
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

// Default value functions
fn default_interval_ms() -> u64 {
    15_000
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_min_query_chars() -> usize {
    3
}

fn default_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    250
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_chars: default_min_query_chars(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Settings for the feed manager.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig::default()
            .with_heartbeat_interval(Duration::from_millis(self.heartbeat.interval_ms))
            .with_debounce(Duration::from_millis(self.search.debounce_ms))
            .with_min_query_chars(self.search.min_query_chars)
            .with_fetch_attempts(self.fetch.attempts)
            .with_retry_base(Duration::from_millis(self.fetch.retry_base_ms))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_manager_defaults() {
        let config = Config::default();
        assert_eq!(config.manager_config(), ManagerConfig::default());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
            [heartbeat]
            interval_ms = 5000

            [search]
            debounce_ms = 50
            min_query_chars = 2

            [fetch]
            attempts = 5
            retry_base_ms = 100
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        let manager = config.manager_config();
        assert_eq!(manager.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(manager.debounce, Duration::from_millis(50));
        assert_eq!(manager.min_query_chars, 2);
        assert_eq!(manager.fetch_attempts, 5);
        assert_eq!(manager.retry_base, Duration::from_millis(100));
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let toml = r#"
            [search]
            debounce_ms = 10
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.search.debounce_ms, 10);
        assert_eq!(config.search.min_query_chars, 3);
        assert_eq!(config.heartbeat.interval_ms, 15_000);
        assert_eq!(config.fetch.attempts, 3);
    }

    #[test]
    fn empty_file_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.fetch.retry_base_ms, 250);
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fetch]\nattempts = 1").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.fetch.attempts, 1);
    }

    #[test]
    fn from_file_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        let err = Config::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn from_file_rejects_bad_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fetch]\nattempts = \"many\"").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
