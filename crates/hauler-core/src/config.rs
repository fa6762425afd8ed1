//! Configuration module for Hauler.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, and documented defaults, plus the
//! resolved [`EngineConfig`] handed to the engine constructor (no ambient
//! globals: everything the engine needs travels through this struct).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ports::upload_server::RemoteTransferConfig;

/// Built-in fallback chunk size: 8 MiB (8,388,608 bytes)
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Built-in fallback concurrent-transfer limit
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Built-in retry budget for transient chunk failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Built-in linear backoff base: 1000 ms * retry_count
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// File-backed configuration
// ---------------------------------------------------------------------------

/// Top-level configuration for Hauler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transfer: TransferConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

/// Transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Default upload endpoint base URL, e.g. `https://files.example.com`.
    pub endpoint: Option<String>,
    /// Size of each upload chunk (in MiB).
    pub chunk_size_mb: u64,
    /// Maximum concurrent file transfers.
    pub max_concurrent_uploads: usize,
}

/// Retry / backoff settings for transient chunk failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry budget per chunk before the upload turns terminal.
    pub max_retries: u32,
    /// Linear backoff base in milliseconds (`base * retry_count`).
    pub backoff_base_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the log file.
    pub file: PathBuf,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/hauler/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("hauler")
            .join("config.yaml")
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            chunk_size_mb: 8,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("hauler");
        Self {
            level: "info".to_string(),
            file: data_dir.join("hauler.log"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved engine configuration
// ---------------------------------------------------------------------------

/// Resolved settings the engine runs with
///
/// Built from the local [`Config`], then optionally overridden by the
/// server's advertised [`RemoteTransferConfig`] once at startup. Read-only
/// after the engine is constructed.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bytes per append request
    pub chunk_size: u64,
    /// Bound on simultaneously active transfers
    pub max_concurrent_uploads: usize,
    /// Retry budget per chunk
    pub max_retries: u32,
    /// Linear backoff base (`base * retry_count` between attempts)
    pub backoff_base: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
        }
    }
}

impl EngineConfig {
    /// Resolves engine settings from the file-backed configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: (config.transfer.chunk_size_mb.max(1)) * 1024 * 1024,
            max_concurrent_uploads: config.transfer.max_concurrent_uploads.max(1),
            max_retries: config.retry.max_retries,
            backoff_base: Duration::from_millis(config.retry.backoff_base_ms),
        }
    }

    /// Applies server-advertised overrides, keeping local values for any
    /// field the server omits
    pub fn apply_remote(&mut self, remote: &RemoteTransferConfig) {
        if let Some(chunk) = remote.chunk_size {
            if chunk > 0 {
                self.chunk_size = chunk;
            }
        }
        if let Some(limit) = remote.max_concurrent_uploads {
            if limit > 0 {
                self.max_concurrent_uploads = limit as usize;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.transfer.chunk_size_mb, 8);
        assert_eq!(config.transfer.max_concurrent_uploads, 3);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.backoff_base_ms, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_engine_config_from_config() {
        let config = Config::default();
        let engine = EngineConfig::from_config(&config);
        assert_eq!(engine.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(engine.max_concurrent_uploads, 3);
        assert_eq!(engine.backoff_base, Duration::from_millis(1000));
    }

    #[test]
    fn test_engine_config_floors() {
        let mut config = Config::default();
        config.transfer.chunk_size_mb = 0;
        config.transfer.max_concurrent_uploads = 0;
        let engine = EngineConfig::from_config(&config);
        assert_eq!(engine.chunk_size, 1024 * 1024);
        assert_eq!(engine.max_concurrent_uploads, 1);
    }

    #[test]
    fn test_apply_remote_overrides() {
        let mut engine = EngineConfig::default();
        engine.apply_remote(&RemoteTransferConfig {
            chunk_size: Some(4 * 1024 * 1024),
            max_concurrent_uploads: Some(6),
        });
        assert_eq!(engine.chunk_size, 4 * 1024 * 1024);
        assert_eq!(engine.max_concurrent_uploads, 6);
    }

    #[test]
    fn test_apply_remote_keeps_local_for_omitted_fields() {
        let mut engine = EngineConfig::default();
        engine.apply_remote(&RemoteTransferConfig {
            chunk_size: None,
            max_concurrent_uploads: Some(0),
        });
        assert_eq!(engine.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(engine.max_concurrent_uploads, DEFAULT_MAX_CONCURRENT);
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "transfer:\n  chunk_size_mb: 16\n  max_concurrent_uploads: 6\nretry:\n  max_retries: 5"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.transfer.chunk_size_mb, 16);
        assert_eq!(config.transfer.max_concurrent_uploads, 6);
        assert_eq!(config.retry.max_retries, 5);
        // Omitted sections keep their defaults
        assert_eq!(config.retry.backoff_base_ms, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/hauler.yaml"));
        assert_eq!(config.transfer.chunk_size_mb, 8);
    }
}
