//! Configuration loading and typed config structures for Continuum.
//!
//! The canonical configuration lives in `continuum-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::Path;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::scheduler::TurnTimings;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `continuum-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContinuumConfig {
    /// Turn timing and text bounds.
    #[serde(default)]
    pub turn: TurnConfig,

    /// Ledger feed paging.
    #[serde(default)]
    pub feed: FeedConfig,

    /// HTTP listener.
    #[serde(default)]
    pub http: HttpConfig,

    /// State persistence.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ContinuumConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `CONTINUUM_STATE_PATH` overrides `storage.state_path`
    /// - `CONTINUUM_PORT` overrides `http.port`
    /// - `CONTINUUM_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides are
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override values with environment variables when set.
    ///
    /// Lets a deployment point the service at a different state file or port
    /// without editing the YAML. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CONTINUUM_STATE_PATH") {
            self.storage.state_path = val;
        }
        if let Some(port) = std::env::var("CONTINUUM_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.http.port = port;
        }
        if let Ok(val) = std::env::var("CONTINUUM_LOG_LEVEL") {
            self.logging.level = val;
        }
    }
}

/// Turn timing and text bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TurnConfig {
    /// Length of one writing turn, in seconds.
    #[serde(default = "default_turn_seconds")]
    pub turn_seconds: u64,

    /// Wait after a turn ends before the writer may queue again, in seconds.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Maximum draft length, in characters.
    #[serde(default = "default_max_text_chars")]
    pub max_draft_chars: usize,

    /// Maximum submitted entry length after trimming, in characters.
    #[serde(default = "default_max_text_chars")]
    pub max_entry_chars: usize,

    /// Maximum queue positions included in a status snapshot.
    #[serde(default = "default_status_queue_limit")]
    pub status_queue_limit: usize,

    /// Background reconcile interval in milliseconds (0 disables the task).
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
}

impl TurnConfig {
    /// Validate and convert into the scheduler's timing parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero turn length, a zero text
    /// bound, or durations too large to represent.
    pub fn timings(&self) -> Result<TurnTimings, ConfigError> {
        if self.turn_seconds == 0 {
            return Err(ConfigError::Invalid {
                reason: "turn.turn_seconds must be at least 1".to_owned(),
            });
        }
        if self.max_draft_chars == 0 || self.max_entry_chars == 0 {
            return Err(ConfigError::Invalid {
                reason: "turn.max_draft_chars and turn.max_entry_chars must be at least 1"
                    .to_owned(),
            });
        }

        Ok(TurnTimings {
            turn: seconds_delta("turn.turn_seconds", self.turn_seconds)?,
            cooldown: seconds_delta("turn.cooldown_seconds", self.cooldown_seconds)?,
            max_draft_chars: self.max_draft_chars,
            max_entry_chars: self.max_entry_chars,
        })
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            turn_seconds: default_turn_seconds(),
            cooldown_seconds: default_cooldown_seconds(),
            max_draft_chars: default_max_text_chars(),
            max_entry_chars: default_max_text_chars(),
            status_queue_limit: default_status_queue_limit(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
        }
    }
}

fn seconds_delta(field: &str, secs: u64) -> Result<TimeDelta, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| ConfigError::Invalid {
            reason: format!("{field} is out of range: {secs}"),
        })
}

/// Ledger feed paging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// Entries returned by the newest-first feed.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Upper bound on any caller-supplied `limit`.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// State persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON state snapshot.
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Keep state in memory only (nothing survives a restart).
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            in_memory: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error) used when
    /// `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_turn_seconds() -> u64 {
    120
}

const fn default_cooldown_seconds() -> u64 {
    300
}

const fn default_max_text_chars() -> usize {
    5000
}

const fn default_status_queue_limit() -> usize {
    50
}

const fn default_reconcile_interval_ms() -> u64 {
    1000
}

const fn default_recent_limit() -> usize {
    200
}

const fn default_max_limit() -> usize {
    1000
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

fn default_state_path() -> String {
    "continuum-state.json".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
