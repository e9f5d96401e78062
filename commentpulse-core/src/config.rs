//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/commentpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/commentpulse/` (~/.config/commentpulse/)
//! - Data: `$XDG_DATA_HOME/commentpulse/` (~/.local/share/commentpulse/)
//! - State/Logs: `$XDG_STATE_HOME/commentpulse/` (~/.local/state/commentpulse/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Producer submit client configuration (optional)
    #[serde(default)]
    pub submit: SubmitConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for a single store operation (write or scan) before the
    /// request fails with store-unavailable
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,

    /// Buffered summary updates per subscriber before older ones are dropped
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store_timeout_ms: default_store_timeout(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_store_timeout() -> u64 {
    5000
}

fn default_broadcast_capacity() -> usize {
    64
}

/// Database configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DatabaseConfig {
    /// Override path for the SQLite database file
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Producer submit client configuration
///
/// Used by embedding producers to push events to a commentpulse server with
/// bounded retry. The server itself never reads this section.
#[derive(Debug, Deserialize, Clone)]
pub struct SubmitConfig {
    /// Enable/disable the submit client
    #[serde(default)]
    pub enabled: bool,

    /// Analytics server URL (e.g., `http://127.0.0.1:3000`)
    pub server_url: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_submit_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_submit_max_retries")]
    pub max_retries: usize,

    /// Base delay before the first retry; doubles per attempt
    #[serde(default = "default_submit_retry_base")]
    pub retry_base_ms: u64,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: None,
            timeout_secs: default_submit_timeout(),
            max_retries: default_submit_max_retries(),
            retry_base_ms: default_submit_retry_base(),
        }
    }
}

impl SubmitConfig {
    /// Check if the submit client is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled && self.server_url.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.server_url.is_none() {
            return Err(Error::Config(
                "submit.server_url is required when submit is enabled".to_string(),
            ));
        }
        if self.retry_base_ms == 0 {
            return Err(Error::Config(
                "submit.retry_base_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_submit_timeout() -> u64 {
    30
}

fn default_submit_max_retries() -> usize {
    3
}

fn default_submit_retry_base() -> u64 {
    500
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/commentpulse/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("commentpulse").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/commentpulse/`
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("commentpulse")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/commentpulse/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("commentpulse")
    }

    /// Returns the database file path, honoring the `[database]` override
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("commentpulse.db"))
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("commentpulse.log")
    }
}
