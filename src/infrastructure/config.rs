//! Configuration management for the market data hub
//!
//! Loads configuration from config.toml at startup.
//! Every value has a default so the hub runs without a config file.

use crate::bus::BusCapacity;
use crate::core::Zone;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hub Configuration
///
/// Loaded from config.toml at startup (override the path with `CONFIG_PATH`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Router and bus settings
    #[serde(default)]
    pub hub: HubConfig,

    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Router and bus configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HubConfig {
    /// Zone used to render timestamps: `local`, `utc` or `±HH:MM`
    #[serde(default)]
    pub zone: Zone,

    /// Requests queued on marketdata_publisher before senders wait
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,

    /// Broadcasts a status subscriber may lag behind before skipping
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Serve the HTTP/WebSocket bridge
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// EnvFilter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            zone: Zone::default(),
            inbound_capacity: default_inbound_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            level: default_log_level(),
        }
    }
}

fn default_inbound_capacity() -> usize {
    1024
}

fn default_broadcast_capacity() -> usize {
    4096
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_port() -> u16 {
    5000
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from config.toml file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.inbound_capacity == 0 {
            return Err(ConfigError::Invalid("hub.inbound_capacity must be > 0".into()));
        }
        if self.hub.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid("hub.broadcast_capacity must be > 0".into()));
        }
        Ok(())
    }

    /// Bus channel sizing
    #[inline]
    pub fn bus_capacity(&self) -> BusCapacity {
        BusCapacity {
            inbound: self.hub.inbound_capacity,
            broadcast: self.hub.broadcast_capacity,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error (invalid TOML or unknown zone)
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Value out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}
