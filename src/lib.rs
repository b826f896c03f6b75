//! Market data distribution hub
//!
//! Caches the latest tick per instrument, rebroadcasts every accepted tick
//! with a server-assigned publish time and serves init paint snapshots.

pub mod bus;
pub mod core;
pub mod engine;
pub mod infrastructure;
pub mod router;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use infrastructure::config::{ApiConfig, Config, HubConfig, LoggingConfig};

use thiserror::Error;

/// Main error type for the hub
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timestamp error: {0}")]
    Timestamp(#[from] crate::core::TimestampError),

    #[error("Bus error: {0}")]
    Bus(#[from] crate::bus::BusError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::infrastructure::config::ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HubError>;
