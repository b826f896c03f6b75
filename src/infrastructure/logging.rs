//! Centralized file-based logging system
//!
//! Writes logs to files under the configured directory, separated by log type:
//! - main/   - All events, JSON
//! - error/  - Error and warning logs only
//! - router/ - Dispatch, cache and broadcast logs
//! - bus/    - Consumer registration and delivery logs
//! - api/    - HTTP/WebSocket bridge logs

use crate::infrastructure::config::LoggingConfig;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log file families, one subdirectory each
const LOG_TYPES: [&str; 5] = ["main", "error", "router", "bus", "api"];

/// Initialize centralized file logging
///
/// Creates the log directory tree and sets up file appenders for each log type.
/// Returns WorkerGuards which must be kept alive for the duration of the program.
/// Fails if the tree cannot be created or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<Vec<WorkerGuard>> {
    let logs_dir = config.directory.as_path();
    create_log_dirs(logs_dir)?;

    let mut guards = Vec::new();

    // Main log - all logs
    let (main_appender, main_guard) = create_appender(logs_dir, "main");
    guards.push(main_guard);

    // Error log - ERROR and WARN only
    let (error_appender, error_guard) = create_appender(logs_dir, "error");
    guards.push(error_guard);

    let (router_appender, router_guard) = create_appender(logs_dir, "router");
    guards.push(router_guard);

    let (bus_appender, bus_guard) = create_appender(logs_dir, "bus");
    guards.push(bus_guard);

    let (api_appender, api_guard) = create_appender(logs_dir, "api");
    guards.push(api_guard);

    let main_layer = tracing_subscriber::fmt::layer()
        .with_writer(main_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let router_layer = tracing_subscriber::fmt::layer()
        .with_writer(router_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "router"
        }));

    let bus_layer = tracing_subscriber::fmt::layer()
        .with_writer(bus_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "bus"
        }));

    let api_layer = tracing_subscriber::fmt::layer()
        .with_writer(api_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == "api" || metadata.target().contains("axum")
        }));

    // Console layer for development
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(main_layer)
        .with(error_layer)
        .with(router_layer)
        .with(bus_layer)
        .with(api_layer)
        .with(console_layer)
        .try_init()
        .map_err(std::io::Error::other)?;

    tracing::info!(target: "main", "Logging system initialized. Log files in {}", logs_dir.display());

    Ok(guards)
}

fn create_log_dirs(logs_dir: &Path) -> std::io::Result<()> {
    for log_type in &LOG_TYPES {
        fs::create_dir_all(logs_dir.join(log_type))?;
    }
    Ok(())
}

/// Create a daily rolling file appender under `<logs_dir>/<name>/`
fn create_appender(logs_dir: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir.join(name), name);

    tracing_appender::non_blocking(appender)
}

/// Log macro helpers for specific log types
#[macro_export]
macro_rules! log_router {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "router", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_bus {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "bus", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_api {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "api", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_main {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "main", $level, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hub_logs_{}_{}", name, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        dir
    }

    fn read_logs(dir: &Path) -> String {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect()
    }

    #[test]
    fn test_log_directory_creation() {
        let dir = scratch_dir("tree");
        create_log_dirs(&dir).unwrap();
        for log_type in &LOG_TYPES {
            assert!(dir.join(log_type).is_dir());
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unusable_log_directory_rejected() {
        let file = scratch_dir("blocked");
        fs::write(&file, b"not a directory").unwrap();

        let config = LoggingConfig {
            directory: file.clone(),
            level: "info".to_string(),
        };
        assert!(init_logging(&config).is_err());

        fs::remove_file(&file).ok();
    }

    // Only test in the crate that installs the global subscriber
    #[test]
    fn test_init_logging_writes_per_type_files() {
        let dir = scratch_dir("init");
        let config = LoggingConfig {
            directory: dir.clone(),
            level: "debug".to_string(),
        };

        let guards = init_logging(&config).unwrap();
        assert_eq!(guards.len(), LOG_TYPES.len());

        crate::log_router!(tracing::Level::ERROR, "router line for file test");
        crate::log_api!(tracing::Level::ERROR, "api line for file test");

        // A second global subscriber is refused
        assert!(init_logging(&config).is_err());

        drop(guards);
        assert!(read_logs(&dir.join("router")).contains("router line for file test"));
        assert!(!read_logs(&dir.join("router")).contains("api line for file test"));
        assert!(read_logs(&dir.join("api")).contains("api line for file test"));
        assert!(read_logs(&dir.join("error")).contains("router line for file test"));
        assert!(read_logs(&dir.join("main")).contains("router line for file test"));

        fs::remove_dir_all(&dir).ok();
    }
}
