//! Market data distribution hub
//!
//! # Architecture
//! - **core**: Tickers, market data records, actions, timestamp rendering
//! - **bus**: In-process request/reply and broadcast transport
//! - **router**: Dispatch-and-cache router (the only stateful component)
//! - **engine**: Single dispatch loop owning the router
//! - **infrastructure**: Cold path (logging, metrics, config, api)

use marketdata_hub::bus::{Address, EventBus};
use marketdata_hub::core::TimestampFormatter;
use marketdata_hub::engine::AppEngine;
use marketdata_hub::infrastructure::logging::init_logging;
use marketdata_hub::infrastructure::metrics::MetricsCollector;
use marketdata_hub::infrastructure::{start_server, AppState};
use marketdata_hub::router::MarketDataRouter;
use marketdata_hub::{log_main, Config, Result};
use std::sync::Arc;
use time::UtcOffset;
use tokio::sync::watch;
use tracing::Level;

/// Main application state
pub struct HubApp {
    config: Config,
    /// Offset timestamps are rendered in, resolved before any thread starts
    offset: UtcOffset,
}

impl HubApp {
    pub fn new(config: Config, offset: UtcOffset) -> Self {
        Self { config, offset }
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let formatter = TimestampFormatter::new(self.offset);
        log_main!(
            Level::INFO,
            "Starting market data hub (timestamps at {})",
            formatter.offset()
        );

        // 1. Bus and router
        let bus = EventBus::new(self.config.bus_capacity());
        let metrics = Arc::new(MetricsCollector::new());
        let router = MarketDataRouter::new(bus.clone(), formatter, metrics.clone());
        let engine = AppEngine::new(router, bus.clone()).spawn()?;

        // 2. API Server (Cold Path)
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let api = if self.config.api.enabled {
            let state = AppState {
                bus: bus.clone(),
                metrics: metrics.clone(),
            };
            let port = self.config.api.port;
            let mut shutdown_rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                let shutdown = async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                };
                if let Err(e) = start_server(state, port, shutdown).await {
                    tracing::error!(target: "api", "API Server failed: {}", e);
                }
            }))
        } else {
            log_main!(Level::INFO, "API Server disabled");
            None
        };

        // 3. Wait for shutdown
        tokio::signal::ctrl_c().await?;
        log_main!(Level::INFO, "Shutdown requested");

        let _ = shutdown_tx.send(true);
        bus.close(Address::MarketdataPublisher);

        let router = engine.await?;
        log_main!(
            Level::INFO,
            "Dropping snapshot cache with {} instruments",
            router.cache().len()
        );

        if let Some(api) = api {
            api.await?;
        }

        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Local offset lookup fails once the process is multi-threaded, so it
    // runs before logging writers and the runtime spawn their threads.
    let offset = config.hub.zone.resolve();

    let _guards = init_logging(&config.logging)?;

    let offset = offset.unwrap_or_else(|e| {
        tracing::warn!(target: "main", "{}, rendering timestamps in UTC", e);
        UtcOffset::UTC
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(HubApp::new(config, offset).run())?;

    Ok(())
}
