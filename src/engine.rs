//! Core Application Engine
//!
//! Owns the market data router and drives it from the single consumer of
//! `marketdata_publisher`. Requests are dispatched strictly one at a time;
//! this loop is the only place the router (and its cache) is reachable.

use crate::bus::{Address, EventBus, Request};
use crate::core::{Clock, SystemClock};
use crate::router::MarketDataRouter;
use crate::{log_main, log_router, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Level;

/// Dispatch loop around one router
pub struct AppEngine<C: Clock = SystemClock> {
    router: MarketDataRouter<C>,
    bus: EventBus,
}

impl<C: Clock> AppEngine<C> {
    pub fn new(router: MarketDataRouter<C>, bus: EventBus) -> Self {
        Self { router, bus }
    }

    /// Register as the consumer of `marketdata_publisher` and spawn the loop
    ///
    /// Registration happens before returning, so requests sent right after
    /// `spawn` are queued rather than rejected. The task yields the router
    /// back once the address is closed.
    pub fn spawn(self) -> Result<JoinHandle<MarketDataRouter<C>>> {
        let inbound = self.bus.consumer(Address::MarketdataPublisher)?;
        Ok(tokio::spawn(self.run(inbound)))
    }

    /// Process requests until every sender is gone
    pub async fn run(mut self, mut inbound: mpsc::Receiver<Request>) -> MarketDataRouter<C> {
        log_main!(Level::INFO, "Router consuming {}", Address::MarketdataPublisher);

        while let Some(request) = inbound.recv().await {
            let request_id = request.id();
            if let Err(e) = self.router.handle(request) {
                log_router!(Level::ERROR, request_id = %request_id, "Dispatch failed: {}", e);
            }
        }

        log_main!(
            Level::INFO,
            "Router stopped with {} cached instruments",
            self.router.cache().len()
        );
        self.router
    }
}
