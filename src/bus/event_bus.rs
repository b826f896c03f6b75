//! In-process event bus
//!
//! Request addresses have exactly one consumer (bounded mpsc queue, replies
//! over oneshot). Broadcast addresses fan out to any number of subscribers
//! (tokio broadcast). The registry is cold path: lookups clone the channel
//! handle and release the lock before any await.

use super::{Address, Failure, Headers, Request};
use crate::log_bus;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::Level;

/// Channel sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCapacity {
    /// Queued requests per consumer
    pub inbound: usize,
    /// Broadcast messages a subscriber may lag behind before skipping
    pub broadcast: usize,
}

impl Default for BusCapacity {
    fn default() -> Self {
        Self {
            inbound: 1024,
            broadcast: 4096,
        }
    }
}

/// Bus delivery errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("no consumer registered on {0}")]
    NoConsumer(Address),

    #[error("a consumer is already registered on {0}")]
    AlreadyRegistered(Address),

    #[error("consumer on {0} has stopped")]
    Closed(Address),

    #[error("request failed with code {} ({}): {}", .0.code.code(), .0.code.name(), .0.message)]
    Failed(Failure),
}

struct BusInner {
    consumers: RwLock<HashMap<Address, mpsc::Sender<Request>>>,
    topics: RwLock<HashMap<Address, broadcast::Sender<Value>>>,
    capacity: BusCapacity,
}

/// Cheaply cloneable handle to the bus
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new(capacity: BusCapacity) -> Self {
        Self {
            inner: Arc::new(BusInner {
                consumers: RwLock::new(HashMap::new()),
                topics: RwLock::new(HashMap::new()),
                capacity: BusCapacity {
                    inbound: capacity.inbound.max(1),
                    broadcast: capacity.broadcast.max(1),
                },
            }),
        }
    }

    /// Register the single consumer of `address`
    ///
    /// Fails while another live consumer holds the address: one address,
    /// one dispatch loop.
    pub fn consumer(&self, address: Address) -> Result<mpsc::Receiver<Request>, BusError> {
        let mut consumers = self.inner.consumers.write();
        if let Some(existing) = consumers.get(&address) {
            if !existing.is_closed() {
                return Err(BusError::AlreadyRegistered(address));
            }
        }
        let (tx, rx) = mpsc::channel(self.inner.capacity.inbound);
        consumers.insert(address, tx);
        log_bus!(Level::INFO, "Consumer registered on {}", address);
        Ok(rx)
    }

    /// Unregister the consumer of `address`; its loop drains and stops
    pub fn close(&self, address: Address) -> bool {
        let removed = self.inner.consumers.write().remove(&address).is_some();
        if removed {
            log_bus!(Level::INFO, "Consumer on {} closed", address);
        }
        removed
    }

    pub fn has_consumer(&self, address: Address) -> bool {
        self.inner
            .consumers
            .read()
            .get(&address)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver without a reply capability
    pub async fn send(&self, address: Address, headers: Headers, body: Value) -> Result<(), BusError> {
        self.deliver(Request::new(address, headers, body)).await
    }

    /// Deliver with a reply capability and await the outcome
    ///
    /// `Ok(None)` means the consumer finished the request without replying.
    pub async fn request(
        &self,
        address: Address,
        headers: Headers,
        body: Value,
    ) -> Result<Option<Value>, BusError> {
        let (request, reply) = Request::with_reply(address, headers, body);
        self.deliver(request).await?;
        match reply.await {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(failure)) => Err(BusError::Failed(failure)),
            Err(_) => Ok(None),
        }
    }

    async fn deliver(&self, request: Request) -> Result<(), BusError> {
        let address = request.address();
        let tx = self
            .inner
            .consumers
            .read()
            .get(&address)
            .cloned()
            .ok_or(BusError::NoConsumer(address))?;
        log_bus!(Level::TRACE, request_id = %request.id(), "Delivering request to {}", address);
        tx.send(request).await.map_err(|_| BusError::Closed(address))
    }

    /// Broadcast to every current subscriber of `address`
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn publish(&self, address: Address, body: Value) -> usize {
        let topics = self.inner.topics.read();
        match topics.get(&address) {
            Some(tx) => tx.send(body).unwrap_or(0),
            None => 0,
        }
    }

    /// Receive every later broadcast on `address`
    pub fn subscribe(&self, address: Address) -> broadcast::Receiver<Value> {
        let mut topics = self.inner.topics.write();
        topics
            .entry(address)
            .or_insert_with(|| broadcast::channel(self.inner.capacity.broadcast).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, address: Address) -> usize {
        self.inner
            .topics
            .read()
            .get(&address)
            .map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusCapacity::default())
    }
}
