//! Dispatch-and-cache router
//!
//! - SnapshotCache: latest record per instrument
//! - MarketDataRouter: validation, tick rebroadcast, init paint replies

pub mod cache;
pub mod dispatch;

pub use cache::SnapshotCache;
pub use dispatch::MarketDataRouter;
