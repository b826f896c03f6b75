//! Message bus plumbing
//!
//! - Address: stable channel names
//! - Request / Headers / Failure: one dispatch worth of envelope
//! - EventBus: request/reply and broadcast transport

pub mod address;
pub mod event_bus;
pub mod message;

pub use address::Address;
pub use event_bus::{BusCapacity, BusError, EventBus};
pub use message::{ErrorCode, Failure, Headers, Reply, Request};
