//! Core market data types
//!
//! - Ticker: instrument identifier used as the cache key
//! - MarketData / Payload: latest known value per instrument
//! - MarketDataAction: closed set of routing actions
//! - Clock and timestamp rendering

pub mod action;
pub mod clock;
pub mod market_data;
pub mod ticker;
pub mod timestamp;

pub use action::{MarketDataAction, UnknownAction, ACTION_HEADER};
pub use clock::{Clock, ManualClock, SystemClock};
pub use market_data::{MarketData, Payload};
pub use ticker::{Ticker, TickerError};
pub use timestamp::{TimestampError, TimestampFormatter, Zone};
