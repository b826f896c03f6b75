//! Test utilities for building routers and requests
//!
//! Routers built here run on a `ManualClock` and render in UTC so expected
//! timestamps can be written out literally.

use crate::bus::{Address, EventBus, Headers, Reply, Request};
use crate::core::{ManualClock, MarketDataAction, TimestampFormatter};
use crate::infrastructure::metrics::MetricsCollector;
use crate::router::MarketDataRouter;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Publish time every test router starts at (2023-11-14T22:13:20.000Z)
pub const TEST_NOW: i64 = 1_700_000_000_000;

pub struct TestRouter {
    pub router: MarketDataRouter<ManualClock>,
    pub clock: ManualClock,
    pub bus: EventBus,
    pub metrics: Arc<MetricsCollector>,
}

pub fn test_router() -> TestRouter {
    let bus = EventBus::default();
    let clock = ManualClock::new(TEST_NOW);
    let metrics = Arc::new(MetricsCollector::new());
    let router = MarketDataRouter::with_clock(
        bus.clone(),
        TimestampFormatter::UTC,
        metrics.clone(),
        clock.clone(),
    );
    TestRouter {
        router,
        clock,
        bus,
        metrics,
    }
}

/// Tick body as a producer would send it
pub fn tick_body(ticker: &str, received_time: i64) -> Value {
    json!({
        "ticker": ticker,
        "payload": { "receivedTime": received_time, "bid": 101.25, "ask": 101.5 }
    })
}

pub fn tick_request(ticker: &str, received_time: i64) -> (Request, oneshot::Receiver<Reply>) {
    request_with(
        Headers::for_action(MarketDataAction::Tick),
        tick_body(ticker, received_time),
    )
}

pub fn init_paint_request() -> (Request, oneshot::Receiver<Reply>) {
    request_with(Headers::for_action(MarketDataAction::InitPaint), json!({}))
}

pub fn request_with(headers: Headers, body: Value) -> (Request, oneshot::Receiver<Reply>) {
    Request::with_reply(Address::MarketdataPublisher, headers, body)
}
