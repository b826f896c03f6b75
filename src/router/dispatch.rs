//! Market data router
//!
//! Validates inbound requests, maintains the snapshot cache, republishes
//! ticks on `marketdata_status` and serves init paint snapshots.
//!
//! The router is driven through `&mut self` by a single dispatch loop, so
//! every read-modify-publish sequence runs without overlap and the cache
//! needs no lock.

use super::SnapshotCache;
use crate::bus::{Address, ErrorCode, EventBus, Request};
use crate::core::{
    Clock, MarketData, MarketDataAction, SystemClock, TimestampFormatter, UnknownAction,
    ACTION_HEADER,
};
use crate::infrastructure::metrics::MetricsCollector;
use crate::{log_router, HubError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::Level;

pub struct MarketDataRouter<C: Clock = SystemClock> {
    cache: SnapshotCache,
    bus: EventBus,
    formatter: TimestampFormatter,
    clock: C,
    metrics: Arc<MetricsCollector>,
}

impl MarketDataRouter<SystemClock> {
    /// Router stamping publish times from the system clock
    pub fn new(bus: EventBus, formatter: TimestampFormatter, metrics: Arc<MetricsCollector>) -> Self {
        Self::with_clock(bus, formatter, metrics, SystemClock)
    }
}

impl<C: Clock> MarketDataRouter<C> {
    pub fn with_clock(
        bus: EventBus,
        formatter: TimestampFormatter,
        metrics: Arc<MetricsCollector>,
        clock: C,
    ) -> Self {
        Self {
            cache: SnapshotCache::new(),
            bus,
            formatter,
            clock,
            metrics,
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Handle one inbound request
    ///
    /// Validation failures are answered through the request and return
    /// `Ok`. Decode and rendering failures also fail the request, then come
    /// back as `Err` for the caller to log.
    pub fn handle(&mut self, request: Request) -> Result<()> {
        let Some(raw) = request.headers().get(ACTION_HEADER) else {
            log_router!(
                Level::ERROR,
                request_id = %request.id(),
                headers = ?request.headers(),
                body = %request.body(),
                "No action header specified"
            );
            self.metrics.record_failure(ErrorCode::NoActionSpecified);
            request.fail(ErrorCode::NoActionSpecified, "No action header specified");
            return Ok(());
        };

        match raw.parse::<MarketDataAction>() {
            Ok(MarketDataAction::Tick) => self.on_tick(request),
            Ok(MarketDataAction::InitPaint) => self.init_paint(request),
            Err(UnknownAction(action)) => {
                self.metrics.record_failure(ErrorCode::BadAction);
                request.fail(ErrorCode::BadAction, format!("Bad action: {}", action));
                log_router!(Level::ERROR, "Unknown market data action {}", action);
                Ok(())
            }
        }
    }

    /// Cache the tick, then broadcast it with a server-assigned publish time
    fn on_tick(&mut self, request: Request) -> Result<()> {
        let mut record = match MarketData::deserialize(request.body()) {
            Ok(record) => record,
            Err(e) => {
                self.metrics.record_failure(ErrorCode::InvalidBody);
                request.fail(ErrorCode::InvalidBody, format!("Invalid tick body: {}", e));
                return Err(HubError::Decode(e));
            }
        };

        record.publish_time = self.clock.now_millis();

        // Render before caching so an unrenderable tick never enters the cache
        let rendered = match record.render(&self.formatter) {
            Ok(rendered) => rendered,
            Err(e) => {
                self.metrics.record_failure(ErrorCode::InvalidBody);
                request.fail(
                    ErrorCode::InvalidBody,
                    format!("Unrenderable tick for {}: {}", record.ticker, e),
                );
                return Err(e);
            }
        };

        let ticker = record.ticker.clone();
        self.cache.insert(record);
        self.metrics.record_tick(self.cache.len());

        let reached = self.bus.publish(Address::MarketdataStatus, rendered);
        self.metrics.record_broadcast();
        log_router!(
            Level::DEBUG,
            request_id = %request.id(),
            ticker = %ticker,
            subscribers = reached,
            "Published market data"
        );
        Ok(())
    }

    /// Reply with every cached record rendered for the wire
    fn init_paint(&mut self, request: Request) -> Result<()> {
        let rendered: Result<Vec<Value>> = self
            .cache
            .values()
            .map(|record| record.render(&self.formatter))
            .collect();

        match rendered {
            Ok(records) => {
                let count = records.len();
                request.reply(Value::Array(records));
                self.metrics.record_snapshot();
                log_router!(Level::DEBUG, records = count, "Served init paint");
                Ok(())
            }
            Err(e) => {
                self.metrics.record_failure(ErrorCode::InvalidBody);
                request.fail(ErrorCode::InvalidBody, format!("Snapshot rendering failed: {}", e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::{Address, ErrorCode, Headers};
    use crate::core::{MarketDataAction, Ticker, ACTION_HEADER};
    use crate::HubError;
    use crate::test_utils::*;
    use proptest::prelude::*;
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    const TEST_NOW_RENDERED: &str = "2023-11-14T22:13:20.000+00:00";

    fn ticker(name: &str) -> Ticker {
        Ticker::new(name).unwrap()
    }

    #[test]
    fn test_tick_caches_and_broadcasts() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);

        let (request, mut reply) = tick_request("AAPL", 1000);
        t.router.handle(request).unwrap();

        let cached = t.router.cache().get(&ticker("AAPL")).unwrap();
        assert_eq!(cached.publish_time, TEST_NOW);
        assert_eq!(cached.payload.received_time, 1000);

        assert_eq!(
            status.try_recv().unwrap(),
            json!({
                "ticker": "AAPL",
                "payload": {
                    "receivedTime": "1970-01-01T00:00:01.000+00:00",
                    "bid": 101.25,
                    "ask": 101.5
                },
                "publishTime": TEST_NOW_RENDERED
            })
        );

        // Tick never replies to its caller
        assert!(matches!(
            reply.try_recv(),
            Err(tokio::sync::oneshot::error::TryRecvError::Closed)
        ));

        let snapshot = t.metrics.snapshot();
        assert_eq!(snapshot.ticks_accepted, 1);
        assert_eq!(snapshot.broadcasts, 1);
        assert_eq!(snapshot.cached_instruments, 1);
    }

    #[test]
    fn test_publish_time_ignores_producer_value() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);
        t.clock.set(86_400_000);

        let (request, _reply) = request_with(
            Headers::for_action(MarketDataAction::Tick),
            json!({
                "ticker": "AAPL",
                "payload": { "receivedTime": 1000 },
                "publishTime": 5
            }),
        );
        t.router.handle(request).unwrap();

        let broadcast = status.try_recv().unwrap();
        assert_eq!(broadcast["publishTime"], json!("1970-01-02T00:00:00.000+00:00"));
        assert_eq!(t.router.cache().get(&ticker("AAPL")).unwrap().publish_time, 86_400_000);
    }

    #[test]
    fn test_latest_write_wins_even_when_older() {
        let mut t = test_router();

        for received_time in [3000, 5000, 1000] {
            let (request, _reply) = tick_request("MSFT", received_time);
            t.router.handle(request).unwrap();
            t.clock.advance(10);
        }

        assert_eq!(t.router.cache().len(), 1);
        let cached = t.router.cache().get(&ticker("MSFT")).unwrap();
        assert_eq!(cached.payload.received_time, 1000);
        assert_eq!(cached.publish_time, TEST_NOW + 20);
    }

    #[tokio::test]
    async fn test_init_paint_replies_with_snapshot() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);

        for (name, received_time) in [("A", 1000), ("B", 2000), ("C", 3000), ("A", 4000)] {
            let (request, _reply) = tick_request(name, received_time);
            t.router.handle(request).unwrap();
        }
        while status.try_recv().is_ok() {}

        let (request, reply) = init_paint_request();
        t.router.handle(request).unwrap();

        let records = reply.await.unwrap().unwrap();
        let records = records.as_array().unwrap();
        assert_eq!(records.len(), 3);

        let mut received: Vec<(String, String)> = records
            .iter()
            .map(|r| {
                assert_eq!(r["publishTime"], json!(TEST_NOW_RENDERED));
                (
                    r["ticker"].as_str().unwrap().to_string(),
                    r["payload"]["receivedTime"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        received.sort();
        assert_eq!(
            received,
            vec![
                ("A".to_string(), "1970-01-01T00:00:04.000+00:00".to_string()),
                ("B".to_string(), "1970-01-01T00:00:02.000+00:00".to_string()),
                ("C".to_string(), "1970-01-01T00:00:03.000+00:00".to_string()),
            ]
        );

        // Snapshot never broadcasts
        assert!(matches!(status.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(t.metrics.snapshot().snapshots_served, 1);
    }

    #[tokio::test]
    async fn test_init_paint_on_empty_cache() {
        let mut t = test_router();
        let (request, reply) = init_paint_request();
        t.router.handle(request).unwrap();
        assert_eq!(reply.await.unwrap(), Ok(json!([])));
    }

    #[tokio::test]
    async fn test_tick_then_init_paint_scenario() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);

        let (request, _reply) = request_with(
            Headers::for_action(MarketDataAction::Tick),
            json!({ "ticker": "AAPL", "payload": { "receivedTime": 1000 } }),
        );
        t.router.handle(request).unwrap();
        let broadcast = status.try_recv().unwrap();

        let (request, reply) = init_paint_request();
        t.router.handle(request).unwrap();

        assert_eq!(reply.await.unwrap(), Ok(json!([broadcast])));
    }

    #[tokio::test]
    async fn test_missing_action_rejected() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);

        let (request, reply) = request_with(Headers::new().with("source", "feed"), tick_body("AAPL", 1000));
        t.router.handle(request).unwrap();

        let failure = reply.await.unwrap().unwrap_err();
        assert_eq!(failure.code, ErrorCode::NoActionSpecified);
        assert_eq!(failure.code.code(), 0);
        assert_eq!(failure.message, "No action header specified");

        assert!(t.router.cache().is_empty());
        assert!(matches!(status.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(t.metrics.snapshot().no_action_failures, 1);
    }

    #[tokio::test]
    async fn test_unknown_action_rejected() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);

        let (request, reply) = request_with(
            Headers::new().with(ACTION_HEADER, "bogus"),
            tick_body("AAPL", 1000),
        );
        t.router.handle(request).unwrap();

        let failure = reply.await.unwrap().unwrap_err();
        assert_eq!(failure.code, ErrorCode::BadAction);
        assert_eq!(failure.code.code(), 1);
        assert_eq!(failure.message, "Bad action: bogus");

        assert!(t.router.cache().is_empty());
        assert!(matches!(status.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(t.metrics.snapshot().bad_action_failures, 1);
    }

    #[tokio::test]
    async fn test_undecodable_tick_leaves_cache_untouched() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);

        let (request, _reply) = tick_request("AAPL", 1000);
        t.router.handle(request).unwrap();
        status.try_recv().unwrap();

        let (request, reply) = request_with(
            Headers::for_action(MarketDataAction::Tick),
            json!({ "ticker": "AAPL", "payload": { "bid": 1.0 } }),
        );
        assert!(matches!(t.router.handle(request), Err(HubError::Decode(_))));

        let failure = reply.await.unwrap().unwrap_err();
        assert_eq!(failure.code, ErrorCode::InvalidBody);

        assert_eq!(t.router.cache().len(), 1);
        assert_eq!(
            t.router.cache().get(&ticker("AAPL")).unwrap().payload.received_time,
            1000
        );
        assert!(matches!(status.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(t.metrics.snapshot().invalid_body_failures, 1);
    }

    #[tokio::test]
    async fn test_unrenderable_tick_not_cached() {
        let mut t = test_router();
        let mut status = t.bus.subscribe(Address::MarketdataStatus);

        let (request, reply) = tick_request("AAPL", i64::MAX);
        assert!(matches!(t.router.handle(request), Err(HubError::Timestamp(_))));

        assert_eq!(reply.await.unwrap().unwrap_err().code, ErrorCode::InvalidBody);
        assert!(t.router.cache().is_empty());
        assert!(matches!(status.try_recv(), Err(TryRecvError::Empty)));
    }

    proptest! {
        #[test]
        fn prop_latest_write_wins(
            ticks in prop::collection::vec((0usize..4, any::<u32>(), any::<i32>()), 1..64)
        ) {
            let names = ["AAPL", "MSFT", "GOOG", "AMZN"];
            let mut t = test_router();

            for (i, (idx, received_time, level)) in ticks.iter().enumerate() {
                t.clock.set(TEST_NOW + i as i64);
                let (request, _reply) = request_with(
                    Headers::for_action(MarketDataAction::Tick),
                    json!({
                        "ticker": names[*idx],
                        "payload": { "receivedTime": *received_time, "level": *level }
                    }),
                );
                t.router.handle(request).unwrap();
            }

            for (idx, name) in names.iter().enumerate() {
                let last = ticks.iter().enumerate().rev().find(|(_, (i, _, _))| *i == idx);
                let cached = t.router.cache().get(&ticker(name));
                match last {
                    Some((seq, (_, received_time, level))) => {
                        let cached = cached.unwrap();
                        prop_assert_eq!(cached.payload.received_time, i64::from(*received_time));
                        prop_assert_eq!(&cached.payload.fields["level"], &json!(*level));
                        prop_assert_eq!(cached.publish_time, TEST_NOW + seq as i64);
                    }
                    None => prop_assert!(cached.is_none()),
                }
            }
        }
    }
}
