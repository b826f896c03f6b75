//! Metrics collection for system monitoring
//!
//! Lock-free metrics counters using atomic operations.
//! Updated by the router on every dispatch, exported via API in cold path.

use crate::bus::ErrorCode;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

/// System metrics collector
///
/// Thread-safe counters updated from the dispatch loop.
/// Snapshots taken for API export.
pub struct MetricsCollector {
    /// Ticks accepted into the cache
    ticks_accepted: AtomicU64,
    /// Init paint snapshots served
    snapshots_served: AtomicU64,
    /// Status broadcasts emitted
    broadcasts: AtomicU64,
    /// Requests rejected for a missing action header
    no_action_failures: AtomicU64,
    /// Requests rejected for an unknown action
    bad_action_failures: AtomicU64,
    /// Requests rejected for an undecodable body
    invalid_body_failures: AtomicU64,
    /// Distinct instruments currently cached
    cached_instruments: AtomicU64,
    /// Last accepted tick timestamp (Unix millis)
    last_tick_time: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

/// Metrics snapshot for API export
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub ticks_accepted: u64,
    pub snapshots_served: u64,
    pub broadcasts: u64,
    pub no_action_failures: u64,
    pub bad_action_failures: u64,
    pub invalid_body_failures: u64,
    pub cached_instruments: u64,
    pub last_tick_time: u64,
    pub tick_rate: f64, // ticks per second
    pub uptime_seconds: u64,
}

impl MetricsCollector {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            ticks_accepted: AtomicU64::new(0),
            snapshots_served: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            no_action_failures: AtomicU64::new(0),
            bad_action_failures: AtomicU64::new(0),
            invalid_body_failures: AtomicU64::new(0),
            cached_instruments: AtomicU64::new(0),
            last_tick_time: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a tick accepted into the cache
    #[inline]
    pub fn record_tick(&self, cached_instruments: usize) {
        self.ticks_accepted.fetch_add(1, Ordering::Relaxed);
        self.cached_instruments
            .store(cached_instruments as u64, Ordering::Relaxed);
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_tick_time.store(now, Ordering::Relaxed);
    }

    /// Record a status broadcast
    #[inline]
    pub fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an init paint reply
    #[inline]
    pub fn record_snapshot(&self) {
        self.snapshots_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected request
    #[inline]
    pub fn record_failure(&self, code: ErrorCode) {
        let counter = match code {
            ErrorCode::NoActionSpecified => &self.no_action_failures,
            ErrorCode::BadAction => &self.bad_action_failures,
            ErrorCode::InvalidBody => &self.invalid_body_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let ticks = self.ticks_accepted.load(Ordering::Relaxed);

        let uptime = self.start_time.elapsed().as_secs();
        let rate = if uptime > 0 {
            ticks as f64 / uptime as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            ticks_accepted: ticks,
            snapshots_served: self.snapshots_served.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            no_action_failures: self.no_action_failures.load(Ordering::Relaxed),
            bad_action_failures: self.bad_action_failures.load(Ordering::Relaxed),
            invalid_body_failures: self.invalid_body_failures.load(Ordering::Relaxed),
            cached_instruments: self.cached_instruments.load(Ordering::Relaxed),
            last_tick_time: self.last_tick_time.load(Ordering::Relaxed),
            tick_rate: rate,
            uptime_seconds: uptime,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
