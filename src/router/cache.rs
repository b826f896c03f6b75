//! Latest-value snapshot cache
//!
//! One record per instrument, latest write wins. Entries are never evicted;
//! the cache lives exactly as long as the router that owns it.

use crate::core::{MarketData, Ticker};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<Ticker, MarketData>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for its ticker, returning the previous one
    ///
    /// No ordering check: an older tick processed later still replaces a
    /// newer one.
    #[inline]
    pub fn insert(&mut self, record: MarketData) -> Option<MarketData> {
        self.entries.insert(record.ticker.clone(), record)
    }

    #[inline]
    pub fn get(&self, ticker: &Ticker) -> Option<&MarketData> {
        self.entries.get(ticker)
    }

    /// Current records, unspecified order
    pub fn values(&self) -> impl Iterator<Item = &MarketData> {
        self.entries.values()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
