//! Instrument identifier
//!
//! Tickers are opaque producer-supplied strings used as the cache key.
//! Serialized transparently as a JSON string; an empty ticker never decodes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Create a ticker, rejecting the empty string
    pub fn new(name: impl Into<String>) -> Result<Self, TickerError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TickerError::Empty);
        }
        Ok(Self(name))
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ticker {
    type Error = TickerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TickerError {
    #[error("ticker must not be empty")]
    Empty,
}
