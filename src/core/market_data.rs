//! Market data records
//!
//! `MarketData` is the per-instrument unit of state held by the snapshot
//! cache. Times are raw epoch milliseconds; `render` produces the wire form
//! with both times converted to zone-formatted strings.

use super::{Ticker, TimestampFormatter};
use crate::Result;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Producer-supplied payload
///
/// Only `receivedTime` is interpreted; every other field is carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Time the producer observed the data (epoch millis)
    pub received_time: i64,
    /// Remaining producer fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Latest known value for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub ticker: Ticker,
    pub payload: Payload,
    /// Server-assigned publish time (epoch millis). Whatever the producer
    /// sends here is discarded on decode.
    #[serde(default, deserialize_with = "discard_publish_time")]
    pub publish_time: i64,
}

fn discard_publish_time<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(0)
}

/// Wire form of a record: times rendered as strings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedMarketData<'a> {
    ticker: &'a Ticker,
    payload: RenderedPayload<'a>,
    publish_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedPayload<'a> {
    received_time: String,
    #[serde(flatten)]
    fields: &'a Map<String, Value>,
}

impl Payload {
    pub fn new(received_time: i64) -> Self {
        Self {
            received_time,
            fields: Map::new(),
        }
    }

    /// Attach a producer field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl MarketData {
    pub fn new(ticker: Ticker, payload: Payload) -> Self {
        Self {
            ticker,
            payload,
            publish_time: 0,
        }
    }

    /// Render to the broadcast/snapshot wire form
    pub fn render(&self, formatter: &TimestampFormatter) -> Result<Value> {
        let rendered = RenderedMarketData {
            ticker: &self.ticker,
            payload: RenderedPayload {
                received_time: formatter.format_epoch_millis(self.payload.received_time)?,
                fields: &self.payload.fields,
            },
            publish_time: formatter.format_epoch_millis(self.publish_time)?,
        };
        Ok(serde_json::to_value(rendered)?)
    }
}
