//! Zone-aware timestamp rendering
//!
//! Epoch milliseconds are stored raw and only rendered to strings on the way
//! out (broadcast and snapshot replies). Rendering uses a single UTC offset
//! resolved at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// ISO-8601 with millisecond precision and explicit offset
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
);

const OFFSET_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Largest year magnitude we render; keeps offset conversion inside the
/// calendar range supported by `time`.
const MAX_YEAR: i32 = 9998;

/// Calendar zone used for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Zone {
    /// Process local zone
    #[default]
    Local,
    /// Fixed UTC offset (`utc` is `+00:00`)
    Fixed(UtcOffset),
}

impl Zone {
    /// Resolve to a concrete offset.
    ///
    /// Call before any thread is spawned (logging writers, async runtime):
    /// on Unix the local offset is unavailable once the process is
    /// multi-threaded.
    pub fn resolve(self) -> Result<UtcOffset, TimestampError> {
        match self {
            Zone::Fixed(offset) => Ok(offset),
            Zone::Local => UtcOffset::current_local_offset()
                .map_err(|e| TimestampError::LocalOffsetUnavailable(e.to_string())),
        }
    }
}

impl FromStr for Zone {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        if trimmed.eq_ignore_ascii_case("utc") {
            return Ok(Zone::Fixed(UtcOffset::UTC));
        }
        UtcOffset::parse(trimmed, OFFSET_FORMAT)
            .map(Zone::Fixed)
            .map_err(|_| TimestampError::InvalidZone(s.to_string()))
    }
}

impl TryFrom<String> for Zone {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Zone> for String {
    fn from(zone: Zone) -> Self {
        zone.to_string()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Fixed(offset) if *offset == UtcOffset::UTC => f.write_str("utc"),
            Zone::Fixed(offset) => {
                let (hours, minutes, _) = offset.as_hms();
                let sign = if offset.is_negative() { '-' } else { '+' };
                write!(f, "{}{:02}:{:02}", sign, hours.unsigned_abs(), minutes.unsigned_abs())
            }
        }
    }
}

/// Renders epoch milliseconds under a fixed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampFormatter {
    offset: UtcOffset,
}

impl TimestampFormatter {
    pub const UTC: Self = Self {
        offset: UtcOffset::UTC,
    };

    pub const fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    #[inline(always)]
    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Render epoch milliseconds, e.g. `1970-01-01T05:30:01.000+05:30`
    pub fn format_epoch_millis(&self, millis: i64) -> Result<String, TimestampError> {
        let nanos = i128::from(millis) * 1_000_000;
        let instant = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| TimestampError::OutOfRange(millis))?;
        if instant.year().abs() > MAX_YEAR {
            return Err(TimestampError::OutOfRange(millis));
        }
        instant
            .to_offset(self.offset)
            .format(TIMESTAMP_FORMAT)
            .map_err(|e| TimestampError::Format(e.to_string()))
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self::UTC
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("invalid zone '{0}': expected local, utc or ±HH:MM")]
    InvalidZone(String),

    #[error("local zone offset unavailable: {0}")]
    LocalOffsetUnavailable(String),

    #[error("epoch millis {0} outside the renderable calendar range")]
    OutOfRange(i64),

    #[error("timestamp formatting failed: {0}")]
    Format(String),
}
