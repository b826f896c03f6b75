//! Routing actions carried in the `action` request header

use std::fmt;
use std::str::FromStr;

/// Header key selecting the action
pub const ACTION_HEADER: &str = "action";

/// Closed set of actions accepted on `marketdata_publisher`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketDataAction {
    /// Cache and rebroadcast one update
    Tick,
    /// Reply with the full snapshot
    InitPaint,
}

impl MarketDataAction {
    pub const ALL: [Self; 2] = [Self::Tick, Self::InitPaint];

    /// Wire name of the action
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::InitPaint => "init_paint",
        }
    }
}

impl FromStr for MarketDataAction {
    type Err = UnknownAction;

    /// Case-sensitive, matching the wire names exactly
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tick" => Ok(Self::Tick),
            "init_paint" => Ok(Self::InitPaint),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for MarketDataAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown market data action '{0}'")]
pub struct UnknownAction(pub String);
