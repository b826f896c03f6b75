//! Well-known bus addresses
//!
//! Names are stable contract points shared with producers and consumers.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// Inbound requests for the market data router (`tick`, `init_paint`)
    MarketdataPublisher,
    /// Broadcast of every accepted tick
    MarketdataStatus,
}

impl Address {
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MarketdataPublisher => "marketdata_publisher",
            Self::MarketdataStatus => "marketdata_status",
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_names_are_stable() {
        assert_eq!(Address::MarketdataPublisher.name(), "marketdata_publisher");
        assert_eq!(Address::MarketdataStatus.to_string(), "marketdata_status");
    }
}
