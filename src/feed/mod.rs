//! Tick feeds
//!
//! Market data arrives as [`TickEvent`]s on an mpsc channel. Only the
//! mock feed is provided; a live transport implements [`TickFeed`] the
//! same way.

mod mock;

pub use mock::{FeedStream, MockFeed, MockMarket, REFERENCE_VOL};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A single market data update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TickEvent {
    OptionTrade {
        symbol: String,
        price: Decimal,
        size: u64,
        timestamp: DateTime<Utc>,
    },
    OptionQuote {
        symbol: String,
        bid: Decimal,
        bid_size: u64,
        ask: Decimal,
        ask_size: u64,
        timestamp: DateTime<Utc>,
    },
    UnderlyingTrade {
        symbol: String,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
    UnderlyingQuote {
        symbol: String,
        bid: Decimal,
        ask: Decimal,
        timestamp: DateTime<Utc>,
    },
}

impl TickEvent {
    pub fn symbol(&self) -> &str {
        match self {
            TickEvent::OptionTrade { symbol, .. }
            | TickEvent::OptionQuote { symbol, .. }
            | TickEvent::UnderlyingTrade { symbol, .. }
            | TickEvent::UnderlyingQuote { symbol, .. } => symbol,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TickEvent::OptionTrade { timestamp, .. }
            | TickEvent::OptionQuote { timestamp, .. }
            | TickEvent::UnderlyingTrade { timestamp, .. }
            | TickEvent::UnderlyingQuote { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(
            self,
            TickEvent::OptionTrade { .. } | TickEvent::OptionQuote { .. }
        )
    }
}

/// Trait for tick feed implementations
#[async_trait]
pub trait TickFeed: Send + Sync {
    /// Subscribe to tick updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<TickEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_accessors() {
        let ts = Utc::now();
        let quote = TickEvent::OptionQuote {
            symbol: "QQQ271217C00560000".to_string(),
            bid: dec!(12.10),
            bid_size: 10,
            ask: dec!(12.30),
            ask_size: 5,
            timestamp: ts,
        };
        assert_eq!(quote.symbol(), "QQQ271217C00560000");
        assert_eq!(quote.timestamp(), ts);
        assert!(quote.is_option());

        let stock = TickEvent::UnderlyingTrade {
            symbol: "QQQ".to_string(),
            price: dec!(561.25),
            timestamp: ts,
        };
        assert!(!stock.is_option());
    }

    #[test]
    fn test_event_serialization() {
        let tick = TickEvent::UnderlyingTrade {
            symbol: "SPY".to_string(),
            price: dec!(601.5),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&tick).unwrap();
        let back: TickEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tick);
    }
}
