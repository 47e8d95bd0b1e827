//! Per-contract record

use crate::contract::OptionSymbol;
use crate::model::{Greeks, OptionAnalytics, OptionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Last print
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeInfo {
    pub price: f64,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
}

/// Last top-of-book quote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteInfo {
    pub bid: f64,
    pub bid_size: u64,
    pub ask: f64,
    pub ask_size: u64,
    pub timestamp: DateTime<Utc>,
}

impl QuoteInfo {
    /// Mid price when both sides are live
    pub fn mid(&self) -> Option<f64> {
        (self.bid > 0.0 && self.ask > 0.0).then(|| 0.5 * (self.bid + self.ask))
    }

    pub fn spread(&self) -> Option<f64> {
        (self.bid > 0.0 && self.ask > 0.0).then(|| self.ask - self.bid)
    }
}

/// Values kept from the previous recompute for change highlighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub spread: Option<f64>,
    pub implied_vol: f64,
    pub greeks: Greeks,
}

/// Direction of a displayed value since the previous recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeDirection {
    Up,
    Down,
    Unchanged,
}

impl ChangeDirection {
    /// Moves smaller than `threshold` count as unchanged
    pub fn between(current: f64, previous: f64, threshold: f64) -> Self {
        if (current - previous).abs() < threshold {
            ChangeDirection::Unchanged
        } else if current > previous {
            ChangeDirection::Up
        } else {
            ChangeDirection::Down
        }
    }
}

/// Fields tracked for change highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    Spread,
    ImpliedVol,
    Delta,
    Gamma,
    Theta,
    Vega,
    Vanna,
    Charm,
    Volga,
    Speed,
    Zomma,
    Color,
}

impl TrackedField {
    /// Display-unit value and the smallest move worth highlighting
    fn display_value(&self, spread: Option<f64>, iv: f64, greeks: &Greeks) -> Option<(f64, f64)> {
        let g = greeks.display_scaled();
        let pair = match self {
            TrackedField::Spread => (spread?, 0.001),
            TrackedField::ImpliedVol => (iv * 100.0, 0.1),
            TrackedField::Delta => (g.delta, 0.001),
            TrackedField::Gamma => (g.gamma, 0.001),
            TrackedField::Theta => (g.theta, 0.001),
            TrackedField::Vega => (g.vega, 0.001),
            TrackedField::Vanna => (g.vanna, 0.001),
            TrackedField::Charm => (g.charm, 0.1),
            TrackedField::Volga => (g.volga, 0.001),
            TrackedField::Speed => (g.speed, 0.0001),
            TrackedField::Zomma => (g.zomma, 0.001),
            TrackedField::Color => (g.color, 0.1),
        };
        Some(pair)
    }
}

/// Everything known about one option contract
#[derive(Debug, Clone, Serialize)]
pub struct ContractRecord {
    pub symbol: OptionSymbol,
    pub last_trade: Option<TradeInfo>,
    pub last_quote: Option<QuoteInfo>,
    /// Spot used by the latest recompute
    pub underlying_price: f64,
    /// Years to expiry at the latest recompute
    pub time_to_expiry: f64,
    pub analytics: OptionAnalytics,
    /// True only when spot > 0, T > 0 and the IV solve converged
    pub analytics_valid: bool,
    pub previous: Option<AnalyticsSnapshot>,
    pub recompute_count: u64,
    #[serde(skip)]
    pub last_recompute: Option<Instant>,
    pub last_update: Option<DateTime<Utc>>,
}

impl ContractRecord {
    pub fn new(symbol: OptionSymbol) -> Self {
        Self {
            symbol,
            last_trade: None,
            last_quote: None,
            underlying_price: 0.0,
            time_to_expiry: 0.0,
            analytics: OptionAnalytics::default(),
            analytics_valid: false,
            previous: None,
            recompute_count: 0,
            last_recompute: None,
            last_update: None,
        }
    }

    pub fn strike(&self) -> f64 {
        self.symbol.strike
    }

    pub fn option_type(&self) -> OptionType {
        self.symbol.option_type
    }

    /// Price to invert: last trade, else the quote mid
    pub fn market_price(&self) -> Option<f64> {
        match self.last_trade {
            Some(trade) if trade.price > 0.0 => Some(trade.price),
            _ => self.last_quote.and_then(|q| q.mid()),
        }
    }

    pub fn spread(&self) -> Option<f64> {
        self.last_quote.and_then(|q| q.spread())
    }

    /// Strike over spot; 0 before any spot is known
    pub fn moneyness(&self) -> f64 {
        if self.underlying_price > 0.0 {
            self.symbol.strike / self.underlying_price
        } else {
            0.0
        }
    }

    pub fn days_to_expiry(&self) -> f64 {
        self.time_to_expiry * 365.0
    }

    /// Values to remember before analytics are overwritten
    pub(crate) fn snapshot(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            spread: self.spread(),
            implied_vol: self.analytics.implied_vol,
            greeks: self.analytics.greeks,
        }
    }

    /// How a field moved since the previous recompute
    pub fn change(&self, field: TrackedField) -> ChangeDirection {
        let Some(prev) = self.previous.as_ref() else {
            return ChangeDirection::Unchanged;
        };
        let current = field.display_value(
            self.spread(),
            self.analytics.implied_vol,
            &self.analytics.greeks,
        );
        let previous = field.display_value(prev.spread, prev.implied_vol, &prev.greeks);
        match (current, previous) {
            (Some((cur, threshold)), Some((old, _))) => ChangeDirection::between(cur, old, threshold),
            _ => ChangeDirection::Unchanged,
        }
    }
}
