//! Analytics record store
//!
//! The shared per-contract table and the underlying spot cache. Every tick
//! lands here and triggers a rate-limited IV/Greeks recompute.

mod clock;
mod price_cache;
mod record;
mod table;

pub use clock::{Clock, ManualClock, SystemClock};
pub use price_cache::{UnderlyingPrice, UnderlyingPriceCache, MAX_UNDERLYINGS};
pub use record::{
    AnalyticsSnapshot, ChangeDirection, ContractRecord, QuoteInfo, TrackedField, TradeInfo,
};
pub use table::{
    AnalyticsStore, InvalidReason, RecomputeOutcome, StoreConfig, StoreStats, MAX_CONTRACTS,
    RECOMPUTE_THROTTLE,
};

use crate::contract::SymbolError;
use thiserror::Error;

/// Store errors. An `Err` means no record was touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Symbol does not follow the option grammar
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    /// Contract table is full
    #[error("Contract table full ({0} contracts)")]
    CapacityExceeded(usize),
    /// Underlying price cache is full
    #[error("Price cache full ({0} underlyings)")]
    PriceCacheFull(usize),
    /// Negative, zero or non-finite price in a tick
    #[error("Invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },
}
