//! Realized volatility module
//!
//! Bounded OHLC history per underlying, range-based and close-to-close
//! estimators, rolling statistics and implied-vs-realized comparison.

mod estimators;
mod iv_rv;
mod ohlc;
mod registry;
mod series;

pub use estimators::{close_to_close, garman_klass, parkinson};
pub use iv_rv::{analyze_iv_vs_rv, IvRvAnalysis, IvRvSignal, VolRegime};
pub use ohlc::{OhlcBar, OhlcRing};
pub use registry::RealizedVolRegistry;
pub use series::{RealizedVolSeries, RvMetrics};

use thiserror::Error;

/// Trading days per year used for annualization
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Default history window: one year of daily bars
pub const DEFAULT_HISTORY_WINDOW: usize = 252;
/// Fewer valid periods than this and an estimator reports 0
pub const MIN_VALID_PERIODS: usize = 5;

/// Rejected OHLC bars
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    /// Some price is zero, negative or not finite
    #[error("Non-positive price in bar: o={open} h={high} l={low} c={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
    /// High below low
    #[error("High {high} below low {low}")]
    HighBelowLow { high: f64, low: f64 },
    /// High below open or close
    #[error("High {high} below open/close")]
    HighBelowBody { high: f64 },
    /// Low above open or close
    #[error("Low {low} above open/close")]
    LowAboveBody { low: f64 },
    /// Registry already tracks the maximum number of underlyings
    #[error("Realized vol registry full ({0} underlyings)")]
    RegistryFull(usize),
}
