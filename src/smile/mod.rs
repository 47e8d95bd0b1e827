//! Volatility smile module
//!
//! Rebuilt from the contract table every analysis cycle: converged IVs are
//! grouped by (underlying, expiry), then ATM vol, skew, curvature and fit
//! quality are derived and turned into pattern flags.

mod builder;
mod fit;
mod term_structure;

pub use builder::{analyze_smile, build_smiles, SmileBuilder};
pub use fit::{atm_vol, curvature, log_moneyness_r_squared};
pub use term_structure::{term_structures, TermStructure};

use crate::model::OptionType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points kept per smile
pub const MAX_SMILE_POINTS: usize = 50;
/// Points needed before a smile is analyzable
pub const MIN_SMILE_POINTS: usize = 3;
/// IV difference that counts as skew
pub const SKEW_THRESHOLD: f64 = 0.02;
/// Curvature / tail-vol difference that counts as a smile
pub const SMILE_THRESHOLD: f64 = 0.01;
/// Strike/spot below which a put counts as OTM
pub const OTM_PUT_MONEYNESS: f64 = 0.95;
/// Strike/spot above which a call counts as OTM
pub const OTM_CALL_MONEYNESS: f64 = 1.05;

/// Reliability of a single smile point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointQuality {
    Good,
    /// Quote so wide the IV is only a rough guide
    Questionable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmilePoint {
    pub strike: f64,
    pub implied_vol: f64,
    /// Strike over spot
    pub moneyness: f64,
    pub time_to_expiry: f64,
    pub option_type: OptionType,
    pub quality: PointQuality,
}

/// Shape flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmilePatterns {
    pub put_skew: bool,
    pub call_skew: bool,
    pub smile: bool,
    pub inverted: bool,
}

/// Conditions worth surfacing to a trader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmileAnomaly {
    /// |put or call skew| above 5 vol points
    ExtremeSkew,
    /// ATM vol above the wings
    Inverted,
    /// R^2 below 0.7 with at least five points
    PoorFit,
    /// More than 10 vol points between min and max
    WideRange,
}

impl fmt::Display for SmileAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmileAnomaly::ExtremeSkew => write!(f, "EXTREME SKEW"),
            SmileAnomaly::Inverted => write!(f, "INVERTED SMILE"),
            SmileAnomaly::PoorFit => write!(f, "POOR FIT - POTENTIAL MISPRICING"),
            SmileAnomaly::WideRange => write!(f, "WIDE VOL RANGE"),
        }
    }
}

/// One (underlying, expiry) smile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySmile {
    pub underlying: String,
    /// `YYMMDD`
    pub expiry: String,
    pub time_to_expiry: f64,
    pub underlying_price: f64,
    /// Sorted by strike
    pub points: Vec<SmilePoint>,
    pub atm_vol: f64,
    /// ATM vol minus OTM put vol
    pub put_skew: f64,
    /// OTM call vol minus ATM vol
    pub call_skew: f64,
    pub curvature: f64,
    pub min_vol: f64,
    pub max_vol: f64,
    pub r_squared: f64,
    pub sufficient_data: bool,
    pub patterns: SmilePatterns,
    pub anomalies: Vec<SmileAnomaly>,
}

impl VolatilitySmile {
    pub fn new(underlying: impl Into<String>, expiry: impl Into<String>) -> Self {
        Self {
            underlying: underlying.into(),
            expiry: expiry.into(),
            time_to_expiry: 0.0,
            underlying_price: 0.0,
            points: Vec::new(),
            atm_vol: 0.0,
            put_skew: 0.0,
            call_skew: 0.0,
            curvature: 0.0,
            min_vol: 0.0,
            max_vol: 0.0,
            r_squared: 0.0,
            sufficient_data: false,
            patterns: SmilePatterns::default(),
            anomalies: Vec::new(),
        }
    }

    pub fn is_anomalous(&self) -> bool {
        !self.anomalies.is_empty()
    }

    /// Dominant skew: put skew when larger in magnitude, else call skew
    pub fn skew(&self) -> f64 {
        if self.put_skew.abs() >= self.call_skew.abs() {
            self.put_skew
        } else {
            self.call_skew
        }
    }
}
