//! Dislocation analyzer
//!
//! Flags contracts whose higher-order Greeks or IV/RV relationship look
//! out of line, and maps each flag combination to a suggested structure.

mod analyzer;
mod recommend;

pub use analyzer::{DislocationAnalyzer, DislocationThresholds};
pub use recommend::recommend;

use crate::volatility::IvRvAnalysis;
use serde::{Deserialize, Serialize};

/// Which checks fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DislocationFlags {
    /// Vanna wrong-signed for the moneyness, or too large
    pub vanna: bool,
    /// Volga far above or below its usual level
    pub volga: bool,
    /// Positive or outsized charm
    pub charm: bool,
    /// |vanna / volga| outside its usual band
    pub vanna_volga: bool,
    /// Implied vol rich or cheap against realized
    pub iv_rv: bool,
}

impl DislocationFlags {
    pub fn any(&self) -> bool {
        self.vanna || self.volga || self.charm || self.vanna_volga || self.iv_rv
    }
}

/// Where the contract sits on its own smile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmileContext {
    pub atm_vol: f64,
    pub skew: f64,
    /// Contract IV minus smile ATM vol
    pub iv_vs_atm: f64,
}

/// One contract's dislocation report for an analysis cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DislocationAlert {
    pub symbol: String,
    /// e.g. `QQQ 08/01/25 $560.00 Call`
    pub description: String,
    pub flags: DislocationFlags,
    pub vanna_volga_ratio: Option<f64>,
    pub iv_rv: Option<IvRvAnalysis>,
    pub smile: Option<SmileContext>,
    /// Short fragments such as `HIGH VOLGA 45.2`
    pub messages: Vec<String>,
    pub recommendations: Vec<String>,
}

impl DislocationAlert {
    /// Fragments joined for a single log or display line
    pub fn summary(&self) -> String {
        self.messages.join(" ")
    }
}
