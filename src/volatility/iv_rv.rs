//! Implied versus realized volatility

use super::RvMetrics;
use crate::model::normal_cdf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IV-RV spread, as a fraction of RV, beyond which vol is rich or cheap
pub const SPREAD_THRESHOLD: f64 = 0.15;
/// |trend| beyond which the recommendation notes the RV direction
const TREND_THRESHOLD: f64 = 0.2;

/// Where current realized vol sits against its own history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolRegime {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IvRvSignal {
    Expensive,
    Cheap,
    Neutral,
}

impl fmt::Display for IvRvSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IvRvSignal::Expensive => write!(f, "EXPENSIVE"),
            IvRvSignal::Cheap => write!(f, "CHEAP"),
            IvRvSignal::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvRvAnalysis {
    /// Realized vol matched to the option's horizon
    pub relevant_rv: f64,
    /// IV minus relevant RV
    pub spread: f64,
    /// Normal-CDF percentile of IV within the rolling RV distribution
    pub iv_percentile: Option<f64>,
    pub regime: Option<VolRegime>,
    pub signal: IvRvSignal,
    pub recommendation: String,
}

/// Compare an implied vol with the underlying's realized vol.
///
/// None when there is no 20-day RV or the IV is not positive.
pub fn analyze_iv_vs_rv(
    implied_vol: f64,
    rv: &RvMetrics,
    days_to_expiry: f64,
) -> Option<IvRvAnalysis> {
    if implied_vol <= 0.0 || rv.rv_20d <= 0.0 {
        return None;
    }

    let relevant_rv = rv.relevant_rv(days_to_expiry);
    let spread = implied_vol - relevant_rv;

    let (iv_percentile, regime) = if rv.has_statistics() {
        let z = (implied_vol - rv.mean) / rv.std;
        let regime = if relevant_rv < rv.mean - 0.5 * rv.std {
            VolRegime::Low
        } else if relevant_rv > rv.mean + 0.5 * rv.std {
            VolRegime::High
        } else {
            VolRegime::Normal
        };
        (Some(normal_cdf(z)), Some(regime))
    } else {
        (None, None)
    };

    let threshold = relevant_rv * SPREAD_THRESHOLD;
    let (signal, base) = if spread > threshold {
        let text = match iv_percentile {
            Some(p) if p > 0.8 => "SELL VOL - IV extremely rich vs RV",
            _ => "SHORT BIAS - IV moderately expensive",
        };
        (IvRvSignal::Expensive, text)
    } else if spread < -threshold {
        let text = match iv_percentile {
            Some(p) if p < 0.2 => "BUY VOL - IV extremely cheap vs RV",
            _ => "LONG BIAS - IV moderately cheap",
        };
        (IvRvSignal::Cheap, text)
    } else {
        (IvRvSignal::Neutral, "FAIR VALUE - IV in line with RV")
    };

    let mut recommendation = base.to_string();
    if rv.trend > TREND_THRESHOLD {
        recommendation.push_str(" (RV rising)");
    } else if rv.trend < -TREND_THRESHOLD {
        recommendation.push_str(" (RV falling)");
    }

    Some(IvRvAnalysis {
        relevant_rv,
        spread,
        iv_percentile,
        regime,
        signal,
        recommendation,
    })
}
