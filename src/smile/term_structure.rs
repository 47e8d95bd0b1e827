//! ATM vol across expiries of one underlying

use super::VolatilitySmile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermStructure {
    pub underlying: String,
    /// (years to expiry, ATM vol), nearest first
    pub points: Vec<(f64, f64)>,
    /// Least-squares slope of ATM vol against years
    pub slope: f64,
    /// Nearest expiry's ATM vol above the furthest one's
    pub backwardation: bool,
}

/// One term structure per underlying with at least two usable expiries
pub fn term_structures(smiles: &[VolatilitySmile]) -> Vec<TermStructure> {
    let mut underlyings: Vec<&str> = Vec::new();
    for smile in smiles {
        if !underlyings.contains(&smile.underlying.as_str()) {
            underlyings.push(&smile.underlying);
        }
    }

    underlyings
        .into_iter()
        .filter_map(|underlying| {
            let mut points: Vec<(f64, f64)> = smiles
                .iter()
                .filter(|s| {
                    s.underlying == underlying
                        && s.sufficient_data
                        && s.atm_vol > 0.0
                        && s.time_to_expiry > 0.0
                })
                .map(|s| (s.time_to_expiry, s.atm_vol))
                .collect();
            if points.len() < 2 {
                return None;
            }
            points.sort_by(|a, b| a.0.total_cmp(&b.0));

            let n = points.len() as f64;
            let mean_t = points.iter().map(|p| p.0).sum::<f64>() / n;
            let mean_v = points.iter().map(|p| p.1).sum::<f64>() / n;
            let sxx: f64 = points.iter().map(|p| (p.0 - mean_t).powi(2)).sum();
            let sxy: f64 = points
                .iter()
                .map(|p| (p.0 - mean_t) * (p.1 - mean_v))
                .sum();
            let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

            let backwardation = match (points.first(), points.last()) {
                (Some(near), Some(far)) => near.1 > far.1,
                _ => false,
            };

            Some(TermStructure {
                underlying: underlying.to_string(),
                points,
                slope,
                backwardation,
            })
        })
        .collect()
}
