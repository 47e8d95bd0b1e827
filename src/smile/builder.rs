//! Smile construction from contract snapshots

use super::{
    atm_vol, curvature, log_moneyness_r_squared, PointQuality, SmileAnomaly, SmilePatterns,
    SmilePoint, VolatilitySmile, MAX_SMILE_POINTS, MIN_SMILE_POINTS, OTM_CALL_MONEYNESS,
    OTM_PUT_MONEYNESS, SKEW_THRESHOLD, SMILE_THRESHOLD,
};
use crate::model::OptionType;
use crate::store::ContractRecord;

/// Quoted spread, as a fraction of mid, beyond which a point is questionable
const WIDE_SPREAD_RATIO: f64 = 0.5;
const EXTREME_SKEW: f64 = 0.05;
const POOR_FIT_R_SQUARED: f64 = 0.7;
const POOR_FIT_MIN_POINTS: usize = 5;
const WIDE_RANGE: f64 = 0.10;

/// Groups contract records into smiles
#[derive(Debug, Clone, Copy)]
pub struct SmileBuilder {
    max_smiles: usize,
    max_points: usize,
}

impl SmileBuilder {
    pub fn new(max_smiles: usize) -> Self {
        Self {
            max_smiles,
            max_points: MAX_SMILE_POINTS,
        }
    }

    /// Build and analyze one smile per (underlying, expiry), in first-seen
    /// order. Only valid, converged records contribute.
    pub fn build(&self, records: &[ContractRecord]) -> Vec<VolatilitySmile> {
        let mut smiles: Vec<VolatilitySmile> = Vec::new();

        for record in records {
            if !record.analytics_valid || !record.analytics.iv_converged {
                continue;
            }
            let symbol = &record.symbol;
            let pos = smiles
                .iter()
                .position(|s| s.underlying == symbol.underlying && s.expiry == symbol.expiry);
            let smile = match pos {
                Some(i) => &mut smiles[i],
                None if smiles.len() < self.max_smiles => {
                    let mut smile = VolatilitySmile::new(&symbol.underlying, &symbol.expiry);
                    smile.time_to_expiry = record.time_to_expiry;
                    smile.underlying_price = record.underlying_price;
                    smiles.push(smile);
                    let last = smiles.len() - 1;
                    &mut smiles[last]
                }
                None => continue,
            };
            if smile.points.len() < self.max_points {
                smile.points.push(point_from(record));
            }
        }

        for smile in &mut smiles {
            analyze_smile(smile);
        }
        smiles
    }
}

impl Default for SmileBuilder {
    fn default() -> Self {
        Self::new(crate::store::MAX_CONTRACTS)
    }
}

fn point_from(record: &ContractRecord) -> SmilePoint {
    let quality = match (record.spread(), record.last_quote.and_then(|q| q.mid())) {
        (Some(spread), Some(mid)) if spread > WIDE_SPREAD_RATIO * mid => {
            PointQuality::Questionable
        }
        _ => PointQuality::Good,
    };
    SmilePoint {
        strike: record.symbol.strike,
        implied_vol: record.analytics.implied_vol,
        moneyness: record.moneyness(),
        time_to_expiry: record.time_to_expiry,
        option_type: record.symbol.option_type,
        quality,
    }
}

/// Build smiles with the default limits
pub fn build_smiles(records: &[ContractRecord]) -> Vec<VolatilitySmile> {
    SmileBuilder::default().build(records)
}

/// Derive metrics, pattern flags and anomalies in place
pub fn analyze_smile(smile: &mut VolatilitySmile) {
    smile.put_skew = 0.0;
    smile.call_skew = 0.0;
    smile.curvature = 0.0;
    smile.patterns = SmilePatterns::default();
    smile.anomalies.clear();

    if smile.points.len() < MIN_SMILE_POINTS {
        smile.sufficient_data = false;
        return;
    }
    smile.sufficient_data = true;

    smile.points.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    let vols = smile.points.iter().map(|p| p.implied_vol);
    smile.min_vol = vols.clone().fold(f64::INFINITY, f64::min);
    smile.max_vol = vols.fold(f64::NEG_INFINITY, f64::max);
    smile.atm_vol = atm_vol(&smile.points);
    smile.r_squared = log_moneyness_r_squared(&smile.points);
    smile.curvature = curvature(&smile.points);

    // Last qualifying point in strike order: the OTM put nearest spot, the furthest OTM call
    let otm_put = smile
        .points
        .iter()
        .filter(|p| p.option_type == OptionType::Put && p.moneyness < OTM_PUT_MONEYNESS)
        .last()
        .map(|p| p.implied_vol);
    let otm_call = smile
        .points
        .iter()
        .filter(|p| p.option_type == OptionType::Call && p.moneyness > OTM_CALL_MONEYNESS)
        .last()
        .map(|p| p.implied_vol);

    if smile.atm_vol > 0.0 {
        if let Some(vol) = otm_put {
            smile.put_skew = smile.atm_vol - vol;
        }
        if let Some(vol) = otm_call {
            smile.call_skew = vol - smile.atm_vol;
        }
    }

    smile.patterns = SmilePatterns {
        put_skew: smile.put_skew > SKEW_THRESHOLD,
        call_skew: smile.call_skew > SKEW_THRESHOLD,
        smile: smile.curvature > SMILE_THRESHOLD && smile.max_vol - smile.atm_vol > SMILE_THRESHOLD,
        inverted: smile.curvature < -SMILE_THRESHOLD
            && smile.atm_vol - smile.min_vol > SMILE_THRESHOLD,
    };

    if smile.put_skew.abs() > EXTREME_SKEW || smile.call_skew.abs() > EXTREME_SKEW {
        smile.anomalies.push(SmileAnomaly::ExtremeSkew);
    }
    if smile.patterns.inverted {
        smile.anomalies.push(SmileAnomaly::Inverted);
    }
    if smile.r_squared < POOR_FIT_R_SQUARED && smile.points.len() >= POOR_FIT_MIN_POINTS {
        smile.anomalies.push(SmileAnomaly::PoorFit);
    }
    if smile.max_vol - smile.min_vol > WIDE_RANGE {
        smile.anomalies.push(SmileAnomaly::WideRange);
    }
}
