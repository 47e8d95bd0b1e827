//! Per-contract dislocation checks

use super::{recommend, DislocationAlert, DislocationFlags, SmileContext};
use crate::model::OptionType;
use crate::smile::VolatilitySmile;
use crate::store::ContractRecord;
use crate::volatility::{analyze_iv_vs_rv, IvRvSignal, RvMetrics};
use std::collections::HashMap;

/// Limits applied to raw (unscaled) Greeks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DislocationThresholds {
    pub max_vanna: f64,
    /// Typical volga; high above 2x, low below 0.1x
    pub volga_baseline: f64,
    pub max_charm: f64,
    /// Years below which low volga and positive charm are expected
    pub near_expiry: f64,
    pub min_vanna_volga_ratio: f64,
    pub max_vanna_volga_ratio: f64,
    /// Volga magnitude below which the ratio is not computed
    pub ratio_volga_floor: f64,
}

impl Default for DislocationThresholds {
    fn default() -> Self {
        Self {
            max_vanna: 2.0,
            volga_baseline: 20.0,
            max_charm: 200.0,
            near_expiry: 0.02,
            min_vanna_volga_ratio: 0.05,
            max_vanna_volga_ratio: 0.5,
            ratio_volga_floor: 0.001,
        }
    }
}

/// Runs the dislocation checks over contract snapshots
#[derive(Debug, Clone, Default)]
pub struct DislocationAnalyzer {
    thresholds: DislocationThresholds,
}

impl DislocationAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: DislocationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &DislocationThresholds {
        &self.thresholds
    }

    /// Analyze every record, matching each to its smile and RV metrics
    pub fn analyze_all(
        &self,
        records: &[ContractRecord],
        smiles: &[VolatilitySmile],
        realized: &HashMap<String, RvMetrics>,
    ) -> Vec<DislocationAlert> {
        records
            .iter()
            .filter_map(|record| {
                let smile = smiles.iter().find(|s| {
                    s.underlying == record.symbol.underlying && s.expiry == record.symbol.expiry
                });
                let rv = realized.get(&record.symbol.underlying);
                self.analyze(record, smile, rv)
            })
            .collect()
    }

    /// Alert for one contract, or None when it has no valid analytics or
    /// nothing looks out of line
    pub fn analyze(
        &self,
        record: &ContractRecord,
        smile: Option<&VolatilitySmile>,
        rv: Option<&RvMetrics>,
    ) -> Option<DislocationAlert> {
        if !record.analytics_valid || !record.analytics.iv_converged {
            return None;
        }

        let t = &self.thresholds;
        let greeks = &record.analytics.greeks;
        let spot = record.underlying_price;
        let strike = record.symbol.strike;
        let mut flags = DislocationFlags::default();
        let mut messages = Vec::new();

        // Vanna: positive when ITM, negative when OTM
        let expected_vanna_sign = match record.symbol.option_type {
            OptionType::Call if spot > strike => 1.0,
            OptionType::Put if spot < strike => 1.0,
            _ => -1.0,
        };
        let wrong_vanna = greeks.vanna * expected_vanna_sign < 0.0;
        let high_vanna = greeks.vanna.abs() > t.max_vanna;
        if wrong_vanna {
            messages.push("VANNA SIGN INVERSION".to_string());
        }
        if high_vanna {
            messages.push(format!("HIGH VANNA {:.3}", greeks.vanna.abs()));
        }
        flags.vanna = wrong_vanna || high_vanna;

        let volga = greeks.volga.abs();
        let high_volga = volga > 2.0 * t.volga_baseline;
        let low_volga = volga < 0.1 * t.volga_baseline && record.time_to_expiry > t.near_expiry;
        if high_volga {
            messages.push(format!("HIGH VOLGA {:.1}", volga));
        }
        if low_volga {
            messages.push(format!("LOW VOLGA {:.1}", volga));
        }
        flags.volga = high_volga || low_volga;

        let positive_charm = greeks.charm > 0.0 && record.time_to_expiry > t.near_expiry;
        let high_charm = greeks.charm.abs() > t.max_charm;
        if positive_charm {
            messages.push(format!("POSITIVE CHARM {:.1}", greeks.charm * 365.0));
        }
        if high_charm {
            messages.push(format!("HIGH CHARM {:.1}", greeks.charm.abs() * 365.0));
        }
        flags.charm = positive_charm || high_charm;

        let vanna_volga_ratio =
            (volga > t.ratio_volga_floor).then(|| (greeks.vanna / greeks.volga).abs());
        if let Some(ratio) = vanna_volga_ratio {
            if ratio < t.min_vanna_volga_ratio || ratio > t.max_vanna_volga_ratio {
                flags.vanna_volga = true;
                messages.push(format!("VANNA/VOLGA {:.3}", ratio));
            }
        }

        let iv_rv = rv.and_then(|rv| {
            analyze_iv_vs_rv(record.analytics.implied_vol, rv, record.days_to_expiry())
        });
        if let Some(analysis) = &iv_rv {
            if analysis.signal != IvRvSignal::Neutral {
                flags.iv_rv = true;
                messages.push(format!(
                    "IV-RV: {:+.1}% ({})",
                    analysis.spread * 100.0,
                    analysis.signal
                ));
            }
        }

        if !flags.any() {
            return None;
        }

        let smile_context = smile.filter(|s| s.sufficient_data).map(|s| SmileContext {
            atm_vol: s.atm_vol,
            skew: s.skew(),
            iv_vs_atm: record.analytics.implied_vol - s.atm_vol,
        });

        let recommendations = recommend(record, &flags, vanna_volga_ratio, iv_rv.as_ref());

        Some(DislocationAlert {
            symbol: record.symbol.raw.clone(),
            description: record.symbol.readable(),
            flags,
            vanna_volga_ratio,
            iv_rv,
            smile: smile_context,
            messages,
            recommendations,
        })
    }
}
