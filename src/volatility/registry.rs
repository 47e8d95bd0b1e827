//! Realized vol series for every underlying in play

use super::{
    analyze_iv_vs_rv, BarError, IvRvAnalysis, OhlcBar, RealizedVolSeries, RvMetrics,
    DEFAULT_HISTORY_WINDOW,
};
use crate::telemetry::{self, CounterMetric};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default limit on distinct underlyings
pub const DEFAULT_MAX_UNDERLYINGS: usize = 50;

/// Thread-safe map of underlying to its realized vol series
pub struct RealizedVolRegistry {
    series: RwLock<HashMap<String, RealizedVolSeries>>,
    max_underlyings: usize,
    window: usize,
}

impl RealizedVolRegistry {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_UNDERLYINGS, DEFAULT_HISTORY_WINDOW)
    }

    pub fn with_limits(max_underlyings: usize, window: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            max_underlyings,
            window,
        }
    }

    /// Append one bar, creating the series on first use
    pub fn append_bar(&self, underlying: &str, bar: OhlcBar) -> Result<RvMetrics, BarError> {
        let mut series = self.series.write();
        if !series.contains_key(underlying) {
            if series.len() >= self.max_underlyings {
                warn!(
                    underlying,
                    max = self.max_underlyings,
                    "Realized vol registry full, rejecting underlying"
                );
                return Err(BarError::RegistryFull(self.max_underlyings));
            }
            series.insert(
                underlying.to_string(),
                RealizedVolSeries::with_window(underlying, self.window),
            );
        }

        match series.get_mut(underlying) {
            Some(s) => s.append_bar(bar),
            None => Err(BarError::RegistryFull(self.max_underlyings)),
        }
    }

    /// Pre-populate history before streaming starts. Invalid bars are
    /// skipped; returns how many were accepted.
    pub fn seed_bars(&self, underlying: &str, bars: &[OhlcBar]) -> Result<usize, BarError> {
        let mut accepted = 0;
        for bar in bars {
            match self.append_bar(underlying, *bar) {
                Ok(_) => accepted += 1,
                Err(BarError::RegistryFull(max)) => return Err(BarError::RegistryFull(max)),
                Err(e) => {
                    debug!(underlying, error = %e, "Skipping invalid seed bar");
                    telemetry::increment(CounterMetric::BarsRejected);
                }
            }
        }
        debug!(underlying, accepted, offered = bars.len(), "Seeded realized vol history");
        Ok(accepted)
    }

    pub fn metrics(&self, underlying: &str) -> Option<RvMetrics> {
        self.series.read().get(underlying).map(|s| s.metrics())
    }

    /// IV-vs-RV analysis against this underlying's current metrics
    pub fn analyze(
        &self,
        underlying: &str,
        implied_vol: f64,
        days_to_expiry: f64,
    ) -> Option<IvRvAnalysis> {
        let metrics = self.metrics(underlying)?;
        analyze_iv_vs_rv(implied_vol, &metrics, days_to_expiry)
    }

    /// Copy of every underlying's metrics
    pub fn snapshot(&self) -> HashMap<String, RvMetrics> {
        self.series
            .read()
            .iter()
            .map(|(k, s)| (k.clone(), s.metrics()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }
}

impl Default for RealizedVolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(n: usize) -> Vec<OhlcBar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.1;
                OhlcBar::new(c, c * 1.01, c * 0.99, c)
            })
            .collect()
    }

    #[test]
    fn test_seed_and_lookup() {
        let registry = RealizedVolRegistry::new();
        let accepted = registry.seed_bars("QQQ", &bars(30)).unwrap();
        assert_eq!(accepted, 30);
        let m = registry.metrics("QQQ").unwrap();
        assert!(m.rv_20d > 0.0);
        assert!(registry.metrics("SPY").is_none());
    }

    #[test]
    fn test_seed_skips_invalid_bars() {
        let registry = RealizedVolRegistry::new();
        let mut input = bars(10);
        input.push(OhlcBar::new(100.0, 90.0, 110.0, 100.0));
        assert_eq!(registry.seed_bars("QQQ", &input).unwrap(), 10);
    }

    #[test]
    fn test_capacity_rejects_new_underlying() {
        let registry = RealizedVolRegistry::with_limits(1, 252);
        registry.seed_bars("QQQ", &bars(5)).unwrap();
        assert!(matches!(
            registry.seed_bars("SPY", &bars(5)),
            Err(BarError::RegistryFull(1))
        ));
        assert_eq!(registry.len(), 1);
        // Existing underlying still accepts bars
        assert!(registry.append_bar("QQQ", bars(1)[0]).is_ok());
    }

    #[test]
    fn test_analyze_requires_history() {
        let registry = RealizedVolRegistry::new();
        registry.seed_bars("QQQ", &bars(5)).unwrap();
        assert!(registry.analyze("QQQ", 0.25, 30.0).is_none());
        registry.seed_bars("QQQ", &bars(25)).unwrap();
        assert!(registry.analyze("QQQ", 0.25, 30.0).is_some());
    }
}
