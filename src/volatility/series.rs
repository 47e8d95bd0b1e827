//! Per-underlying realized volatility series

use super::{
    close_to_close, garman_klass, parkinson, BarError, OhlcBar, OhlcRing, DEFAULT_HISTORY_WINDOW,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bars needed before rolling 20-day statistics are computed
const STATS_MIN_BARS: usize = 60;
/// Number of rolling 20-day windows sampled for the statistics
const STATS_WINDOWS: usize = 40;
/// Rolling samples needed for a meaningful mean/std
const STATS_MIN_SAMPLES: usize = 10;

/// Derived realized vol figures, all annualized; 0 means not enough data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RvMetrics {
    pub rv_10d: f64,
    pub rv_20d: f64,
    pub rv_30d: f64,
    /// (rv_10d - rv_20d) / rv_20d; positive when vol is picking up
    pub trend: f64,
    /// Mean of rolling 20-day RV
    pub mean: f64,
    /// Population std of rolling 20-day RV
    pub std: f64,
}

impl RvMetrics {
    /// Realized vol best matched to an option's remaining life
    pub fn relevant_rv(&self, days_to_expiry: f64) -> f64 {
        if days_to_expiry < 15.0 && self.rv_10d > 0.0 {
            self.rv_10d
        } else if days_to_expiry > 45.0 && self.rv_30d > 0.0 {
            self.rv_30d
        } else {
            self.rv_20d
        }
    }

    pub fn has_statistics(&self) -> bool {
        self.mean > 0.0 && self.std > 0.0
    }
}

/// One underlying's OHLC history plus the metrics derived from it
#[derive(Debug, Clone)]
pub struct RealizedVolSeries {
    underlying: String,
    bars: OhlcRing,
    metrics: RvMetrics,
    last_update: Option<DateTime<Utc>>,
}

impl RealizedVolSeries {
    pub fn new(underlying: impl Into<String>) -> Self {
        Self::with_window(underlying, DEFAULT_HISTORY_WINDOW)
    }

    pub fn with_window(underlying: impl Into<String>, window: usize) -> Self {
        Self {
            underlying: underlying.into(),
            bars: OhlcRing::new(window),
            metrics: RvMetrics::default(),
            last_update: None,
        }
    }

    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    pub fn metrics(&self) -> RvMetrics {
        self.metrics
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Validate and append a bar, then recompute every metric.
    /// A rejected bar leaves history and metrics untouched.
    pub fn append_bar(&mut self, bar: OhlcBar) -> Result<RvMetrics, BarError> {
        self.bars.push(bar)?;
        self.last_update = Some(bar.timestamp);
        self.recompute();
        Ok(self.metrics)
    }

    /// Close-to-close RV over the most recent `periods` bars
    pub fn close_to_close(&self, periods: usize) -> f64 {
        close_to_close(&self.bars.chronological_tail(periods))
    }

    /// Garman-Klass RV over the most recent `periods` bars
    pub fn garman_klass(&self, periods: usize) -> f64 {
        garman_klass(&self.bars.chronological_tail(periods))
    }

    fn recompute(&mut self) {
        let recent = self.bars.recent_first();
        let n = recent.len();
        let window = |len: usize| {
            if n >= len {
                parkinson(&recent[..len])
            } else {
                0.0
            }
        };

        let mut metrics = RvMetrics {
            rv_10d: window(10),
            rv_20d: window(20),
            rv_30d: window(30),
            ..RvMetrics::default()
        };

        if metrics.rv_10d > 0.0 && metrics.rv_20d > 0.0 {
            metrics.trend = (metrics.rv_10d - metrics.rv_20d) / metrics.rv_20d;
        }

        if n >= STATS_MIN_BARS {
            let samples: Vec<f64> = (0..STATS_WINDOWS)
                .take_while(|i| i + 20 < n)
                .map(|i| parkinson(&recent[i..i + 20]))
                .filter(|rv| *rv > 0.0)
                .collect();

            if samples.len() > STATS_MIN_SAMPLES {
                let count = samples.len() as f64;
                let mean = samples.iter().sum::<f64>() / count;
                let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
                metrics.mean = mean;
                metrics.std = variance.sqrt();
            }
        }

        self.metrics = metrics;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bars whose high/low range cycles so rolling windows differ
    fn varied_bars(n: usize) -> Vec<OhlcBar> {
        (0..n)
            .map(|i| {
                let c = 400.0 + (i as f64 * 0.3).sin() * 5.0;
                let range = 0.005 + 0.004 * ((i as f64) * 0.17).cos().abs();
                OhlcBar::new(c, c * (1.0 + range), c * (1.0 - range), c)
            })
            .collect()
    }

    #[test]
    fn test_metrics_appear_as_history_grows() {
        let mut series = RealizedVolSeries::new("QQQ");
        let bars = varied_bars(30);
        for bar in &bars[..9] {
            series.append_bar(*bar).unwrap();
        }
        assert_eq!(series.metrics().rv_10d, 0.0);

        series.append_bar(bars[9]).unwrap();
        assert!(series.metrics().rv_10d > 0.0);
        assert_eq!(series.metrics().rv_20d, 0.0);

        for bar in &bars[10..] {
            series.append_bar(*bar).unwrap();
        }
        let m = series.metrics();
        assert!(m.rv_20d > 0.0 && m.rv_30d > 0.0);
        assert!((m.trend - (m.rv_10d - m.rv_20d) / m.rv_20d).abs() < 1e-12);
        assert_eq!(m.mean, 0.0);
    }

    #[test]
    fn test_rolling_statistics_need_sixty_bars() {
        let mut series = RealizedVolSeries::new("SPY");
        let bars = varied_bars(60);
        for bar in &bars[..59] {
            series.append_bar(*bar).unwrap();
        }
        assert!(!series.metrics().has_statistics());
        series.append_bar(bars[59]).unwrap();
        let m = series.metrics();
        assert!(m.has_statistics());
        assert!(m.mean > 0.0 && m.std > 0.0);
    }

    #[test]
    fn test_rejected_bar_leaves_metrics_unchanged() {
        let mut series = RealizedVolSeries::new("IWM");
        for bar in varied_bars(25) {
            series.append_bar(bar).unwrap();
        }
        let before = series.metrics();
        let len = series.len();
        let result = series.append_bar(OhlcBar::new(200.0, 195.0, 205.0, 200.0));
        assert!(matches!(result, Err(BarError::HighBelowLow { .. })));
        assert_eq!(series.metrics(), before);
        assert_eq!(series.len(), len);
    }

    #[test]
    fn test_window_caps_history() {
        let mut series = RealizedVolSeries::with_window("DIA", 20);
        for bar in varied_bars(50) {
            series.append_bar(bar).unwrap();
        }
        assert_eq!(series.len(), 20);
        assert_eq!(series.metrics().rv_30d, 0.0);
    }

    #[test]
    fn test_relevant_rv_by_horizon() {
        let m = RvMetrics {
            rv_10d: 0.10,
            rv_20d: 0.20,
            rv_30d: 0.30,
            ..Default::default()
        };
        assert_eq!(m.relevant_rv(7.0), 0.10);
        assert_eq!(m.relevant_rv(30.0), 0.20);
        assert_eq!(m.relevant_rv(60.0), 0.30);
        let short_only = RvMetrics {
            rv_20d: 0.2,
            ..Default::default()
        };
        assert_eq!(short_only.relevant_rv(7.0), 0.2);
    }

    #[test]
    fn test_close_to_close_and_gk_on_series() {
        let mut series = RealizedVolSeries::new("QQQ");
        for bar in varied_bars(30) {
            series.append_bar(bar).unwrap();
        }
        assert!(series.close_to_close(20) > 0.0);
        assert!(series.garman_klass(20) >= 0.0);
        assert_eq!(series.close_to_close(4), 0.0);
    }
}
