//! Annualized realized volatility estimators
//!
//! Each estimator needs at least [`MIN_VALID_PERIODS`] usable observations
//! and returns 0 otherwise. Bars are expected oldest first wherever the
//! previous close matters.

use super::{OhlcBar, MIN_VALID_PERIODS, TRADING_DAYS_PER_YEAR};
use std::f64::consts::LN_2;

fn annualize(sum: f64, periods: usize) -> f64 {
    if periods < MIN_VALID_PERIODS {
        return 0.0;
    }
    (sum / periods as f64 * TRADING_DAYS_PER_YEAR).max(0.0).sqrt()
}

/// Parkinson high-low range estimator: sqrt(252 * mean(ln(H/L)^2) / (4 ln 2))
pub fn parkinson(bars: &[OhlcBar]) -> f64 {
    let (sum, periods) = bars
        .iter()
        .filter(|b| b.high > 0.0 && b.low > 0.0 && b.high >= b.low)
        .fold((0.0, 0usize), |(sum, n), b| {
            let range = (b.high / b.low).ln();
            (sum + range * range, n + 1)
        });
    annualize(sum / (4.0 * LN_2), periods)
}

/// Garman-Klass with an overnight gap term against the previous close
pub fn garman_klass(bars: &[OhlcBar]) -> f64 {
    let k = 2.0 * LN_2 - 1.0;
    let (sum, periods) = bars
        .windows(2)
        .filter(|w| {
            let (prev, b) = (&w[0], &w[1]);
            prev.close > 0.0 && b.open > 0.0 && b.high > 0.0 && b.low > 0.0 && b.close > 0.0
        })
        .fold((0.0, 0usize), |(sum, n), w| {
            let (prev, b) = (&w[0], &w[1]);
            let gap = (b.open / prev.close).ln();
            let h_o = (b.high / b.open).ln();
            let l_o = (b.low / b.open).ln();
            let h_c = (b.high / b.close).ln();
            let l_c = (b.low / b.close).ln();
            let term = gap * gap + 0.5 * (h_o * h_o + l_o * l_o) - k * (h_c * h_c + l_c * l_c);
            (sum + term, n + 1)
        });
    annualize(sum, periods)
}

/// Classic close-to-close: sqrt(252 * mean(ln(C_i / C_{i-1})^2))
pub fn close_to_close(bars: &[OhlcBar]) -> f64 {
    let (sum, periods) = bars
        .windows(2)
        .filter(|w| w[0].close > 0.0 && w[1].close > 0.0)
        .fold((0.0, 0usize), |(sum, n), w| {
            let r = (w[1].close / w[0].close).ln();
            (sum + r * r, n + 1)
        });
    annualize(sum, periods)
}
