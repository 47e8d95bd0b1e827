//! Numeric helpers over strike-sorted smile points

use super::SmilePoint;

/// Moneyness distance within which a point is taken as ATM outright
const ATM_TOLERANCE: f64 = 0.01;
/// Scaled variance at or below which the regression is undefined
const DEGENERATE_VARIANCE: f64 = 1e-12;

/// Index of the point closest to moneyness 1.0 (first wins on ties)
pub(crate) fn nearest_atm_index(points: &[SmilePoint]) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, p)| {
            let diff = (p.moneyness - 1.0).abs();
            match best {
                Some((_, best_diff)) if diff >= best_diff => best,
                _ => Some((i, diff)),
            }
        })
        .map(|(i, _)| i)
}

/// ATM vol: the nearest point if within 1% moneyness, otherwise a linear
/// interpolation between its two neighbours, otherwise the nearest point.
/// 0 with fewer than two points.
pub fn atm_vol(points: &[SmilePoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let Some(idx) = nearest_atm_index(points) else {
        return 0.0;
    };
    let best = &points[idx];
    if (best.moneyness - 1.0).abs() < ATM_TOLERANCE {
        return best.implied_vol;
    }

    if idx > 0 && idx < points.len() - 1 {
        let (lo, hi) = (&points[idx - 1], &points[idx + 1]);
        let width = hi.moneyness - lo.moneyness;
        if width > 0.0 {
            let t = (1.0 - lo.moneyness) / width;
            return lo.implied_vol + t * (hi.implied_vol - lo.implied_vol);
        }
    }

    best.implied_vol
}

/// R^2 of a least-squares line of IV against ln(moneyness)
pub fn log_moneyness_r_squared(points: &[SmilePoint]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let (mut sx, mut sy, mut sxy, mut sx2, mut sy2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        if p.moneyness <= 0.0 {
            return 0.0;
        }
        let x = p.moneyness.ln();
        let y = p.implied_vol;
        sx += x;
        sy += y;
        sxy += x * y;
        sx2 += x * x;
        sy2 += y * y;
    }
    let n = points.len() as f64;
    let numerator = n * sxy - sx * sy;
    let denom_x = n * sx2 - sx * sx;
    let denom_y = n * sy2 - sy * sy;
    // Flat IV or a single strike: no line to fit
    if denom_x <= DEGENERATE_VARIANCE || denom_y <= DEGENERATE_VARIANCE {
        return 0.0;
    }
    let r = numerator / (denom_x * denom_y).sqrt();
    r * r
}

/// Second difference of IV in moneyness around the ATM point, using the
/// nearest-ATM index kept one away from either end
pub fn curvature(points: &[SmilePoint]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let Some(atm) = nearest_atm_index(points) else {
        return 0.0;
    };
    let mid = atm.clamp(1, n - 2);
    let (p0, p1, p2) = (&points[mid - 1], &points[mid], &points[mid + 1]);
    let h1 = p1.moneyness - p0.moneyness;
    let h2 = p2.moneyness - p1.moneyness;
    if h1 <= 0.0 || h2 <= 0.0 {
        return 0.0;
    }
    (p2.implied_vol - 2.0 * p1.implied_vol + p0.implied_vol) / (h1 * h2)
}
