//! OHLC bars and the bounded history that holds them

use super::BarError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One daily bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub timestamp: DateTime<Utc>,
}

impl OhlcBar {
    /// Bar stamped with the current time
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self::at(open, high, low, close, Utc::now())
    }

    pub fn at(open: f64, high: f64, low: f64, close: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            open,
            high,
            low,
            close,
            timestamp,
        }
    }

    /// Check price positivity and high/low ordering against the body
    pub fn validate(&self) -> Result<(), BarError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(BarError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }
        if self.high < self.low {
            return Err(BarError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }
        if self.high < self.open || self.high < self.close {
            return Err(BarError::HighBelowBody { high: self.high });
        }
        if self.low > self.open || self.low > self.close {
            return Err(BarError::LowAboveBody { low: self.low });
        }
        Ok(())
    }
}

/// Fixed-capacity circular history; the oldest bar is overwritten once full
#[derive(Debug, Clone)]
pub struct OhlcRing {
    bars: VecDeque<OhlcBar>,
    capacity: usize,
}

impl OhlcRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Validate and store a bar
    pub fn push(&mut self, bar: OhlcBar) -> Result<(), BarError> {
        bar.validate()?;
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&OhlcBar> {
        self.bars.back()
    }

    /// Most recent bar first
    pub fn recent_first(&self) -> Vec<OhlcBar> {
        self.bars.iter().rev().copied().collect()
    }

    /// The last `n` bars, oldest first
    pub fn chronological_tail(&self, n: usize) -> Vec<OhlcBar> {
        let skip = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(skip).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: f64) -> OhlcBar {
        OhlcBar::new(close, close * 1.01, close * 0.99, close)
    }

    #[test]
    fn test_validate_rejects_bad_bars() {
        assert!(matches!(
            OhlcBar::new(100.0, 99.0, 101.0, 100.0).validate(),
            Err(BarError::HighBelowLow { .. })
        ));
        assert!(matches!(
            OhlcBar::new(100.0, 100.5, 99.0, 101.0).validate(),
            Err(BarError::HighBelowBody { .. })
        ));
        assert!(matches!(
            OhlcBar::new(100.0, 102.0, 100.5, 101.0).validate(),
            Err(BarError::LowAboveBody { .. })
        ));
        assert!(matches!(
            OhlcBar::new(0.0, 102.0, 99.0, 101.0).validate(),
            Err(BarError::NonPositivePrice { .. })
        ));
        assert!(OhlcBar::new(100.0, 102.0, 99.0, 101.0).validate().is_ok());
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut ring = OhlcRing::new(3);
        for close in [10.0, 11.0, 12.0, 13.0] {
            ring.push(bar(close)).unwrap();
        }
        assert_eq!(ring.len(), 3);
        let recent: Vec<f64> = ring.recent_first().iter().map(|b| b.close).collect();
        assert_eq!(recent, vec![13.0, 12.0, 11.0]);
        let tail: Vec<f64> = ring.chronological_tail(2).iter().map(|b| b.close).collect();
        assert_eq!(tail, vec![12.0, 13.0]);
    }

    #[test]
    fn test_rejected_bar_not_stored() {
        let mut ring = OhlcRing::new(5);
        ring.push(bar(10.0)).unwrap();
        assert!(ring.push(OhlcBar::new(10.0, 9.0, 11.0, 10.0)).is_err());
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.latest().map(|b| b.close), Some(10.0));
    }
}
