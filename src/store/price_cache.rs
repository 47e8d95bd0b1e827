//! Underlying spot prices, one lock per entry

use super::StoreError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Default limit on distinct underlyings
pub const MAX_UNDERLYINGS: usize = 50;

/// Latest known price of one underlying
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnderlyingPrice {
    pub symbol: String,
    /// Last trade, 0 until one arrives
    pub last_trade: f64,
    /// Last quote sides, 0 until one arrives
    pub bid: f64,
    pub ask: f64,
    /// Last quote mid, 0 until one arrives
    pub last_mid: f64,
    pub timestamp: Option<DateTime<Utc>>,
    pub valid: bool,
}

impl UnderlyingPrice {
    /// Trade price wins; the quote mid is used only until a trade prints
    pub fn price(&self) -> f64 {
        if self.last_trade > 0.0 {
            self.last_trade
        } else {
            self.last_mid
        }
    }
}

type Entry = Arc<RwLock<UnderlyingPrice>>;

/// Spot cache shared by the ingestion (writer) and analytics (reader) paths
pub struct UnderlyingPriceCache {
    entries: RwLock<HashMap<String, Entry>>,
    capacity: usize,
}

impl UnderlyingPriceCache {
    pub fn new() -> Self {
        Self::with_capacity(MAX_UNDERLYINGS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    fn entry(&self, symbol: &str) -> Result<Entry, StoreError> {
        if let Some(entry) = self.entries.read().get(symbol) {
            return Ok(Arc::clone(entry));
        }

        let mut entries = self.entries.write();
        // Another writer may have created it between the two locks
        if let Some(entry) = entries.get(symbol) {
            return Ok(Arc::clone(entry));
        }
        if entries.len() >= self.capacity {
            return Err(StoreError::PriceCacheFull(self.capacity));
        }
        let entry = Arc::new(RwLock::new(UnderlyingPrice {
            symbol: symbol.to_string(),
            ..Default::default()
        }));
        entries.insert(symbol.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Record an underlying trade
    pub fn update_trade(
        &self,
        symbol: &str,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(StoreError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            });
        }
        let entry = self.entry(symbol)?;
        let mut e = entry.write();
        e.last_trade = price;
        e.timestamp = Some(timestamp);
        e.valid = true;
        Ok(())
    }

    /// Record an underlying quote mid
    pub fn update_quote_mid(
        &self,
        symbol: &str,
        mid: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if !mid.is_finite() || mid <= 0.0 {
            return Err(StoreError::InvalidPrice {
                symbol: symbol.to_string(),
                price: mid,
            });
        }
        let entry = self.entry(symbol)?;
        let mut e = entry.write();
        e.last_mid = mid;
        if e.last_trade <= 0.0 {
            e.timestamp = Some(timestamp);
        }
        e.valid = true;
        Ok(())
    }

    /// Record a two-sided underlying quote; the mid feeds the price
    pub fn update_quote(
        &self,
        symbol: &str,
        bid: f64,
        ask: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        for side in [bid, ask] {
            if !side.is_finite() || side <= 0.0 {
                return Err(StoreError::InvalidPrice {
                    symbol: symbol.to_string(),
                    price: side,
                });
            }
        }
        self.update_quote_mid(symbol, (bid + ask) / 2.0, timestamp)?;
        if let Some(entry) = self.entries.read().get(symbol) {
            let mut e = entry.write();
            e.bid = bid;
            e.ask = ask;
        }
        Ok(())
    }

    /// Current price, or None when unknown
    pub fn get(&self, symbol: &str) -> Option<f64> {
        let entry = self.entries.read().get(symbol).cloned()?;
        let e = entry.read();
        (e.valid && e.price() > 0.0).then(|| e.price())
    }

    pub fn snapshot(&self) -> Vec<UnderlyingPrice> {
        let entries: Vec<Entry> = self.entries.read().values().cloned().collect();
        let mut out: Vec<UnderlyingPrice> = entries.iter().map(|e| e.read().clone()).collect();
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        out
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for UnderlyingPriceCache {
    fn default() -> Self {
        Self::new()
    }
}
