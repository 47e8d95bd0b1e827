//! Contract table with rate-limited recompute

use super::{
    Clock, ContractRecord, QuoteInfo, StoreError, SystemClock, TradeInfo, UnderlyingPriceCache,
};
use crate::contract::OptionSymbol;
use crate::model::full_metrics;
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default contract capacity
pub const MAX_CONTRACTS: usize = 100;
/// Default per-contract recompute throttle
pub const RECOMPUTE_THROTTLE: Duration = Duration::from_millis(100);

/// Store tuning
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub max_contracts: usize,
    pub recompute_throttle: Duration,
    pub risk_free_rate: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_contracts: MAX_CONTRACTS,
            recompute_throttle: RECOMPUTE_THROTTLE,
            risk_free_rate: 0.05,
        }
    }
}

/// Why a recompute left analytics invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvalidReason {
    NoUnderlyingPrice,
    BadExpiry,
    Expired,
    NoMarketPrice,
    NotConverged,
    /// Price at or below intrinsic; shown as minimum vol
    IntrinsicFloor,
}

/// What happened to a contract's analytics on an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecomputeOutcome {
    /// Within the throttle window; previous analytics kept
    Throttled,
    /// Analytics cleared
    Invalid(InvalidReason),
    /// Fresh, valid analytics
    Computed,
}

/// Point-in-time store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub contracts: usize,
    pub valid_analytics: usize,
    pub recomputes: u64,
    pub throttled: u64,
    pub rejected: u64,
}

#[derive(Default)]
struct Table {
    records: Vec<ContractRecord>,
    index: HashMap<String, usize>,
}

/// The shared contract table. One lock covers the whole table; readers
/// copy a snapshot out and release it before doing heavier work.
pub struct AnalyticsStore {
    table: RwLock<Table>,
    prices: Arc<UnderlyingPriceCache>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    recomputes: AtomicU64,
    throttled: AtomicU64,
    rejected: AtomicU64,
}

impl AnalyticsStore {
    pub fn new(config: StoreConfig, prices: Arc<UnderlyingPriceCache>) -> Self {
        Self::with_clock(config, prices, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: StoreConfig,
        prices: Arc<UnderlyingPriceCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            prices,
            clock,
            config,
            recomputes: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn prices(&self) -> &Arc<UnderlyingPriceCache> {
        &self.prices
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Index of the record for `symbol`, inserting at the first free slot.
    /// Nothing is mutated on error.
    fn find_or_create(&self, table: &mut Table, symbol: &str) -> Result<usize, StoreError> {
        if let Some(&idx) = table.index.get(symbol) {
            return Ok(idx);
        }
        let parsed = OptionSymbol::parse(symbol)?;
        if table.records.len() >= self.config.max_contracts {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            telemetry::increment(CounterMetric::CapacityRejections);
            warn!(
                symbol,
                max = self.config.max_contracts,
                "Contract table full, rejecting symbol"
            );
            return Err(StoreError::CapacityExceeded(self.config.max_contracts));
        }
        let idx = table.records.len();
        table.records.push(ContractRecord::new(parsed));
        table.index.insert(symbol.to_string(), idx);
        debug!(symbol, slot = idx, "Tracking new contract");
        Ok(idx)
    }

    /// Start tracking a symbol before any tick arrives
    pub fn register(&self, symbol: &str) -> Result<(), StoreError> {
        let mut table = self.table.write();
        self.find_or_create(&mut table, symbol).map(|_| ())
    }

    /// Apply a trade and recompute (rate limited)
    pub fn apply_trade(
        &self,
        symbol: &str,
        price: f64,
        size: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<RecomputeOutcome, StoreError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(StoreError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            });
        }
        let mut table = self.table.write();
        let idx = self.find_or_create(&mut table, symbol)?;
        let record = &mut table.records[idx];
        record.last_trade = Some(TradeInfo {
            price,
            size,
            timestamp,
        });
        record.last_update = Some(timestamp);
        Ok(self.recompute_record(record))
    }

    /// Apply a quote and recompute (rate limited)
    pub fn apply_quote(
        &self,
        symbol: &str,
        bid: f64,
        bid_size: u64,
        ask: f64,
        ask_size: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<RecomputeOutcome, StoreError> {
        for price in [bid, ask] {
            if !price.is_finite() || price < 0.0 {
                return Err(StoreError::InvalidPrice {
                    symbol: symbol.to_string(),
                    price,
                });
            }
        }
        let mut table = self.table.write();
        let idx = self.find_or_create(&mut table, symbol)?;
        let record = &mut table.records[idx];
        record.last_quote = Some(QuoteInfo {
            bid,
            bid_size,
            ask,
            ask_size,
            timestamp,
        });
        record.last_update = Some(timestamp);
        Ok(self.recompute_record(record))
    }

    /// Recompute one contract outside of a tick (still rate limited)
    pub fn recompute(&self, symbol: &str) -> Option<RecomputeOutcome> {
        let mut table = self.table.write();
        let idx = *table.index.get(symbol)?;
        let record = &mut table.records[idx];
        Some(self.recompute_record(record))
    }

    fn recompute_record(&self, record: &mut ContractRecord) -> RecomputeOutcome {
        let now = self.clock.now();
        if let Some(last) = record.last_recompute {
            if now.saturating_duration_since(last) < self.config.recompute_throttle {
                self.throttled.fetch_add(1, Ordering::Relaxed);
                telemetry::increment(CounterMetric::RecomputesThrottled);
                return RecomputeOutcome::Throttled;
            }
        }
        record.last_recompute = Some(now);

        let outcome = self.evaluate(record);
        if let RecomputeOutcome::Invalid(reason) = outcome {
            record.analytics_valid = false;
            debug!(symbol = %record.symbol, ?reason, "Analytics not available");
        }
        outcome
    }

    fn evaluate(&self, record: &mut ContractRecord) -> RecomputeOutcome {
        let Some(spot) = self.prices.get(&record.symbol.underlying) else {
            return RecomputeOutcome::Invalid(InvalidReason::NoUnderlyingPrice);
        };
        let time = match record.symbol.time_to_expiry(self.clock.wall()) {
            Ok(t) if t > 0.0 => t,
            Ok(_) => return RecomputeOutcome::Invalid(InvalidReason::Expired),
            Err(_) => return RecomputeOutcome::Invalid(InvalidReason::BadExpiry),
        };
        let Some(market_price) = record.market_price() else {
            return RecomputeOutcome::Invalid(InvalidReason::NoMarketPrice);
        };

        let started = Instant::now();
        let analytics = full_metrics(
            spot,
            record.symbol.strike,
            time,
            self.config.risk_free_rate,
            market_price,
            record.symbol.option_type,
        );
        telemetry::record_latency(LatencyMetric::Recompute, started.elapsed());

        if record.analytics_valid {
            record.previous = Some(record.snapshot());
        }
        record.underlying_price = spot;
        record.time_to_expiry = time;
        record.analytics = analytics;
        record.recompute_count += 1;
        self.recomputes.fetch_add(1, Ordering::Relaxed);
        telemetry::increment(CounterMetric::Recomputes);

        if analytics.iv_converged {
            record.analytics_valid = true;
            RecomputeOutcome::Computed
        } else if analytics.at_intrinsic_floor {
            RecomputeOutcome::Invalid(InvalidReason::IntrinsicFloor)
        } else {
            RecomputeOutcome::Invalid(InvalidReason::NotConverged)
        }
    }

    /// Copy of one record
    pub fn get(&self, symbol: &str) -> Option<ContractRecord> {
        let table = self.table.read();
        table.index.get(symbol).map(|&idx| table.records[idx].clone())
    }

    /// Copy of every record in insertion order
    pub fn snapshot(&self) -> Vec<ContractRecord> {
        self.table.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.table.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let table = self.table.read();
        StoreStats {
            contracts: table.records.len(),
            valid_analytics: table.records.iter().filter(|r| r.analytics_valid).count(),
            recomputes: self.recomputes.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
