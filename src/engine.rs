//! Analytics engine
//!
//! Owns the contract store, the underlying price cache and the
//! realized-vol registry. Ticks arrive through [`TickSink`]; smiles,
//! term structures and dislocation alerts are produced on demand by
//! [`AnalyticsEngine::run_analysis_cycle`] from a snapshot of the store.

use crate::config::AnalyticsConfig;
use crate::dislocation::{DislocationAlert, DislocationAnalyzer};
use crate::feed::TickEvent;
use crate::smile::{term_structures, SmileBuilder, TermStructure, VolatilitySmile};
use crate::store::{
    AnalyticsStore, Clock, ContractRecord, RecomputeOutcome, StoreConfig, StoreError, StoreStats,
    SystemClock, UnderlyingPriceCache,
};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use crate::volatility::{BarError, OhlcBar, RealizedVolRegistry, RvMetrics};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Push interface for the ingestion side. Implementations never panic
/// and never return errors to the transport.
pub trait TickSink: Send + Sync {
    fn on_trade(&self, symbol: &str, price: f64, size: u64, timestamp: DateTime<Utc>);

    fn on_quote(
        &self,
        symbol: &str,
        bid: f64,
        bid_size: u64,
        ask: f64,
        ask_size: u64,
        timestamp: DateTime<Utc>,
    );

    fn on_underlying_trade(&self, symbol: &str, price: f64, timestamp: DateTime<Utc>);

    fn on_underlying_quote_mid(&self, symbol: &str, mid: f64);

    /// Two-sided quote; the cache keeps both sides and derives the mid
    fn on_underlying_quote(&self, symbol: &str, bid: f64, ask: f64);
}

/// Output of one analysis cycle
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub cycle_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub contracts: usize,
    pub valid_contracts: usize,
    pub smiles: Vec<VolatilitySmile>,
    pub term_structures: Vec<TermStructure>,
    pub alerts: Vec<DislocationAlert>,
}

impl AnalysisReport {
    pub fn anomalous_smiles(&self) -> impl Iterator<Item = &VolatilitySmile> {
        self.smiles.iter().filter(|s| s.is_anomalous())
    }
}

/// Shared analytics state; wrap in `Arc` and hand to every ingestion task
pub struct AnalyticsEngine {
    prices: Arc<UnderlyingPriceCache>,
    store: AnalyticsStore,
    realized: RealizedVolRegistry,
    smiles: SmileBuilder,
    dislocations: DislocationAnalyzer,
}

impl AnalyticsEngine {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AnalyticsConfig, clock: Arc<dyn Clock>) -> Self {
        let prices = Arc::new(UnderlyingPriceCache::with_capacity(config.max_underlyings));
        let store_config = StoreConfig {
            max_contracts: config.max_contracts,
            recompute_throttle: config.recompute_throttle(),
            risk_free_rate: config.risk_free_rate,
        };
        Self {
            store: AnalyticsStore::with_clock(store_config, Arc::clone(&prices), clock),
            prices,
            realized: RealizedVolRegistry::with_limits(
                config.max_underlyings,
                config.history_window,
            ),
            smiles: SmileBuilder::new(config.max_contracts),
            dislocations: DislocationAnalyzer::new(),
        }
    }

    pub fn store(&self) -> &AnalyticsStore {
        &self.store
    }

    pub fn prices(&self) -> &UnderlyingPriceCache {
        &self.prices
    }

    pub fn realized(&self) -> &RealizedVolRegistry {
        &self.realized
    }

    /// Track a contract before any tick for it arrives
    pub fn register(&self, symbol: &str) -> Result<(), StoreError> {
        self.store.register(symbol)?;
        telemetry::set_gauge(GaugeMetric::TrackedContracts, self.store.len() as f64);
        Ok(())
    }

    /// Pre-populate an underlying's OHLC history; invalid bars are skipped
    pub fn seed_bars(&self, underlying: &str, bars: &[OhlcBar]) -> Result<usize, BarError> {
        let accepted = self.realized.seed_bars(underlying, bars)?;
        info!(underlying, accepted, offered = bars.len(), "Seeded realized vol history");
        Ok(accepted)
    }

    pub fn append_bar(&self, underlying: &str, bar: OhlcBar) -> Result<RvMetrics, BarError> {
        self.realized.append_bar(underlying, bar)
    }

    /// Copy of every contract record
    pub fn snapshot(&self) -> Vec<ContractRecord> {
        self.store.snapshot()
    }

    pub fn get(&self, symbol: &str) -> Option<ContractRecord> {
        self.store.get(symbol)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Route a feed event to the matching push method
    pub fn ingest(&self, event: &TickEvent) {
        match event {
            TickEvent::OptionTrade {
                symbol,
                price,
                size,
                timestamp,
            } => match decimal(price) {
                Some(price) => self.on_trade(symbol, price, *size, *timestamp),
                None => drop_tick(symbol, "unrepresentable price"),
            },
            TickEvent::OptionQuote {
                symbol,
                bid,
                bid_size,
                ask,
                ask_size,
                timestamp,
            } => match (decimal(bid), decimal(ask)) {
                (Some(bid), Some(ask)) => {
                    self.on_quote(symbol, bid, *bid_size, ask, *ask_size, *timestamp)
                }
                _ => drop_tick(symbol, "unrepresentable quote"),
            },
            TickEvent::UnderlyingTrade {
                symbol,
                price,
                timestamp,
            } => match decimal(price) {
                Some(price) => self.on_underlying_trade(symbol, price, *timestamp),
                None => drop_tick(symbol, "unrepresentable price"),
            },
            TickEvent::UnderlyingQuote {
                symbol, bid, ask, ..
            } => {
                if *bid <= Decimal::ZERO || *ask <= Decimal::ZERO {
                    drop_tick(symbol, "one-sided quote");
                    return;
                }
                match (decimal(bid), decimal(ask)) {
                    (Some(bid), Some(ask)) => self.on_underlying_quote(symbol, bid, ask),
                    _ => drop_tick(symbol, "unrepresentable quote"),
                }
            }
        }
    }

    /// Build smiles, term structures and dislocation alerts from a
    /// snapshot. No lock is held while the analysis runs.
    pub fn run_analysis_cycle(&self) -> AnalysisReport {
        let started = Instant::now();
        let records = self.store.snapshot();
        let realized = self.realized.snapshot();

        let smiles = self.smiles.build(&records);
        let term_structures = term_structures(&smiles);
        let alerts = self.dislocations.analyze_all(&records, &smiles, &realized);
        let valid_contracts = records.iter().filter(|r| r.analytics_valid).count();

        let report = AnalysisReport {
            cycle_id: Uuid::new_v4(),
            generated_at: self.store.clock().wall(),
            contracts: records.len(),
            valid_contracts,
            smiles,
            term_structures,
            alerts,
        };

        let elapsed = started.elapsed();
        telemetry::record_latency(LatencyMetric::AnalysisCycle, elapsed);
        telemetry::set_gauge(GaugeMetric::TrackedContracts, report.contracts as f64);
        telemetry::set_gauge(GaugeMetric::ValidAnalytics, valid_contracts as f64);
        telemetry::set_gauge(GaugeMetric::Smiles, report.smiles.len() as f64);
        telemetry::set_gauge(GaugeMetric::ActiveAlerts, report.alerts.len() as f64);

        info!(
            cycle_id = %report.cycle_id,
            contracts = report.contracts,
            valid = valid_contracts,
            smiles = report.smiles.len(),
            term_structures = report.term_structures.len(),
            alerts = report.alerts.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "Analysis cycle complete"
        );
        report
    }

    fn record_outcome(&self, symbol: &str, result: Result<RecomputeOutcome, StoreError>) {
        match result {
            Ok(outcome) => {
                telemetry::increment(CounterMetric::TicksIngested);
                if outcome == RecomputeOutcome::Computed {
                    debug!(symbol, "Analytics refreshed");
                }
            }
            Err(e) => drop_tick(symbol, &e.to_string()),
        }
    }
}

impl TickSink for AnalyticsEngine {
    fn on_trade(&self, symbol: &str, price: f64, size: u64, timestamp: DateTime<Utc>) {
        let result = self.store.apply_trade(symbol, price, size, timestamp);
        self.record_outcome(symbol, result);
    }

    fn on_quote(
        &self,
        symbol: &str,
        bid: f64,
        bid_size: u64,
        ask: f64,
        ask_size: u64,
        timestamp: DateTime<Utc>,
    ) {
        let result = self
            .store
            .apply_quote(symbol, bid, bid_size, ask, ask_size, timestamp);
        self.record_outcome(symbol, result);
    }

    fn on_underlying_trade(&self, symbol: &str, price: f64, timestamp: DateTime<Utc>) {
        match self.prices.update_trade(symbol, price, timestamp) {
            Ok(()) => telemetry::increment(CounterMetric::TicksIngested),
            Err(e) => drop_tick(symbol, &e.to_string()),
        }
    }

    fn on_underlying_quote_mid(&self, symbol: &str, mid: f64) {
        let now = self.store.clock().wall();
        match self.prices.update_quote_mid(symbol, mid, now) {
            Ok(()) => telemetry::increment(CounterMetric::TicksIngested),
            Err(e) => drop_tick(symbol, &e.to_string()),
        }
    }

    fn on_underlying_quote(&self, symbol: &str, bid: f64, ask: f64) {
        let now = self.store.clock().wall();
        match self.prices.update_quote(symbol, bid, ask, now) {
            Ok(()) => telemetry::increment(CounterMetric::TicksIngested),
            Err(e) => drop_tick(symbol, &e.to_string()),
        }
    }
}

fn decimal(value: &Decimal) -> Option<f64> {
    value.to_f64().filter(|v| v.is_finite())
}

fn drop_tick(symbol: &str, reason: &str) {
    telemetry::increment(CounterMetric::TicksDropped);
    debug!(symbol, reason, "Dropped tick");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{call_price, put_price};
    use crate::store::ManualClock;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    const VOL: f64 = 0.25;

    fn engine() -> (AnalyticsEngine, Arc<ManualClock>) {
        let wall = Utc.with_ymd_and_hms(2025, 7, 2, 20, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(wall));
        let engine = AnalyticsEngine::with_clock(&AnalyticsConfig::default(), clock.clone());
        (engine, clock)
    }

    fn years() -> f64 {
        30.0 / 365.25
    }

    #[test]
    fn test_ticks_flow_into_records() {
        let (engine, clock) = engine();
        engine.on_underlying_trade("QQQ", 560.0, clock.wall());
        let price = call_price(560.0, 560.0, years(), 0.05, VOL);
        engine.on_trade("QQQ250801C00560000", price, 3, clock.wall());

        let record = engine.get("QQQ250801C00560000").unwrap();
        assert!(record.analytics_valid);
        assert!((record.analytics.implied_vol - VOL).abs() < 1e-4);
        assert_eq!(engine.stats().contracts, 1);
    }

    #[test]
    fn test_malformed_ticks_are_dropped() {
        let (engine, clock) = engine();
        engine.on_trade("NOT_A_SYMBOL", 1.0, 1, clock.wall());
        engine.on_quote("QQQ250801C00560000", -1.0, 1, 2.0, 1, clock.wall());
        engine.on_underlying_trade("QQQ", f64::NAN, clock.wall());
        engine.on_underlying_quote_mid("QQQ", 0.0);
        engine.on_underlying_quote("QQQ", 0.0, 1.0);
        assert!(engine.snapshot().is_empty());
        assert_eq!(engine.prices().get("QQQ"), None);
    }

    #[test]
    fn test_quote_mid_sets_underlying() {
        let (engine, clock) = engine();
        engine.ingest(&TickEvent::UnderlyingQuote {
            symbol: "SPY".to_string(),
            bid: dec!(599.50),
            ask: dec!(600.50),
            timestamp: clock.wall(),
        });
        assert_eq!(engine.prices().get("SPY"), Some(600.0));

        engine.ingest(&TickEvent::UnderlyingQuote {
            symbol: "IWM".to_string(),
            bid: dec!(0),
            ask: dec!(220.10),
            timestamp: clock.wall(),
        });
        assert_eq!(engine.prices().get("IWM"), None);
    }

    #[test]
    fn test_ingest_decimal_events() {
        let (engine, clock) = engine();
        engine.ingest(&TickEvent::UnderlyingTrade {
            symbol: "QQQ".to_string(),
            price: dec!(560),
            timestamp: clock.wall(),
        });
        engine.ingest(&TickEvent::OptionQuote {
            symbol: "QQQ250801P00540000".to_string(),
            bid: dec!(4.00),
            bid_size: 10,
            ask: dec!(4.50),
            ask_size: 12,
            timestamp: clock.wall(),
        });
        let record = engine.get("QQQ250801P00540000").unwrap();
        assert_eq!(record.market_price(), Some(4.25));
        assert!(record.analytics_valid);
    }

    #[test]
    fn test_analysis_cycle_builds_smile() {
        let (engine, clock) = engine();
        engine.on_underlying_trade("QQQ", 560.0, clock.wall());
        let chain = [
            ("QQQ250801P00520000", 0.30),
            ("QQQ250801P00540000", 0.27),
            ("QQQ250801C00560000", 0.24),
            ("QQQ250801C00580000", 0.23),
            ("QQQ250801C00600000", 0.24),
        ];
        for (symbol, vol) in chain {
            let parsed = crate::contract::OptionSymbol::parse(symbol).unwrap();
            let price = if parsed.is_call() {
                call_price(560.0, parsed.strike, years(), 0.05, vol)
            } else {
                put_price(560.0, parsed.strike, years(), 0.05, vol)
            };
            engine.on_trade(symbol, price, 1, clock.wall());
        }

        let report = engine.run_analysis_cycle();
        assert_eq!(report.contracts, 5);
        assert_eq!(report.valid_contracts, 5);
        assert_eq!(report.smiles.len(), 1);
        let smile = &report.smiles[0];
        assert!(smile.sufficient_data);
        assert!((smile.atm_vol - 0.24).abs() < 1e-3);
        assert!(report.term_structures.is_empty());
        assert_eq!(report.generated_at, clock.wall());
    }

    #[test]
    fn test_alerts_use_realized_vol() {
        let (engine, clock) = engine();
        // Flat daily closes with a small range give a low realized vol
        let bars: Vec<OhlcBar> = (0..30)
            .map(|i| {
                let base = 560.0 + if i % 2 == 0 { 1.0 } else { -1.0 };
                OhlcBar::at(base, base + 1.0, base - 1.0, base, clock.wall())
            })
            .collect();
        assert_eq!(engine.seed_bars("QQQ", &bars).unwrap(), 30);
        let rv = engine.realized().metrics("QQQ").unwrap();
        assert!(rv.rv_20d > 0.0 && rv.rv_20d < 0.10);

        engine.on_underlying_trade("QQQ", 560.0, clock.wall());
        let price = call_price(560.0, 560.0, years(), 0.05, 0.40);
        engine.on_trade("QQQ250801C00560000", price, 1, clock.wall());

        let report = engine.run_analysis_cycle();
        let alert = report
            .alerts
            .iter()
            .find(|a| a.symbol == "QQQ250801C00560000")
            .unwrap();
        assert!(alert.flags.iv_rv);
        assert!(alert.iv_rv.as_ref().unwrap().spread > 0.15);
    }

    #[test]
    fn test_throttle_applies_through_engine() {
        let (engine, clock) = engine();
        engine.on_underlying_trade("QQQ", 560.0, clock.wall());
        let price = call_price(560.0, 560.0, years(), 0.05, VOL);
        engine.on_trade("QQQ250801C00560000", price, 1, clock.wall());
        engine.on_trade("QQQ250801C00560000", price * 1.1, 1, clock.wall());
        assert_eq!(engine.stats().throttled, 1);

        clock.advance(Duration::from_millis(150));
        engine.on_trade("QQQ250801C00560000", price * 1.1, 1, clock.wall());
        let record = engine.get("QQQ250801C00560000").unwrap();
        assert_eq!(record.recompute_count, 2);
        assert!(record.analytics.implied_vol > VOL);
        assert!(record.previous.is_some());
    }
}
