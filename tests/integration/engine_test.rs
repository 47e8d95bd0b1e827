//! Engine end-to-end tests driven by the mock market

use chrono::{TimeZone, Utc};
use greek_stream::config::AnalyticsConfig;
use greek_stream::engine::{AnalyticsEngine, TickSink};
use greek_stream::feed::{MockMarket, TickEvent, REFERENCE_VOL};
use greek_stream::model::call_price;
use greek_stream::store::{Clock, ManualClock};
use greek_stream::volatility::OhlcBar;
use std::sync::Arc;
use std::time::Duration;

fn chain() -> Vec<String> {
    [
        "QQQ271217P00520000",
        "QQQ271217P00540000",
        "QQQ271217C00560000",
        "QQQ271217C00580000",
        "QQQ271217C00600000",
        "QQQ280121P00540000",
        "QQQ280121C00560000",
        "QQQ280121C00580000",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn setup() -> (AnalyticsEngine, Arc<ManualClock>, MockMarket) {
    let wall = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(wall));
    let engine = AnalyticsEngine::with_clock(&AnalyticsConfig::default(), clock.clone());
    let market = MockMarket::new(&chain(), Some(2024), 0.05);
    (engine, clock, market)
}

#[test]
fn test_mock_market_end_to_end() {
    let (engine, clock, mut market) = setup();

    let history = market.history_bars("QQQ", 60, clock.wall());
    assert_eq!(engine.seed_bars("QQQ", &history).unwrap(), 60);

    for event in market.step_underlyings(Duration::from_millis(500), clock.wall()) {
        engine.ingest(&event);
    }
    let ticks = market.option_ticks(clock.wall());
    assert!(ticks.iter().all(TickEvent::is_option));
    for event in &ticks {
        engine.ingest(event);
    }

    let stats = engine.stats();
    assert_eq!(stats.contracts, 8);
    assert_eq!(stats.valid_analytics, 8);

    for record in engine.snapshot() {
        let iv = record.analytics.implied_vol;
        let reference = MockMarket::reference_vol(record.symbol.strike, record.underlying_price);
        assert!(
            (iv - reference).abs() < 0.03,
            "{} iv {} vs reference {}",
            record.symbol,
            iv,
            reference
        );
    }

    let report = engine.run_analysis_cycle();
    assert_eq!(report.smiles.len(), 2);
    assert!(report.smiles.iter().all(|s| s.sufficient_data));
    let front = &report.smiles[0];
    assert_eq!(front.expiry, "271217");
    assert_eq!(front.points.len(), 5);
    assert!((front.atm_vol - REFERENCE_VOL).abs() < 0.03);

    assert_eq!(report.term_structures.len(), 1);
    assert_eq!(report.term_structures[0].points.len(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["cycle_id"].is_string());
    assert_eq!(json["smiles"].as_array().unwrap().len(), 2);
}

#[test]
fn test_ticks_without_spot_stay_invalid() {
    let (engine, clock, mut market) = setup();
    for event in market.option_ticks(clock.wall()) {
        engine.ingest(&event);
    }
    assert_eq!(engine.stats().contracts, 8);
    assert_eq!(engine.stats().valid_analytics, 0);

    let report = engine.run_analysis_cycle();
    assert!(report.smiles.is_empty());
    assert!(report.alerts.is_empty());
}

#[test]
fn test_capacity_limit_keeps_existing_contracts() {
    let wall = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(wall));
    let config = AnalyticsConfig {
        max_contracts: 2,
        ..AnalyticsConfig::default()
    };
    let engine = AnalyticsEngine::with_clock(&config, clock.clone());
    engine.on_underlying_trade("QQQ", 560.0, clock.wall());

    let t = (Utc.with_ymd_and_hms(2027, 12, 17, 20, 0, 0).unwrap() - wall).num_seconds() as f64
        / (365.25 * 86_400.0);
    for strike in [540.0, 560.0, 580.0] {
        let symbol = format!("QQQ271217C{:08}", (strike * 1000.0) as u64);
        let price = call_price(560.0, strike, t, 0.05, 0.2);
        engine.on_trade(&symbol, price, 1, clock.wall());
    }

    assert_eq!(engine.stats().contracts, 2);
    assert!(engine.get("QQQ271217C00580000").is_none());
    let kept = engine.get("QQQ271217C00540000").unwrap();
    assert!(kept.analytics_valid);
    assert!((kept.analytics.implied_vol - 0.2).abs() < 1e-4);
}

#[test]
fn test_realized_vol_flows_into_alerts() {
    let (engine, clock, _) = setup();
    // Quiet tape: realized vol well under the implied level below
    let bars: Vec<OhlcBar> = (0..40)
        .map(|i| {
            let c = 560.0 + (i % 3) as f64 * 0.5;
            OhlcBar::at(c, c + 0.8, c - 0.8, c, clock.wall())
        })
        .collect();
    engine.seed_bars("QQQ", &bars).unwrap();
    engine.on_underlying_trade("QQQ", 560.0, clock.wall());

    let t = (Utc.with_ymd_and_hms(2027, 12, 17, 20, 0, 0).unwrap() - clock.wall()).num_seconds()
        as f64
        / (365.25 * 86_400.0);
    engine.on_trade(
        "QQQ271217C00560000",
        call_price(560.0, 560.0, t, 0.05, 0.35),
        1,
        clock.wall(),
    );

    let report = engine.run_analysis_cycle();
    let alert = report
        .alerts
        .iter()
        .find(|a| a.symbol == "QQQ271217C00560000")
        .expect("expensive IV should be flagged");
    assert!(alert.flags.iv_rv);
    let analysis = alert.iv_rv.as_ref().unwrap();
    assert!(analysis.spread > 0.2);
    assert!(alert
        .recommendations
        .contains(&"SELL VOL - IV extremely expensive vs RV".to_string()));
}
