//! Concurrent ingestion and snapshot reads

use chrono::{TimeZone, Utc};
use greek_stream::config::AnalyticsConfig;
use greek_stream::engine::{AnalyticsEngine, TickSink};
use greek_stream::model::{call_price, put_price, BlackScholes, PricingInputs, PricingModel};
use greek_stream::store::ManualClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const RATE: f64 = 0.05;

fn expiry_years(wall: chrono::DateTime<Utc>) -> f64 {
    (Utc.with_ymd_and_hms(2027, 12, 17, 20, 0, 0).unwrap() - wall).num_seconds() as f64
        / (365.25 * 86_400.0)
}

#[test]
fn test_readers_never_see_partial_records() {
    let wall = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(wall));
    let config = AnalyticsConfig {
        recompute_throttle_ms: 0,
        risk_free_rate: RATE,
        ..AnalyticsConfig::default()
    };
    let engine = Arc::new(AnalyticsEngine::with_clock(&config, clock.clone()));
    let t = expiry_years(wall);
    let done = Arc::new(AtomicBool::new(false));

    engine.on_underlying_trade("QQQ", 560.0, wall);

    let spot_writer = {
        let engine = Arc::clone(&engine);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut i = 0u64;
            while !done.load(Ordering::Relaxed) {
                let spot = 550.0 + (i % 21) as f64;
                engine.on_underlying_trade("QQQ", spot, wall);
                i += 1;
            }
        })
    };

    let option_writers: Vec<_> = [(540.0, false), (560.0, true), (580.0, true), (520.0, false)]
        .into_iter()
        .map(|(strike, is_call)| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let symbol = format!(
                    "QQQ271217{}{:08}",
                    if is_call { 'C' } else { 'P' },
                    (strike * 1000.0) as u64
                );
                for i in 0..400 {
                    let vol = 0.18 + (i % 10) as f64 * 0.01;
                    let price = if is_call {
                        call_price(560.0, strike, t, RATE, vol)
                    } else {
                        put_price(560.0, strike, t, RATE, vol)
                    };
                    engine.on_trade(&symbol, price, 1, wall);
                }
            })
        })
        .collect();

    let reader = {
        let engine = Arc::clone(&engine);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let model = BlackScholes::new();
            let mut checked = 0usize;
            while !done.load(Ordering::Relaxed) {
                for record in engine.snapshot() {
                    if !record.analytics_valid {
                        continue;
                    }
                    // Greeks must belong to the same (spot, vol) as the stored IV
                    let inputs = PricingInputs::new(
                        record.underlying_price,
                        record.symbol.strike,
                        record.time_to_expiry,
                        RATE,
                        record.analytics.implied_vol,
                    );
                    let greeks = model.greeks(&inputs, record.symbol.option_type);
                    assert!((greeks.delta - record.analytics.greeks.delta).abs() < 1e-9);
                    assert!((greeks.vega - record.analytics.greeks.vega).abs() < 1e-6);
                    checked += 1;
                }
                let _ = engine.run_analysis_cycle();
            }
            checked
        })
    };

    for writer in option_writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    spot_writer.join().unwrap();
    let _checked = reader.join().unwrap();

    let stats = engine.stats();
    assert_eq!(stats.contracts, 4);
    assert_eq!(stats.valid_analytics, 4);
    // Throttle disabled: every trade recomputes
    assert_eq!(stats.recomputes, 1600);
    assert_eq!(stats.throttled, 0);
}

#[test]
fn test_concurrent_new_underlyings_respect_capacity() {
    let config = AnalyticsConfig {
        max_underlyings: 8,
        ..AnalyticsConfig::default()
    };
    let engine = Arc::new(AnalyticsEngine::new(&config));
    let now = Utc::now();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..10 {
                    let symbol = format!("U{}{}", worker, i);
                    engine.on_underlying_trade(&symbol, 100.0 + i as f64, now);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.prices().len(), 8);
    for price in engine.prices().snapshot() {
        assert!(price.valid);
        assert!(price.price() >= 100.0);
    }
}
