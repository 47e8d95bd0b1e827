//! Synthetic market for development runs
//!
//! Underlyings follow a geometric random walk; option quotes and trades
//! are priced off Black-Scholes at a skewed reference vol with a little
//! noise, so the solver recovers something close to the reference smile.

use super::{TickEvent, TickFeed};
use crate::contract::OptionSymbol;
use crate::model::{BlackScholes, PricingInputs, PricingModel};
use crate::volatility::{OhlcBar, TRADING_DAYS_PER_YEAR};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// ATM vol the mock prices options at
pub const REFERENCE_VOL: f64 = 0.20;

const TRADE_PROBABILITY: f64 = 0.3;
const MIN_OPTION_PRICE: f64 = 0.01;
const VOL_NOISE: f64 = 0.02;
const TRADING_SECONDS_PER_YEAR: f64 = 252.0 * 6.5 * 3600.0;

/// Which half of the market a feed publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStream {
    Options,
    Underlyings,
}

#[derive(Debug)]
struct Underlying {
    symbol: String,
    spot: f64,
}

/// Shared state behind the mock option and underlying feeds
#[derive(Debug)]
pub struct MockMarket {
    rng: StdRng,
    underlyings: Vec<Underlying>,
    contracts: Vec<OptionSymbol>,
    rate: f64,
    model: BlackScholes,
}

impl MockMarket {
    /// Each underlying starts at the mean strike of its contracts
    pub fn new(symbols: &[String], seed: Option<u64>, rate: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut contracts = Vec::with_capacity(symbols.len());
        for raw in symbols {
            match OptionSymbol::parse(raw) {
                Ok(symbol) => contracts.push(symbol),
                Err(e) => warn!(symbol = %raw, error = %e, "Skipping unparseable mock symbol"),
            }
        }

        let mut underlyings: Vec<Underlying> = Vec::new();
        for contract in &contracts {
            if underlyings.iter().any(|u| u.symbol == contract.underlying) {
                continue;
            }
            let strikes: Vec<f64> = contracts
                .iter()
                .filter(|c| c.underlying == contract.underlying)
                .map(|c| c.strike)
                .collect();
            let spot = strikes.iter().sum::<f64>() / strikes.len() as f64;
            underlyings.push(Underlying {
                symbol: contract.underlying.clone(),
                spot,
            });
        }

        Self {
            rng,
            underlyings,
            contracts,
            rate,
            model: BlackScholes::new(),
        }
    }

    pub fn underlyings(&self) -> Vec<String> {
        self.underlyings.iter().map(|u| u.symbol.clone()).collect()
    }

    pub fn contracts(&self) -> &[OptionSymbol] {
        &self.contracts
    }

    pub fn spot(&self, underlying: &str) -> Option<f64> {
        self.underlyings
            .iter()
            .find(|u| u.symbol == underlying)
            .map(|u| u.spot)
    }

    /// Reference vol with a put skew and mild convexity in log-moneyness
    pub fn reference_vol(strike: f64, spot: f64) -> f64 {
        if strike <= 0.0 || spot <= 0.0 {
            return REFERENCE_VOL;
        }
        let x = (strike / spot).ln();
        (REFERENCE_VOL - 0.1 * x + 0.5 * x * x).max(0.05)
    }

    /// Advance every underlying by `elapsed` of trading time and publish
    /// a quote and a trade for each
    pub fn step_underlyings(&mut self, elapsed: Duration, now: DateTime<Utc>) -> Vec<TickEvent> {
        let years = elapsed.as_secs_f64() / TRADING_SECONDS_PER_YEAR;
        let drift = -0.5 * REFERENCE_VOL * REFERENCE_VOL * years;
        let shock = REFERENCE_VOL * years.sqrt();

        let mut events = Vec::with_capacity(self.underlyings.len() * 2);
        for i in 0..self.underlyings.len() {
            let z = self.rng.sample::<f64, _>(StandardNormal);
            let underlying = &mut self.underlyings[i];
            underlying.spot = (underlying.spot * (drift + shock * z).exp()).max(1.0);

            let spot = underlying.spot;
            let (Some(price), Some(bid), Some(ask)) =
                (to_cents(spot), to_cents(spot - 0.01), to_cents(spot + 0.01))
            else {
                continue;
            };
            events.push(TickEvent::UnderlyingQuote {
                symbol: underlying.symbol.clone(),
                bid,
                ask,
                timestamp: now,
            });
            events.push(TickEvent::UnderlyingTrade {
                symbol: underlying.symbol.clone(),
                price,
                timestamp: now,
            });
        }
        events
    }

    /// One quote per live contract, and a trade with some probability
    pub fn option_ticks(&mut self, now: DateTime<Utc>) -> Vec<TickEvent> {
        let mut events = Vec::with_capacity(self.contracts.len());
        for i in 0..self.contracts.len() {
            let contract = self.contracts[i].clone();
            let time = match contract.time_to_expiry(now) {
                Ok(t) if t > 0.0 => t,
                _ => continue,
            };
            let Some(spot) = self.spot(&contract.underlying) else {
                continue;
            };

            let noise: f64 = self.rng.sample(StandardNormal);
            let vol = Self::reference_vol(contract.strike, spot) * (1.0 + VOL_NOISE * noise);
            let inputs = PricingInputs::new(spot, contract.strike, time, self.rate, vol);
            let fair = self
                .model
                .price(&inputs, contract.option_type)
                .max(MIN_OPTION_PRICE);
            let half_spread = (fair * 0.01).max(0.01);

            let bid_size = self.rng.gen_range(1..=100);
            let ask_size = self.rng.gen_range(1..=100);
            if let (Some(bid), Some(ask)) = (
                to_cents((fair - half_spread).max(0.0)),
                to_cents(fair + half_spread),
            ) {
                events.push(TickEvent::OptionQuote {
                    symbol: contract.raw.clone(),
                    bid,
                    bid_size,
                    ask,
                    ask_size,
                    timestamp: now,
                });
            }

            if self.rng.gen_bool(TRADE_PROBABILITY) {
                let offset = self.rng.gen_range(-half_spread..=half_spread);
                let size = self.rng.gen_range(1..=50);
                if let Some(price) = to_cents((fair + offset).max(MIN_OPTION_PRICE)) {
                    events.push(TickEvent::OptionTrade {
                        symbol: contract.raw.clone(),
                        price,
                        size,
                        timestamp: now,
                    });
                }
            }
        }
        events
    }

    /// Synthetic daily history ending at the current spot, one bar per
    /// day up to `end`
    pub fn history_bars(&mut self, underlying: &str, count: usize, end: DateTime<Utc>) -> Vec<OhlcBar> {
        let Some(spot) = self.spot(underlying) else {
            return Vec::new();
        };
        let daily = REFERENCE_VOL / TRADING_DAYS_PER_YEAR.sqrt();

        let mut bars = Vec::with_capacity(count);
        let mut close = spot;
        for i in 0..count {
            let open = close;
            let [z, up, down]: [f64; 3] = [(); 3].map(|_| self.rng.sample(StandardNormal));
            close = open * (daily * z - 0.5 * daily * daily).exp();
            let high = open.max(close) * (1.0 + 0.5 * daily * up.abs());
            let low = open.min(close) * (1.0 - 0.5 * daily * down.abs());
            let timestamp = end - ChronoDuration::days((count - i) as i64);
            bars.push(OhlcBar::at(open, high, low, close, timestamp));
        }

        // Rescale so the history ends where the live walk starts
        let scale = spot / close;
        for bar in &mut bars {
            bar.open *= scale;
            bar.high *= scale;
            bar.low *= scale;
            bar.close *= scale;
        }
        bars
    }
}

fn to_cents(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok().map(|d| d.round_dp(2))
}

/// One stream of the mock market, published on a fixed cadence
pub struct MockFeed {
    market: Arc<Mutex<MockMarket>>,
    stream: FeedStream,
    interval: Duration,
}

impl MockFeed {
    pub fn new(market: Arc<Mutex<MockMarket>>, stream: FeedStream, interval: Duration) -> Self {
        Self {
            market,
            stream,
            interval,
        }
    }

    pub fn stream(&self) -> FeedStream {
        self.stream
    }
}

#[async_trait]
impl TickFeed for MockFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<TickEvent>> {
        let (tick_tx, tick_rx) = mpsc::channel(1024);
        let market = Arc::clone(&self.market);
        let stream = self.stream;
        let interval = self.interval;

        info!(?stream, interval_ms = interval.as_millis() as u64, "Starting mock feed");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let events = {
                    let mut market = market.lock();
                    match stream {
                        FeedStream::Options => market.option_ticks(Utc::now()),
                        FeedStream::Underlyings => market.step_underlyings(interval, Utc::now()),
                    }
                };
                for event in events {
                    if tick_tx.send(event).await.is_err() {
                        debug!(?stream, "Tick receiver dropped, stopping mock feed");
                        return;
                    }
                }
            }
        });

        Ok(tick_rx)
    }
}
