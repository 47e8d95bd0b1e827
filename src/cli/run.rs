//! Run command implementation

use crate::config::Config;
use crate::dislocation::DislocationAlert;
use crate::engine::{AnalysisReport, AnalyticsEngine};
use crate::feed::{FeedStream, MockFeed, MockMarket, TickFeed};
use chrono::Utc;
use clap::Args;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How often loops wake to check the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Print each analysis report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Each feed stream gets its own tokio task as its tick context. Handlers
    /// run synchronously and never hold a lock across an `.await`.
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let engine = Arc::new(AnalyticsEngine::new(&config.analytics));
        let shutdown = Arc::new(AtomicBool::new(false));
        let market = Arc::new(Mutex::new(MockMarket::new(
            &config.feed.symbols,
            config.feed.seed,
            config.analytics.risk_free_rate,
        )));

        for symbol in &config.feed.symbols {
            if let Err(e) = engine.register(symbol) {
                warn!(symbol = %symbol, error = %e, "Not tracking symbol");
            }
        }
        seed_history(&engine, &market, config.feed.history_bars);

        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        for stream in [FeedStream::Underlyings, FeedStream::Options] {
            let feed = MockFeed::new(Arc::clone(&market), stream, config.feed.tick_interval());
            let rx = feed.subscribe().await?;
            handles.push(tokio::spawn(consume(
                stream,
                rx,
                Arc::clone(&engine),
                Arc::clone(&shutdown),
            )));
        }
        handles.push(tokio::spawn(analysis_loop(
            Arc::clone(&engine),
            Arc::clone(&shutdown),
            config.analytics.analysis_interval(),
            self.json,
        )));

        info!(
            contracts = engine.stats().contracts,
            underlyings = engine.realized().len(),
            "Engine running"
        );

        match self.duration_secs {
            Some(secs) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => result?,
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                }
            }
            None => tokio::signal::ctrl_c().await?,
        }

        info!("Shutting down");
        shutdown.store(true, Ordering::Relaxed);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Task ended abnormally");
            }
        }

        let stats = engine.stats();
        info!(
            contracts = stats.contracts,
            valid = stats.valid_analytics,
            recomputes = stats.recomputes,
            throttled = stats.throttled,
            rejected = stats.rejected,
            "Stopped"
        );
        Ok(())
    }
}

fn seed_history(engine: &AnalyticsEngine, market: &Mutex<MockMarket>, bars: usize) {
    if bars == 0 {
        return;
    }
    let mut market = market.lock();
    for underlying in market.underlyings() {
        let history = market.history_bars(&underlying, bars, Utc::now());
        if let Err(e) = engine.seed_bars(&underlying, &history) {
            warn!(underlying = %underlying, error = %e, "Could not seed history");
        }
    }
}

async fn consume(
    stream: FeedStream,
    mut rx: tokio::sync::mpsc::Receiver<crate::feed::TickEvent>,
    engine: Arc<AnalyticsEngine>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match tokio::time::timeout(SHUTDOWN_POLL, rx.recv()).await {
            Ok(Some(event)) => engine.ingest(&event),
            Ok(None) => break,
            Err(_) => continue,
        }
    }
    debug!(?stream, "Feed consumer stopped");
}

async fn analysis_loop(
    engine: Arc<AnalyticsEngine>,
    shutdown: Arc<AtomicBool>,
    interval: Duration,
    json: bool,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; let the feeds warm up
    ticker.tick().await;
    while !shutdown.load(Ordering::Relaxed) {
        if tokio::time::timeout(SHUTDOWN_POLL, ticker.tick()).await.is_err() {
            continue;
        }
        let report = engine.run_analysis_cycle();
        publish(&report, json);
    }
    debug!("Analysis loop stopped");
}

fn publish(report: &AnalysisReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Could not serialize report"),
        }
        return;
    }

    for smile in &report.smiles {
        info!(
            underlying = %smile.underlying,
            expiry = %smile.expiry,
            points = smile.points.len(),
            atm_vol = smile.atm_vol,
            put_skew = smile.put_skew,
            call_skew = smile.call_skew,
            r_squared = smile.r_squared,
            anomalies = ?smile.anomalies,
            "Smile"
        );
    }
    for term in &report.term_structures {
        info!(
            underlying = %term.underlying,
            slope = term.slope,
            backwardation = term.backwardation,
            "Term structure"
        );
    }
    for alert in &report.alerts {
        log_alert(alert);
    }
}

fn log_alert(alert: &DislocationAlert) {
    warn!(
        contract = %alert.description,
        signals = %alert.summary(),
        recommendation = %alert.recommendations.join("; "),
        "Dislocation"
    );
}
