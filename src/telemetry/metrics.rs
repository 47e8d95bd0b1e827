//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Monotonic counters
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Option or underlying tick accepted
    TicksIngested,
    /// Tick dropped (malformed symbol, bad price, capacity)
    TicksDropped,
    /// Contract analytics recomputed
    Recomputes,
    /// Recompute skipped by the per-symbol throttle
    RecomputesThrottled,
    /// OHLC bar rejected by validation
    BarsRejected,
    /// New contract or underlying refused because a table was full
    CapacityRejections,
}

/// Point-in-time gauges
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Contracts in the record store
    TrackedContracts,
    /// Contracts whose analytics are currently valid
    ValidAnalytics,
    /// Dislocation alerts in the latest analysis cycle
    ActiveAlerts,
    /// Smiles built in the latest analysis cycle
    Smiles,
}

/// Latency histograms
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Single contract recompute (IV solve + Greeks)
    Recompute,
    /// Full smile + dislocation cycle
    AnalysisCycle,
}

fn counter_name(metric: CounterMetric) -> &'static str {
    match metric {
        CounterMetric::TicksIngested => "greekstream_ticks_ingested_total",
        CounterMetric::TicksDropped => "greekstream_ticks_dropped_total",
        CounterMetric::Recomputes => "greekstream_recomputes_total",
        CounterMetric::RecomputesThrottled => "greekstream_recomputes_throttled_total",
        CounterMetric::BarsRejected => "greekstream_bars_rejected_total",
        CounterMetric::CapacityRejections => "greekstream_capacity_rejections_total",
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    ::metrics::counter!(counter_name(metric)).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::TrackedContracts => "greekstream_tracked_contracts",
        GaugeMetric::ValidAnalytics => "greekstream_valid_analytics",
        GaugeMetric::ActiveAlerts => "greekstream_active_alerts",
        GaugeMetric::Smiles => "greekstream_smiles",
    };
    ::metrics::gauge!(name).set(value);
}

/// Record a latency measurement in milliseconds
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let name = match metric {
        LatencyMetric::Recompute => "greekstream_recompute_latency_ms",
        LatencyMetric::AnalysisCycle => "greekstream_analysis_cycle_latency_ms",
    };
    ::metrics::histogram!(name).record(duration.as_secs_f64() * 1000.0);
}

/// Install the Prometheus recorder with an HTTP scrape endpoint
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;
    tracing::info!(%addr, "Prometheus metrics exporter started");
    Ok(())
}
