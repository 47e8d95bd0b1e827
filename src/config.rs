//! Configuration types for greek-stream

use crate::telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Analytics engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Continuously-compounded risk-free rate (0.05 = 5%)
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Contract table capacity; new symbols beyond this are rejected
    #[serde(default = "default_max_contracts")]
    pub max_contracts: usize,

    /// Distinct underlyings tracked by the price cache and RV registry
    #[serde(default = "default_max_underlyings")]
    pub max_underlyings: usize,

    /// Minimum gap between recomputes of one contract (milliseconds)
    #[serde(default = "default_recompute_throttle_ms")]
    pub recompute_throttle_ms: u64,

    /// Smile / dislocation cycle period (seconds)
    #[serde(default = "default_analysis_interval_secs")]
    pub analysis_interval_secs: u64,

    /// Daily bars kept per underlying
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_risk_free_rate() -> f64 {
    0.05
}
fn default_max_contracts() -> usize {
    100
}
fn default_max_underlyings() -> usize {
    50
}
fn default_recompute_throttle_ms() -> u64 {
    100
}
fn default_analysis_interval_secs() -> u64 {
    10
}
fn default_history_window() -> usize {
    252
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            max_contracts: default_max_contracts(),
            max_underlyings: default_max_underlyings(),
            recompute_throttle_ms: default_recompute_throttle_ms(),
            analysis_interval_secs: default_analysis_interval_secs(),
            history_window: default_history_window(),
        }
    }
}

impl AnalyticsConfig {
    pub fn recompute_throttle(&self) -> Duration {
        Duration::from_millis(self.recompute_throttle_ms)
    }

    pub fn analysis_interval(&self) -> Duration {
        Duration::from_secs(self.analysis_interval_secs.max(1))
    }
}

/// Tick source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Synthetic random-walk ticks
    #[default]
    Mock,
}

/// Feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub mode: FeedMode,

    /// Option symbols to stream
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Mock tick cadence (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// RNG seed for the mock feed; random when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Synthetic daily bars seeded per underlying in mock mode
    #[serde(default = "default_history_bars")]
    pub history_bars: usize,
}

fn default_symbols() -> Vec<String> {
    [
        "QQQ271217C00560000",
        "QQQ271217P00560000",
        "QQQ271217C00580000",
        "QQQ271217P00540000",
        "QQQ271217C00600000",
        "QQQ271217P00520000",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_tick_interval_ms() -> u64 {
    500
}
fn default_history_bars() -> usize {
    60
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            mode: FeedMode::Mock,
            symbols: default_symbols(),
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
            history_bars: default_history_bars(),
        }
    }
}

impl FeedConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus scrape port; exporter disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.analytics.risk_free_rate.is_finite() {
            anyhow::bail!("risk_free_rate must be finite");
        }
        if self.analytics.max_contracts == 0 {
            anyhow::bail!("max_contracts must be at least 1");
        }
        if self.analytics.max_underlyings == 0 {
            anyhow::bail!("max_underlyings must be at least 1");
        }
        Ok(())
    }
}
