//! Configuration file tests

use greek_stream::config::{Config, FeedMode};
use greek_stream::telemetry::LogFormat;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_example_config_loads() {
    let config = Config::parse(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.analytics.risk_free_rate, 0.05);
    assert_eq!(config.feed.mode, FeedMode::Mock);
    assert_eq!(config.feed.symbols.len(), 9);
    assert_eq!(config.feed.seed, Some(42));
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert!(config.telemetry.metrics_port.is_none());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [analytics]
        risk_free_rate = 0.043
        recompute_throttle_ms = 250
        analysis_interval_secs = 0

        [telemetry]
        log_format = "json"
        metrics_port = 9100
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.analytics.risk_free_rate, 0.043);
    assert_eq!(config.analytics.recompute_throttle(), Duration::from_millis(250));
    // Interval is floored at one second
    assert_eq!(config.analytics.analysis_interval(), Duration::from_secs(1));
    assert_eq!(config.analytics.max_contracts, 100);
    assert_eq!(config.telemetry.log_format, LogFormat::Json);
    assert_eq!(config.telemetry.metrics_port, Some(9100));
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_invalid_values_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[analytics]\nmax_contracts = 0").unwrap();
    assert!(Config::load(file.path()).is_err());

    assert!(Config::parse("[feed]\nmode = \"websocket\"").is_err());
}

#[test]
fn test_effective_config_round_trips_through_toml() {
    let config = Config::parse("[feed]\nseed = 7").unwrap();
    let text = toml::to_string_pretty(&config).unwrap();
    let reparsed = Config::parse(&text).unwrap();
    assert_eq!(reparsed.feed.seed, Some(7));
    assert_eq!(reparsed.feed.symbols, config.feed.symbols);
}
