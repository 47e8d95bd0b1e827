//! greek-stream: streaming options analytics
//!
//! This library provides the core components for:
//! - Black-Scholes pricing with Greeks through third order
//! - Robust implied volatility inversion
//! - Realized volatility from OHLC history and IV-vs-RV analysis
//! - A concurrent, throttled per-contract analytics store
//! - Volatility smile construction and term structure
//! - Higher-order Greek dislocation signals
//! - Mock tick feed and an async runtime around the engine
//! - Full observability stack

pub mod cli;
pub mod config;
pub mod contract;
pub mod dislocation;
pub mod engine;
pub mod feed;
pub mod model;
pub mod smile;
pub mod store;
pub mod telemetry;
pub mod volatility;
