//! Integration tests for greek-stream

mod concurrency_test;
mod config_test;
mod engine_test;
