//! Load testing and smoke-test client for the photo keeper.
//!
//! This crate provides tools to:
//! - Send single render and clear-cache requests over UDP
//! - Fire concurrent bursts of render requests
//! - Collect latency percentiles and reply outcomes
//! - Output results as a console table or JSON

pub mod client;
pub mod metrics;
pub mod report;
pub mod runner;

pub use client::{KeeperClient, ReplyKind};
pub use metrics::{MetricsCollector, TestResults};
pub use report::ResultsReport;
pub use runner::{BurstConfig, BurstRunner};
