//! Metrics collection and statistics.

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::client::ReplyKind;

/// Collects metrics during a burst.
pub struct MetricsCollector {
    histogram: Histogram<u64>,
    requests_total: u64,
    replies: u64,
    timeouts: u64,
    outcomes: BTreeMap<&'static str, u64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new(3).expect("Failed to create histogram"),
            requests_total: 0,
            replies: 0,
            timeouts: 0,
            outcomes: BTreeMap::new(),
        }
    }

    /// Record a reply that arrived after `latency`.
    pub fn record_reply(&mut self, kind: &ReplyKind, latency: Duration) {
        self.requests_total += 1;
        self.replies += 1;
        self.histogram.record(latency.as_micros() as u64).ok();
        *self.outcomes.entry(kind.label()).or_insert(0) += 1;
    }

    /// Record a request that never got a reply.
    pub fn record_timeout(&mut self) {
        self.requests_total += 1;
        self.timeouts += 1;
    }

    pub fn results(&self, name: String, concurrency: u32, elapsed: Duration) -> TestResults {
        let duration_secs = elapsed.as_secs_f64();
        let rps = if duration_secs > 0.0 {
            self.replies as f64 / duration_secs
        } else {
            0.0
        };
        let ms = |us: u64| us as f64 / 1000.0;

        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            name,
            duration_secs,
            total_requests: self.requests_total,
            replies: self.replies,
            timeouts: self.timeouts,
            replies_per_second: rps,
            latency_p50: ms(self.histogram.value_at_percentile(50.0)),
            latency_p90: ms(self.histogram.value_at_percentile(90.0)),
            latency_p95: ms(self.histogram.value_at_percentile(95.0)),
            latency_p99: ms(self.histogram.value_at_percentile(99.0)),
            latency_min: ms(self.histogram.min()),
            latency_max: ms(self.histogram.max()),
            latency_avg: self.histogram.mean() / 1000.0,
            outcomes: self
                .outcomes
                .iter()
                .map(|(label, count)| (label.to_string(), *count))
                .collect(),
            concurrency,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Final burst results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub name: String,
    pub duration_secs: f64,
    pub total_requests: u64,
    pub replies: u64,
    pub timeouts: u64,
    pub replies_per_second: f64,

    // Latency percentiles (ms)
    pub latency_p50: f64,
    pub latency_p90: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub latency_min: f64,
    pub latency_max: f64,
    pub latency_avg: f64,

    /// Reply count per outcome label.
    pub outcomes: BTreeMap<String, u64>,
    pub concurrency: u32,
}
