//! Process-wide request statistics.
//!
//! Counters are atomics written by the workers and the dispatch loop and
//! read without coordination by the status endpoint, so a snapshot may mix
//! values from either side of a concurrent update. No increments are lost.
//! The last instruction text is the one field behind a lock.
//! Every update is mirrored to the `metrics` facade for Prometheus.

use metrics::{counter, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Version of the request protocol, reported in the stats dump.
pub const PROTOCOL_VERSION: &str = "1.2";

#[derive(Debug, Default)]
pub struct Stats {
    requests: AtomicU64,
    requests_expired: AtomicU64,
    cache_hits: AtomicU64,
    missing_files: AtomicU64,
    render_failures: AtomicU64,
    replies_sent: AtomicU64,
    /// Stored as microseconds for atomic ops
    worker_time_us: AtomicU64,
    latency_us: AtomicU64,
    render_instructions: Mutex<String>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_expired(&self) {
        self.requests_expired.fetch_add(1, Ordering::Relaxed);
        counter!("keeper_requests_expired_total").increment(1);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("keeper_cache_hits_total").increment(1);
    }

    pub fn record_missing_file(&self) {
        self.missing_files.fetch_add(1, Ordering::Relaxed);
        counter!("keeper_missing_files_total").increment(1);
    }

    pub fn record_render_failure(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
        counter!("keeper_render_failures_total").increment(1);
    }

    /// Record a request a worker finished (expired requests excluded).
    pub fn record_handled(&self, instructions: &str, worker_time: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.worker_time_us
            .fetch_add(worker_time.as_micros() as u64, Ordering::Relaxed);

        let mut last = self
            .render_instructions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last.clear();
        last.push_str(instructions);

        counter!("keeper_requests_total").increment(1);
        histogram!("keeper_worker_seconds").record(worker_time.as_secs_f64());
    }

    /// Record a reply sent by the dispatch loop.
    pub fn record_reply(&self, latency: Duration) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
        self.latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);

        counter!("keeper_replies_total").increment(1);
        histogram!("keeper_latency_seconds").record(latency.as_secs_f64());
    }

    pub fn snapshot(&self, queue_depth: usize) -> StatsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let replies_sent = self.replies_sent.load(Ordering::Relaxed);
        let worker_time_total = micros_to_secs(self.worker_time_us.load(Ordering::Relaxed));
        let latency_total = micros_to_secs(self.latency_us.load(Ordering::Relaxed));
        let render_instructions = self
            .render_instructions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        StatsSnapshot {
            requests,
            requests_expired: self.requests_expired.load(Ordering::Relaxed),
            cache_hits,
            cache_hit_rate: ratio(cache_hits as f64, requests),
            missing_files: self.missing_files.load(Ordering::Relaxed),
            render_failures: self.render_failures.load(Ordering::Relaxed),
            replies_sent,
            queue_depth,
            worker_time_total,
            worker_time_mean: ratio(worker_time_total, requests),
            latency_total,
            latency_mean: ratio(latency_total, replies_sent),
            render_instructions,
            version: PROTOCOL_VERSION,
        }
    }
}

fn micros_to_secs(us: u64) -> f64 {
    us as f64 / 1_000_000.0
}

fn ratio(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Point-in-time copy of the registry. Times are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub requests_expired: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub missing_files: u64,
    pub render_failures: u64,
    pub replies_sent: u64,
    pub queue_depth: usize,
    pub worker_time_total: f64,
    pub worker_time_mean: f64,
    pub latency_total: f64,
    pub latency_mean: f64,
    pub render_instructions: String,
    pub version: &'static str,
}

impl StatsSnapshot {
    /// Key/value pairs sorted by key.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("cache_hit_rate", format!("{:.4}", self.cache_hit_rate)),
            ("cache_hits", self.cache_hits.to_string()),
            ("latency_mean", format!("{:.6}", self.latency_mean)),
            ("latency_total", format!("{:.6}", self.latency_total)),
            ("missing_files", self.missing_files.to_string()),
            ("queue_depth", self.queue_depth.to_string()),
            ("render_failures", self.render_failures.to_string()),
            ("render_instructions", self.render_instructions.escape_debug().to_string()),
            ("replies_sent", self.replies_sent.to_string()),
            ("requests", self.requests.to_string()),
            ("requests_expired", self.requests_expired.to_string()),
            ("version", self.version.to_string()),
            ("worker_time_mean", format!("{:.6}", self.worker_time_mean)),
            ("worker_time_total", format!("{:.6}", self.worker_time_total)),
        ];
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// One `key value` line per stat.
    pub fn render_text(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(key, value)| format!("{} {}\n", key, value))
            .collect()
    }
}
