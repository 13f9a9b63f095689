//! Burst orchestration: N concurrent clients issuing render requests.

use crate::client::{KeeperClient, ReplyKind};
use crate::metrics::{MetricsCollector, TestResults};
use indicatif::{ProgressBar, ProgressStyle};
use keeper_common::RenderSize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Parameters of one burst.
#[derive(Debug, Clone)]
pub struct BurstConfig {
    pub server: SocketAddr,
    /// Concurrent clients, each with its own socket.
    pub concurrency: u32,
    /// Total requests across all clients.
    pub requests: u64,
    pub image_ids: Vec<u64>,
    pub sizes: Vec<u32>,
    pub instructions: String,
    pub timeout: Duration,
    /// Fixed seed for a reproducible request mix.
    pub seed: Option<u64>,
}

impl BurstConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.image_ids.is_empty() || self.image_ids.contains(&0) {
            anyhow::bail!("image ids must be non-empty and positive");
        }
        if self.sizes.is_empty() {
            anyhow::bail!("at least one size is required");
        }
        Ok(())
    }
}

pub struct BurstRunner {
    config: BurstConfig,
}

impl BurstRunner {
    pub fn new(config: BurstConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> anyhow::Result<TestResults> {
        self.config.validate()?;

        let pb = ProgressBar::new(self.config.requests);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("##-"),
        );

        let metrics = Arc::new(Mutex::new(MetricsCollector::new()));
        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        let start = Instant::now();

        let mut tasks = Vec::new();
        for index in 0..self.config.concurrency {
            let share = share_of(self.config.requests, self.config.concurrency, index);
            let config = self.config.clone();
            let metrics = Arc::clone(&metrics);
            let pb = pb.clone();
            let mut client = KeeperClient::connect(config.server, config.timeout).await?;
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(u64::from(index)));

            tasks.push(tokio::spawn(async move {
                for _ in 0..share {
                    let image_id = config.image_ids[rng.gen_range(0..config.image_ids.len())];
                    let edge = config.sizes[rng.gen_range(0..config.sizes.len())];
                    let result = client
                        .request(image_id, RenderSize::Edge(edge), &config.instructions)
                        .await;

                    let mut m = metrics.lock().await;
                    match result {
                        Ok((reply, latency)) => {
                            m.record_reply(&ReplyKind::classify(&reply), latency)
                        }
                        Err(e) => {
                            m.record_timeout();
                            pb.println(format!("Request for {} failed: {}", image_id, e));
                        }
                    }
                    drop(m);
                    pb.inc(1);
                }
            }));
        }

        for task in tasks {
            task.await?;
        }
        pb.finish_with_message("Complete!");

        let m = metrics.lock().await;
        Ok(m.results(
            format!("{} x {}", self.config.concurrency, self.config.server),
            self.config.concurrency,
            start.elapsed(),
        ))
    }
}

/// Requests handled by client `index` when `total` is spread over `clients`.
fn share_of(total: u64, clients: u32, index: u32) -> u64 {
    let clients = u64::from(clients);
    let index = u64::from(index);
    total / clients + u64::from(index < total % clients)
}
