//! Photo keeper daemon.
//!
//! Answers UDP render requests from an on-disk cache, rendering on a miss,
//! and serves a plain-text status endpoint over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

use photo_keeper::status::{self, StatusState};
use photo_keeper::{
    spawn_workers, Args, Dispatcher, KeeperConfig, LogBuffer, Stats, Worker, LOG_CAPACITY,
};
use renderer::{Captioner, ImageRenderer, RenderTransform};
use storage::{DiskCache, WorkQueue};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_buffer = LogBuffer::new(LOG_CAPACITY);
    init_tracing(&args, log_buffer.clone())?;

    let config = KeeperConfig::from_args(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(async_main(config.clone(), log_buffer));

    // Workers are never joined; in-flight renders get a bounded grace period.
    runtime.shutdown_timeout(config.shutdown_grace);
    info!("Photo keeper stopped");
    result
}

fn init_tracing(args: &Args, log_buffer: LogBuffer) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(std::io::stdout.and(log_buffer));

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn async_main(config: KeeperConfig, log_buffer: LogBuffer) -> Result<()> {
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let cache = DiskCache::new(config.layout());
    let created = cache.prepare().context("Failed to prepare cache shards")?;
    info!(
        cache_root = %config.cache_root.display(),
        original_root = %config.original_root.display(),
        created_shards = created,
        "Cache ready"
    );

    let renderer: Arc<dyn RenderTransform> = match &config.font {
        Some(path) => {
            let captioner = Captioner::from_file(path)
                .with_context(|| format!("Failed to load font {}", path.display()))?;
            Arc::new(ImageRenderer::with_captioner(captioner))
        }
        None => {
            warn!("No caption font configured; TEXT_LEFT/TEXT_RIGHT renders will fail");
            Arc::new(ImageRenderer::new())
        }
    };

    let stats = Arc::new(Stats::new());
    let queue = WorkQueue::new();
    let (answer_tx, answer_rx) = mpsc::unbounded_channel();

    let dispatcher = Dispatcher::bind(
        ("0.0.0.0", config.udp_port),
        queue.clone(),
        answer_rx,
        Arc::clone(&stats),
    )
    .await
    .with_context(|| format!("Can't bind UDP port {}", config.udp_port))?;

    let listener = TcpListener::bind(("0.0.0.0", config.status_port))
        .await
        .with_context(|| format!("Can't bind status port {}", config.status_port))?;
    let status_state = StatusState {
        stats: Arc::clone(&stats),
        queue: queue.clone(),
        log: log_buffer,
        prometheus: Some(prometheus_handle),
    };
    tokio::spawn(async move {
        if let Err(e) = status::serve(listener, status_state).await {
            error!(error = %e, "Status endpoint failed");
        }
    });
    info!(port = config.status_port, "Status endpoint listening");

    let worker = Arc::new(Worker::new(cache, renderer, stats, config.expiry));
    spawn_workers(config.workers, worker, queue, answer_tx);

    info!(
        port = config.udp_port,
        workers = config.workers,
        expiry_secs = config.expiry.as_secs(),
        "Photo keeper listening"
    );
    dispatcher.run(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
