//! Photo keeper configuration.
//!
//! Flags come from the command line, falling back to `KEEPER_*` environment
//! variables (a `.env` file is loaded first by `main`).

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use storage::{StoreLayout, DEFAULT_SALT};
use thiserror::Error;

/// Default UDP request port.
pub const DEFAULT_PORT: u16 = 4770;

#[derive(Parser, Debug, Clone)]
#[command(name = "photo-keeper")]
#[command(about = "Photo render cache served over UDP")]
pub struct Args {
    /// UDP port for requests
    #[arg(short, long, env = "KEEPER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// TCP port for the HTTP status endpoint (default: same as --port)
    #[arg(long, env = "KEEPER_STATUS_PORT")]
    pub status_port: Option<u16>,

    /// Number of request workers
    #[arg(short, long, env = "KEEPER_WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// Root of the render cache
    #[arg(short, long, env = "KEEPER_CACHE_ROOT")]
    pub cache_root: PathBuf,

    /// Root of the original images
    #[arg(short, long, env = "KEEPER_ORIGINAL_ROOT")]
    pub original_root: PathBuf,

    /// Requests older than this when a worker picks them up are answered "expired"
    #[arg(long, env = "KEEPER_EXPIRY_SECS", default_value_t = 60)]
    pub expiry_secs: u64,

    /// Salt mixed into instruction digests; change it to invalidate every cached render
    #[arg(long, env = "KEEPER_SALT", default_value = DEFAULT_SALT)]
    pub salt: String,

    /// TrueType font for TEXT_LEFT / TEXT_RIGHT captions
    #[arg(long, env = "KEEPER_FONT")]
    pub font: Option<PathBuf>,

    /// How long in-flight work may run after shutdown is requested
    #[arg(long, env = "KEEPER_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    pub shutdown_grace_secs: u64,

    /// Log level
    #[arg(long, env = "KEEPER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "KEEPER_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("At least one worker is required")]
    NoWorkers,

    #[error("{flag} is not a directory: {path}")]
    NotADirectory { flag: &'static str, path: PathBuf },
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    pub udp_port: u16,
    pub status_port: u16,
    pub workers: usize,
    pub cache_root: PathBuf,
    pub original_root: PathBuf,
    pub expiry: Duration,
    pub salt: String,
    pub font: Option<PathBuf>,
    pub shutdown_grace: Duration,
}

impl KeeperConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if args.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if !args.original_root.is_dir() {
            return Err(ConfigError::NotADirectory {
                flag: "--original-root",
                path: args.original_root.clone(),
            });
        }
        // The cache root itself may be created on startup; only reject a file in the way.
        if args.cache_root.exists() && !args.cache_root.is_dir() {
            return Err(ConfigError::NotADirectory {
                flag: "--cache-root",
                path: args.cache_root.clone(),
            });
        }

        Ok(Self {
            udp_port: args.port,
            status_port: args.status_port.unwrap_or(args.port),
            workers: args.workers,
            cache_root: args.cache_root.clone(),
            original_root: args.original_root.clone(),
            expiry: Duration::from_secs(args.expiry_secs),
            salt: args.salt.clone(),
            font: args.font.clone(),
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
        })
    }

    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.original_root, &self.cache_root).with_salt(self.salt.clone())
    }
}
