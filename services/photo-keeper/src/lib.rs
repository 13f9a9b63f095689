//! Photo keeper: an on-disk render cache fronted by a UDP request protocol.
//!
//! Control flow: the dispatch loop parses datagrams into requests and pushes
//! them onto the work queue; a fixed pool of workers resolves each request
//! against the cache (rendering on a miss) and hands the answer back to the
//! dispatch loop, which sends the reply. Workers update the stats registry,
//! which the status endpoint serves over HTTP.

pub mod config;
pub mod dispatch;
pub mod logbuf;
pub mod stats;
pub mod status;
pub mod worker;

pub use config::{Args, ConfigError, KeeperConfig};
pub use dispatch::Dispatcher;
pub use logbuf::{LogBuffer, LOG_CAPACITY};
pub use stats::{Stats, StatsSnapshot};
pub use status::StatusState;
pub use worker::{spawn_workers, Worker};
