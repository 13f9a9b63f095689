//! Storage abstractions for the photo keeper.
//!
//! Provides:
//! - Path resolution for the sharded original store and the render cache
//! - Disk cache maintenance (shard preparation, lookup, per-image clearing)
//! - The in-process work queue feeding the worker pool

pub mod cache;
pub mod paths;
pub mod queue;

pub use cache::{ClearOutcome, DiskCache};
pub use paths::{instruction_digest, CacheKey, StoreLayout, CACHE_SHARDS, DEFAULT_SALT};
pub use queue::WorkQueue;
