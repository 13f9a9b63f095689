//! Disk cache of rendered images.
//!
//! The cache is unbounded: entries are only ever removed by an explicit
//! per-image clear. Renders are written by the render transform; this module
//! only prepares the tree, looks entries up and deletes them.

use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use keeper_common::KeeperResult;

use crate::paths::{CacheKey, StoreLayout, CACHE_SHARDS};

/// Disk cache rooted at a [`StoreLayout`]'s cache root.
#[derive(Debug, Clone)]
pub struct DiskCache {
    layout: StoreLayout,
}

impl DiskCache {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Create any missing shard directories. Returns how many were created.
    pub fn prepare(&self) -> KeeperResult<usize> {
        let mut created = 0;
        for index in 0..CACHE_SHARDS {
            let dir = self.layout.shard_dir(index);
            if !dir.is_dir() {
                fs::create_dir_all(&dir)?;
                info!(path = %dir.display(), "Created cache dir");
                created += 1;
            }
        }
        Ok(created)
    }

    /// Path of the cached render for `key`, if it exists.
    pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.layout.cache_path(key);
        path.exists().then_some(path)
    }

    /// Delete every cached render of `image_id`.
    ///
    /// Every matching file is attempted even after a failure; all errors are
    /// collected in the outcome. A missing shard means nothing was cached.
    pub fn clear(&self, image_id: u64) -> ClearOutcome {
        let shard = self.layout.cache_shard(image_id);
        let prefix = CacheKey::image_prefix(image_id);
        let mut outcome = ClearOutcome::default();

        let entries = match fs::read_dir(&shard) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %shard.display(), "No cache shard to clear");
                return outcome;
            }
            Err(e) => {
                warn!(path = %shard.display(), error = %e, "Failed to list cache shard");
                outcome.failures.push((shard, e));
                return outcome;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    outcome.failures.push((shard.clone(), e));
                    continue;
                }
            };

            let matches = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false);
            if !matches {
                continue;
            }

            let path = entry.path();
            info!(path = %path.display(), "Deleting cached render");
            match fs::remove_file(&path) {
                Ok(()) => outcome.removed.push(path),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete cached render");
                    outcome.failures.push((path, e));
                }
            }
        }

        outcome
    }
}

/// Result of clearing one image's cache entries.
#[derive(Debug, Default)]
pub struct ClearOutcome {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl ClearOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// All failure descriptions joined with `"; "`, or `None` when clean.
    pub fn error_summary(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        let messages: Vec<String> = self
            .failures
            .iter()
            .map(|(path, e)| format!("{}: {}", path.display(), e))
            .collect();
        Some(messages.join("; "))
    }
}
