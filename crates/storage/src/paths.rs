//! Path resolution for originals and cached renders.
//!
//! Originals live under a two-level fan-out, `<id % 10>/<(id / 10) % 10>/<id>.jpg`.
//! Cached renders live under one of 100 shards, `<id % 100>/<id>.<size>.<digest>.jpg`,
//! where the digest is the last six hex digits of SHA-256 over salt + instructions.
//! Changing the salt renames every cache entry without deleting anything.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

use keeper_common::RenderSize;

/// Salt mixed into every cache digest. Bump to orphan the whole cache.
pub const DEFAULT_SALT: &str = "1.0";

/// Number of cache shard directories.
pub const CACHE_SHARDS: u64 = 100;

const DIGEST_SUFFIX_LEN: usize = 6;

/// Identity of one cached render.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub image_id: u64,
    pub size: RenderSize,
    pub digest: String,
}

impl CacheKey {
    pub fn new(image_id: u64, size: RenderSize, salt: &str, instructions: &str) -> Self {
        Self {
            image_id,
            size,
            digest: instruction_digest(salt, instructions),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.jpg", self)
    }

    /// File-name prefix shared by every cached render of `image_id`.
    pub fn image_prefix(image_id: u64) -> String {
        format!("{}.", image_id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.image_id, self.size, self.digest)
    }
}

/// Fixed-length hex suffix of SHA-256(salt + instructions).
pub fn instruction_digest(salt: &str, instructions: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(instructions.as_bytes());
    let full = hex::encode(hasher.finalize());
    full[full.len() - DIGEST_SUFFIX_LEN..].to_string()
}

/// Directory layout of the original store and the cache store.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    original_root: PathBuf,
    cache_root: PathBuf,
    salt: String,
}

impl StoreLayout {
    pub fn new(original_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            original_root: original_root.into(),
            cache_root: cache_root.into(),
            salt: DEFAULT_SALT.to_string(),
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn original_root(&self) -> &Path {
        &self.original_root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn original_path(&self, image_id: u64) -> PathBuf {
        self.original_root
            .join((image_id % 10).to_string())
            .join(((image_id / 10) % 10).to_string())
            .join(format!("{}.jpg", image_id))
    }

    pub fn cache_shard(&self, image_id: u64) -> PathBuf {
        self.shard_dir(image_id % CACHE_SHARDS)
    }

    /// Shard directory by index, `00` through `99`.
    pub fn shard_dir(&self, index: u64) -> PathBuf {
        self.cache_root.join(format!("{:02}", index))
    }

    pub fn cache_key(&self, image_id: u64, size: RenderSize, instructions: &str) -> CacheKey {
        CacheKey::new(image_id, size, &self.salt, instructions)
    }

    pub fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_shard(key.image_id).join(key.file_name())
    }
}
