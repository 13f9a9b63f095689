//! Store fixtures.
//!
//! A [`StoreFixture`] owns a temp directory holding an `orig/` tree and a
//! `cache/` tree. Originals are placed with the production fan-out
//! (`<id % 10>/<(id / 10) % 10>/<id>.jpg`), computed here independently so
//! tests also check the resolver.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::generators::{gradient_image, write_jpeg};

pub struct StoreFixture {
    dir: TempDir,
}

impl StoreFixture {
    /// Empty `orig/` and `cache/` roots.
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("keeper_")
            .tempdir()
            .expect("Failed to create store fixture");
        std::fs::create_dir_all(dir.path().join("orig")).expect("Failed to create orig root");
        std::fs::create_dir_all(dir.path().join("cache")).expect("Failed to create cache root");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn original_root(&self) -> PathBuf {
        self.dir.path().join("orig")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    /// Where the original for `image_id` is expected.
    pub fn original_path(&self, image_id: u64) -> PathBuf {
        self.original_root()
            .join((image_id % 10).to_string())
            .join(((image_id / 10) % 10).to_string())
            .join(format!("{}.jpg", image_id))
    }

    /// Write a gradient JPEG original for `image_id`.
    pub fn install_original(&self, image_id: u64, width: u32, height: u32) -> PathBuf {
        let path = self.original_path(image_id);
        write_jpeg(&path, &gradient_image(width, height));
        path
    }

    /// All files currently under the cache root, sorted.
    pub fn cache_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.cache_root(), &mut files);
        files.sort();
        files
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}
