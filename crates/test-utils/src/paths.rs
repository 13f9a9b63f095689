//! Path utilities for locating optional test resources.

use std::path::PathBuf;

/// Fonts commonly installed on Linux distributions.
const CANDIDATE_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Searches for a TrueType font usable in caption tests.
///
/// Checks the `TEST_FONT` environment variable first, then a few
/// well-known system locations.
pub fn find_test_font() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(font) = std::env::var("TEST_FONT") {
        candidates.push(PathBuf::from(font));
    }
    candidates.extend(CANDIDATE_FONTS.iter().map(PathBuf::from));

    candidates.into_iter().find(|path| path.is_file())
}

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_test_dir() {
        let dir = temp_test_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_find_test_font_returns_existing_file() {
        if let Some(path) = find_test_font() {
            assert!(path.is_file());
        }
    }
}
