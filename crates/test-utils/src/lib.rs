//! Shared test utilities for the photo-keeper workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Throwaway original/cache store trees laid out like production
//! - Sample image generators
//! - Lookup of an optional system font for caption tests
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{require_font, StoreFixture};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro to skip a test if no TrueType font is available.
///
/// Caption rendering needs a real font, which CI images may not ship.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_font;
///
/// #[test]
/// fn test_caption() {
///     let font = require_font!();
///     // Test code using font path...
/// }
/// ```
///
/// If no font is found, the test prints a skip message and returns early.
#[macro_export]
macro_rules! require_font {
    () => {{
        match $crate::find_test_font() {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: No TrueType font found. Set TEST_FONT to a .ttf file.");
                return;
            }
        }
    }};
}
