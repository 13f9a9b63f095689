//! Render transform errors.

use std::path::PathBuf;
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Bogus instruction command: {0}")]
    UnknownCommand(String),

    #[error("Caption requested but no font is configured")]
    FontUnavailable,

    #[error("Invalid font data in {0}")]
    InvalidFont(PathBuf),

    #[error("Target edge length {0} is outside 1..={max}", max = crate::transform::MAX_EDGE)]
    InvalidSize(u32),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
