//! The render transform: original in, resized and annotated JPEG out.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::io::{Limits, Reader};
use image::{DynamicImage, ImageError, RgbImage};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::caption::Captioner;
use crate::error::{RenderError, RenderResult};
use crate::instructions::{parse_instructions, Instruction};

/// Longest edge a render may ask for, in pixels.
pub const MAX_EDGE: u32 = 4096;

/// Largest original the decoder will accept, per side.
pub const MAX_SOURCE_DIMENSION: u32 = 16_384;

/// Decoder allocation ceiling for one original.
pub const MAX_DECODE_BYTES: u64 = 512 * 1024 * 1024;

/// Produces a rendered file from an original.
///
/// Implementations must leave `dest` either absent or complete.
pub trait RenderTransform: Send + Sync {
    fn render(&self, source: &Path, dest: &Path, edge: u32, instructions: &str) -> RenderResult<()>;
}

/// Output dimensions that make the longer edge equal to `edge`, keeping the
/// aspect ratio. Neither side drops below one pixel.
pub fn target_dimensions(width: u32, height: u32, edge: u32) -> (u32, u32) {
    let (w, h) = if width > height {
        (edge, (height as f64 / width as f64 * edge as f64) as u32)
    } else {
        ((width as f64 / height as f64 * edge as f64) as u32, edge)
    };
    (w.max(1), h.max(1))
}

/// [`RenderTransform`] backed by the `image` crate.
#[derive(Default)]
pub struct ImageRenderer {
    captioner: Option<Captioner>,
}

impl ImageRenderer {
    /// A renderer without a font; caption instructions will fail.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_captioner(captioner: Captioner) -> Self {
        Self {
            captioner: Some(captioner),
        }
    }
}

impl RenderTransform for ImageRenderer {
    fn render(&self, source: &Path, dest: &Path, edge: u32, instructions: &str) -> RenderResult<()> {
        if edge == 0 || edge > MAX_EDGE {
            return Err(RenderError::InvalidSize(edge));
        }
        let steps = parse_instructions(instructions)?;

        let original = open_original(source).map_err(|e| RenderError::Open {
            path: source.to_path_buf(),
            source: e,
        })?;
        let (width, height) = target_dimensions(original.width(), original.height(), edge);
        let mut img = original
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgb8();

        for step in &steps {
            match step {
                Instruction::Rotate(rotation) => img = rotation.apply(&img),
                Instruction::Caption { corner, text } => {
                    let captioner = self.captioner.as_ref().ok_or(RenderError::FontUnavailable)?;
                    if !captioner.draw(&mut img, *corner, text) {
                        debug!(caption = %text, "Caption does not fit, skipping");
                    }
                }
            }
        }

        write_jpeg_atomically(&img, dest)
    }
}

/// Decode an original under [`MAX_SOURCE_DIMENSION`] and [`MAX_DECODE_BYTES`].
fn open_original(source: &Path) -> Result<DynamicImage, ImageError> {
    let mut reader = Reader::open(source)
        .and_then(|r| r.with_guessed_format())
        .map_err(ImageError::IoError)?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_BYTES);
    reader.limits(limits);

    reader.decode()
}

/// Encode into a temp file beside `dest`, then rename it into place.
fn write_jpeg_atomically(img: &RgbImage, dest: &Path) -> RenderResult<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".render-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        JpegEncoder::new(&mut writer).encode_image(img)?;
        writer.flush()?;
    }

    temp.persist(dest).map_err(|e| RenderError::Io(e.error))?;
    Ok(())
}
