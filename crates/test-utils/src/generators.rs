//! Sample image generators.
//!
//! Images are deterministic so tests can assert on pixel values after a
//! round trip through the render transform.

use image::{Rgb, RgbImage};
use std::path::Path;

/// A horizontal-by-vertical gradient, red across and green down.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, 128])
    })
}

/// A single-colour image.
pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Write `img` to `path` as JPEG, creating parent directories.
pub fn write_jpeg(path: &Path, img: &RgbImage) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create image directory");
    }
    img.save_with_format(path, image::ImageFormat::Jpeg)
        .expect("Failed to write test JPEG");
}
