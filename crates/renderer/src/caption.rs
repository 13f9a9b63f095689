//! Caption overlays.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::fs;
use std::path::Path;

use crate::error::{RenderError, RenderResult};
use crate::instructions::Corner;

const FONT_SIZE: f32 = 16.0;

/// Distance from the image edges, in pixels.
const MARGIN: i32 = 20;

/// Regions darker than this get white ink. Biased below the 128 midpoint
/// since black text tends to look better.
const DARK_THRESHOLD: u32 = 100;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Draws captions near the bottom corners of an image.
pub struct Captioner {
    font: Font<'static>,
}

impl Captioner {
    /// Load a TrueType font from disk.
    pub fn from_file(path: &Path) -> RenderResult<Self> {
        let data = fs::read(path)?;
        let font = Font::try_from_vec(data).ok_or_else(|| RenderError::InvalidFont(path.to_path_buf()))?;
        Ok(Self { font })
    }

    /// Draw `text` at `corner`. Returns false, leaving the image untouched,
    /// when the caption does not fit.
    pub fn draw(&self, img: &mut RgbImage, corner: Corner, text: &str) -> bool {
        let scale = Scale::uniform(FONT_SIZE);
        let (text_w, text_h) = text_size(scale, &self.font, text);
        let (width, height) = (img.width() as i32, img.height() as i32);

        let y = height - text_h - MARGIN;
        let x = match corner {
            Corner::BottomLeft => MARGIN,
            Corner::BottomRight => width - text_w - MARGIN,
        };
        if y < 0 || x < 0 || x + text_w > width {
            return false;
        }

        let brightness = mean_brightness(img, x as u32, y as u32, text_w as u32, text_h as u32);
        let ink = if brightness < DARK_THRESHOLD { WHITE } else { BLACK };
        draw_text_mut(img, ink, x, y, scale, &self.font, text);
        true
    }
}

/// Mean brightness of a region, approximated by the green channel.
///
/// The region is clipped to the image; an empty region reads as 0.
pub fn mean_brightness(img: &RgbImage, x: u32, y: u32, width: u32, height: u32) -> u32 {
    let x_end = x.saturating_add(width).min(img.width());
    let y_end = y.saturating_add(height).min(img.height());

    let mut total: u64 = 0;
    let mut count: u64 = 0;
    for py in y..y_end {
        for px in x..x_end {
            total += u64::from(img.get_pixel(px, py)[1]);
            count += 1;
        }
    }

    if count == 0 {
        0
    } else {
        (total / count) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_brightness_uniform() {
        let dark = RgbImage::from_pixel(10, 10, Rgb([200, 10, 200]));
        assert_eq!(mean_brightness(&dark, 0, 0, 10, 10), 10);

        let light = RgbImage::from_pixel(10, 10, Rgb([0, 240, 0]));
        assert_eq!(mean_brightness(&light, 2, 2, 4, 4), 240);
    }

    #[test]
    fn test_mean_brightness_region_only() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        for y in 5..10 {
            for x in 0..10 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        assert_eq!(mean_brightness(&img, 0, 0, 10, 5), 0);
        assert_eq!(mean_brightness(&img, 0, 5, 10, 5), 255);
        assert_eq!(mean_brightness(&img, 0, 0, 10, 10), 127);
    }

    #[test]
    fn test_mean_brightness_clips() {
        let img = RgbImage::from_pixel(4, 4, Rgb([0, 50, 0]));
        assert_eq!(mean_brightness(&img, 2, 2, 100, 100), 50);
        assert_eq!(mean_brightness(&img, 10, 10, 5, 5), 0);
    }

    #[test]
    fn test_invalid_font_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("not-a-font.ttf");
        fs::write(&path, b"definitely not truetype").unwrap();
        assert!(matches!(
            Captioner::from_file(&path),
            Err(RenderError::InvalidFont(_))
        ));
    }
}
