//! Instruction language parser.
//!
//! One `COMMAND ARG` per line. Lines without a space are ignored, the
//! command word is case-insensitive, and an unknown command fails the whole
//! render. An unknown `ROTATE` argument is skipped rather than rejected.

use image::{imageops, RgbImage};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// Bottom corner a caption is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    BottomLeft,
    BottomRight,
}

/// Rotation angles are counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
}

impl Rotation {
    pub fn parse(arg: &str) -> Option<Self> {
        match arg {
            "90" => Some(Rotation::Rotate90),
            "180" => Some(Rotation::Rotate180),
            "270" => Some(Rotation::Rotate270),
            "h" => Some(Rotation::FlipHorizontal),
            "v" => Some(Rotation::FlipVertical),
            _ => None,
        }
    }

    pub fn apply(self, img: &RgbImage) -> RgbImage {
        match self {
            // imageops rotates clockwise
            Rotation::Rotate90 => imageops::rotate270(img),
            Rotation::Rotate180 => imageops::rotate180(img),
            Rotation::Rotate270 => imageops::rotate90(img),
            Rotation::FlipHorizontal => imageops::flip_horizontal(img),
            Rotation::FlipVertical => imageops::flip_vertical(img),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Caption { corner: Corner, text: String },
    Rotate(Rotation),
}

/// Parse instruction text into steps, in order.
pub fn parse_instructions(text: &str) -> RenderResult<Vec<Instruction>> {
    let mut steps = Vec::new();

    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        let Some((command, arg)) = line.split_once(' ') else {
            continue;
        };

        match command.to_uppercase().as_str() {
            "TEXT_LEFT" => steps.push(Instruction::Caption {
                corner: Corner::BottomLeft,
                text: expand_copyright(arg),
            }),
            "TEXT_RIGHT" => steps.push(Instruction::Caption {
                corner: Corner::BottomRight,
                text: expand_copyright(arg),
            }),
            "ROTATE" => match Rotation::parse(arg.trim()) {
                Some(rotation) => steps.push(Instruction::Rotate(rotation)),
                None => debug!(arg = %arg, "Skipping unknown rotation"),
            },
            other => return Err(RenderError::UnknownCommand(other.to_string())),
        }
    }

    Ok(steps)
}

fn expand_copyright(text: &str) -> String {
    text.replace("(C)", "\u{a9}").replace("(c)", "\u{a9}")
}
