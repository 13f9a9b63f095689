//! Render transform for the photo keeper.
//!
//! Resizes an original so its longer edge matches a requested length, then
//! applies a small line-oriented instruction language:
//! - `TEXT_LEFT <caption>` / `TEXT_RIGHT <caption>` caption overlays
//! - `ROTATE <90|180|270|h|v>` rotations and flips

pub mod caption;
pub mod error;
pub mod instructions;
pub mod transform;

pub use caption::Captioner;
pub use error::{RenderError, RenderResult};
pub use instructions::{parse_instructions, Corner, Instruction, Rotation};
pub use transform::{
    target_dimensions, ImageRenderer, RenderTransform, MAX_DECODE_BYTES, MAX_EDGE,
    MAX_SOURCE_DIMENSION,
};
