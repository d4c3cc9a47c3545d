//! Pixel buffer types for the remote framebuffer viewer.
//!
//! - [`PixelBuffer`] - owned RGBA8 image with patch copy and crop
//! - [`scale`] - zoom scaling with nearest or linear filtering

pub mod buffer;
pub mod scale;

pub use buffer::{PixelBuffer, BYTES_PER_PIXEL};
pub use scale::{scale_full, scale_region, scaled_size, ScaleFilter};
