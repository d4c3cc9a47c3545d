//! Owned RGBA pixel buffer.
//!
//! [`PixelBuffer`] holds a decoded framebuffer image in RGBA8 layout. Decoding
//! from the remote pixel format happens upstream in the session collaborator,
//! so every patch arriving here is already tightly packed RGBA.
//!
//! # Memory Layout
//!
//! The buffer is stored in row-major order with a stride equal to the width:
//!
//! ```text
//! Total size = W * H * 4 bytes
//! Pixel at (x, y) starts at offset: (y * W + x) * 4
//! ```
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::PixelBuffer;
//! use rfb_common::Rect;
//!
//! let mut buffer = PixelBuffer::new(100, 100);
//! buffer.fill_rect(Rect::new(10, 10, 50, 50), [255, 0, 0, 255]).unwrap();
//! assert_eq!(buffer.pixel(20, 20), Some([255, 0, 0, 255]));
//! assert_eq!(buffer.dimensions(), (100, 100));
//! ```

use anyhow::{anyhow, Result};
use rfb_common::Rect;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// An RGBA8 image that owns its pixel memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Buffer width in pixels
    width: u32,

    /// Buffer height in pixels
    height: u32,

    /// Raw pixel data (row-major, no padding)
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a buffer of the given size filled with opaque black.
    pub fn new(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
        for px in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[3] = 0xff;
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps existing RGBA data.
    ///
    /// # Errors
    ///
    /// Fails if `data` does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(anyhow!(
                "RGBA data length mismatch: got {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The full image area.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Returns a reference to the raw RGBA data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the buffer and returns its RGBA data.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Reads one pixel, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = self.offset(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[o..o + BYTES_PER_PIXEL]);
        Some(px)
    }

    /// Validates that a rectangle is within buffer bounds.
    fn validate_rect(&self, rect: Rect) -> Result<()> {
        if !self.bounds().contains_rect(&rect) {
            return Err(anyhow!(
                "Rectangle out of bounds: {:?} (buffer size: {}x{})",
                rect,
                self.width,
                self.height
            ));
        }
        Ok(())
    }

    /// Fills a rectangle with one colour.
    pub fn fill_rect(&mut self, rect: Rect, pixel: [u8; 4]) -> Result<()> {
        self.validate_rect(rect)?;
        for y in rect.y as u32..rect.bottom() as u32 {
            let start = self.offset(rect.x as u32, y);
            let end = start + rect.width as usize * BYTES_PER_PIXEL;
            for px in self.data[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&pixel);
            }
        }
        Ok(())
    }

    /// Copies a block of RGBA pixels into `dest`.
    ///
    /// `stride` is the source row length in pixels; 0 means tightly packed.
    pub fn image_rect(&mut self, dest: Rect, pixels: &[u8], stride: usize) -> Result<()> {
        self.validate_rect(dest)?;
        if dest.is_empty() {
            return Ok(());
        }

        let row_bytes = dest.width as usize * BYTES_PER_PIXEL;
        let src_stride = if stride == 0 {
            dest.width as usize
        } else {
            stride
        };
        let src_stride_bytes = src_stride * BYTES_PER_PIXEL;

        let required = src_stride_bytes * (dest.height as usize - 1) + row_bytes;
        if pixels.len() < required {
            return Err(anyhow!(
                "Insufficient source data: got {} bytes, need at least {}",
                pixels.len(),
                required
            ));
        }

        for row in 0..dest.height as usize {
            let dst = self.offset(dest.x as u32, dest.y as u32 + row as u32);
            let src = row * src_stride_bytes;
            self.data[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
        }
        Ok(())
    }

    /// Copies `rect` from `src`, which must have the same dimensions, into
    /// the same place in this buffer.
    pub fn copy_rect_from(&mut self, src: &PixelBuffer, rect: Rect) -> Result<()> {
        if src.dimensions() != self.dimensions() {
            return Err(anyhow!(
                "Source is {}x{}, destination is {}x{}",
                src.width,
                src.height,
                self.width,
                self.height
            ));
        }
        self.validate_rect(rect)?;
        let row_bytes = rect.width as usize * BYTES_PER_PIXEL;
        for y in rect.y as u32..rect.bottom() as u32 {
            let start = self.offset(rect.x as u32, y);
            self.data[start..start + row_bytes]
                .copy_from_slice(&src.data[start..start + row_bytes]);
        }
        Ok(())
    }

    /// Copies a rectangle out into a new buffer.
    pub fn crop(&self, rect: Rect) -> Result<PixelBuffer> {
        self.validate_rect(rect)?;
        let row_bytes = rect.width as usize * BYTES_PER_PIXEL;
        let mut data = Vec::with_capacity(row_bytes * rect.height as usize);
        for y in rect.y as u32..rect.bottom() as u32 {
            let start = self.offset(rect.x as u32, y);
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        PixelBuffer::from_rgba(rect.width, rect.height, data)
    }
}
