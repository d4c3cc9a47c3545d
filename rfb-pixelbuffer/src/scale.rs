//! Zoom scaling of a [`PixelBuffer`].
//!
//! Every local pixel samples the remote image at its centre mapped back into
//! remote space: `sx = (lx + 0.5) * 100 / zoom - 0.5`. Nearest filtering
//! takes the closest source pixel, linear filtering blends the 2x2
//! neighbourhood around `sx`.

use crate::buffer::{PixelBuffer, BYTES_PER_PIXEL};
use rayon::prelude::*;
use rfb_common::{zoom, Rect, ZoomFactor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::trace;

/// Filtering options for scaling operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleFilter {
    /// Nearest neighbor filtering (sharp, pixelated)
    #[default]
    Nearest,
    /// Linear filtering (smooth, blurred)
    Linear,
}

impl ScaleFilter {
    /// Remote pixels a dirty rectangle must be grown by before rescaling.
    ///
    /// Nearest reads one source pixel per local pixel, so one pixel of
    /// margin absorbs rounding. Linear reads a 2x2 neighbourhood and needs two.
    pub const fn margin(self) -> u32 {
        match self {
            Self::Nearest => 1,
            Self::Linear => 2,
        }
    }
}

impl fmt::Display for ScaleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => write!(f, "Nearest"),
            Self::Linear => write!(f, "Linear"),
        }
    }
}

/// Size of the zoomed image for a remote desktop of `width` x `height`.
pub fn scaled_size(width: u32, height: u32, zoom: ZoomFactor) -> (u32, u32) {
    let dim = |v: u32| {
        if v == 0 {
            0
        } else {
            zoom::to_local(v as i32, zoom).max(1) as u32
        }
    };
    (dim(width), dim(height))
}

/// Builds the complete zoomed copy of `src`, one rayon task per row.
pub fn scale_full(src: &PixelBuffer, zoom: ZoomFactor, filter: ScaleFilter) -> PixelBuffer {
    let (w, h) = scaled_size(src.width(), src.height(), zoom);
    let mut dst = PixelBuffer::new(w, h);
    if w == 0 || h == 0 || src.width() == 0 || src.height() == 0 {
        return dst;
    }

    let inv = 100.0 / zoom.percent() as f32;
    let row_bytes = w as usize * BYTES_PER_PIXEL;
    dst.data_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(ly, row)| fill_row(src, row, ly as u32, 0..w, inv, filter));

    trace!(
        "Rescaled {}x{} -> {}x{} at {} ({})",
        src.width(),
        src.height(),
        w,
        h,
        zoom,
        filter
    );
    dst
}

/// Recomputes `local` (a rectangle in `dst` coordinates) from `src`.
///
/// `local` is clipped to `dst`; pixels outside it are left untouched.
pub fn scale_region(
    src: &PixelBuffer,
    dst: &mut PixelBuffer,
    local: Rect,
    zoom: ZoomFactor,
    filter: ScaleFilter,
) {
    let Some(area) = local.clamp_to(dst.width(), dst.height()) else {
        return;
    };
    if src.width() == 0 || src.height() == 0 {
        return;
    }

    let inv = 100.0 / zoom.percent() as f32;
    let row_bytes = dst.width() as usize * BYTES_PER_PIXEL;
    let xs = area.x as u32..area.right() as u32;
    let rows = area.y as usize..area.bottom() as usize;
    for (ly, row) in dst
        .data_mut()
        .chunks_exact_mut(row_bytes)
        .enumerate()
        .skip(rows.start)
        .take(rows.len())
    {
        fill_row(src, row, ly as u32, xs.clone(), inv, filter);
    }
}

fn source_coord(l: u32, inv: f32) -> f32 {
    (l as f32 + 0.5) * inv - 0.5
}

fn fill_row(
    src: &PixelBuffer,
    row: &mut [u8],
    ly: u32,
    xs: Range<u32>,
    inv: f32,
    filter: ScaleFilter,
) {
    let sy = source_coord(ly, inv);
    for lx in xs {
        let sx = source_coord(lx, inv);
        let px = match filter {
            ScaleFilter::Nearest => sample_nearest(src, sx, sy),
            ScaleFilter::Linear => sample_linear(src, sx, sy),
        };
        let o = lx as usize * BYTES_PER_PIXEL;
        row[o..o + BYTES_PER_PIXEL].copy_from_slice(&px);
    }
}

fn clamp_index(v: f32, len: u32) -> u32 {
    (v.max(0.0) as u32).min(len - 1)
}

fn sample_nearest(src: &PixelBuffer, sx: f32, sy: f32) -> [u8; 4] {
    let x = clamp_index((sx + 0.5).floor(), src.width());
    let y = clamp_index((sy + 0.5).floor(), src.height());
    read(src, x, y)
}

fn sample_linear(src: &PixelBuffer, sx: f32, sy: f32) -> [u8; 4] {
    let sx = sx.max(0.0);
    let sy = sy.max(0.0);
    let x0 = clamp_index(sx.floor(), src.width());
    let y0 = clamp_index(sy.floor(), src.height());
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = sx - sx.floor();
    let fy = sy - sy.floor();

    let (p00, p10) = (read(src, x0, y0), read(src, x1, y0));
    let (p01, p11) = (read(src, x0, y1), read(src, x1, y1));
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f32::from(p00[c]) * (1.0 - fx) + f32::from(p10[c]) * fx;
        let bottom = f32::from(p01[c]) * (1.0 - fx) + f32::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn read(src: &PixelBuffer, x: u32, y: u32) -> [u8; 4] {
    let o = (y as usize * src.width() as usize + x as usize) * BYTES_PER_PIXEL;
    let d = src.data();
    [d[o], d[o + 1], d[o + 2], d[o + 3]]
}
