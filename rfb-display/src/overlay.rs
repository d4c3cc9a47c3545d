//! Short-lived markers over recently updated regions.

use crate::renderer::{Canvas, Color, RenderContext, Renderable};
use rfb_common::{zoom, Point, Rect};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::trace;

/// Oldest entries are discarded beyond this many.
pub const MAX_REGIONS: usize = 512;

/// Side of the square drawn for a pixel mark, in local pixels.
pub const PIXEL_MARK_SIZE: u32 = 5;

/// Where a flash came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// A patch from the remote session.
    FrameUpdate,
    /// A single pixel marked by the viewer's owner.
    PixelMark,
}

/// One flashed region in remote coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRegion {
    pub rect: Rect,
    pub kind: RegionKind,
    pub created: Instant,
}

/// Time-decayed flashes for frame updates and pixel marks.
#[derive(Debug)]
pub struct UpdateFlashOverlay {
    regions: VecDeque<UpdateRegion>,
    duration: Duration,
    enabled: bool,
}

impl UpdateFlashOverlay {
    pub fn new(duration: Duration, enabled: bool) -> Self {
        Self {
            regions: VecDeque::new(),
            duration,
            enabled,
        }
    }

    /// Flash a patched rectangle. Ignored while update flashing is off.
    pub fn add_frame_update(&mut self, rect: Rect, now: Instant) {
        if self.enabled {
            self.push(rect, RegionKind::FrameUpdate, now);
        }
    }

    /// Mark a single remote pixel.
    pub fn add_pixel_mark(&mut self, point: Point, now: Instant) {
        self.push(Rect::new(point.x, point.y, 1, 1), RegionKind::PixelMark, now);
    }

    fn push(&mut self, rect: Rect, kind: RegionKind, created: Instant) {
        if self.regions.len() == MAX_REGIONS {
            self.regions.pop_front();
        }
        self.regions.push_back(UpdateRegion {
            rect,
            kind,
            created,
        });
    }

    /// Drop every entry older than the display duration.
    pub fn prune(&mut self, now: Instant) {
        let before = self.regions.len();
        let duration = self.duration;
        self.regions
            .retain(|r| now.saturating_duration_since(r.created) < duration);
        let removed = before - self.regions.len();
        if removed > 0 {
            trace!("Pruned {} flash regions", removed);
        }
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Turn update flashing on or off; turning it off clears frame-update flashes.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.regions.retain(|r| r.kind == RegionKind::PixelMark);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = &UpdateRegion> {
        self.regions.iter()
    }

    /// Remaining opacity of an entry, 1.0 when new and 0.0 once expired.
    pub fn alpha(&self, region: &UpdateRegion, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        let age = now.saturating_duration_since(region.created);
        (1.0 - age.as_secs_f32() / self.duration.as_secs_f32()).max(0.0)
    }
}

impl Renderable for UpdateFlashOverlay {
    fn render(&self, ctx: &RenderContext, canvas: &mut dyn Canvas) {
        for region in &self.regions {
            let alpha = self.alpha(region, ctx.now);
            if alpha <= 0.0 {
                continue;
            }
            match region.kind {
                RegionKind::FrameUpdate => {
                    let local = zoom::rect_to_local_rounded(region.rect, ctx.zoom);
                    if local.intersects(ctx.visible) {
                        canvas.stroke_rect(local, Color::YELLOW.faded(alpha));
                    }
                }
                RegionKind::PixelMark => {
                    let c = zoom::point_to_local(region.rect.origin(), ctx.zoom);
                    let half = (PIXEL_MARK_SIZE / 2) as i32;
                    let square =
                        Rect::new(c.x - half, c.y - half, PIXEL_MARK_SIZE, PIXEL_MARK_SIZE);
                    if square.intersects(ctx.visible) {
                        canvas.fill_rect(square, Color::RED.faded(alpha));
                    }
                }
            }
        }
    }
}
