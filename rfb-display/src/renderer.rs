//! Drawing seam and per-tick composition.
//!
//! The renderer never talks to a graphics API directly. Hosts implement
//! [`Canvas`] over whatever they draw with (an `egui::Painter`, a test
//! recorder); overlay layers implement [`Renderable`]. All coordinates passed
//! to a canvas are local pixels of the zoomed image.

use rfb_common::{Point, Rect, ZoomFactor};
use rfb_session::FrameSnapshot;
use std::time::Instant;
use tracing::trace;

/// RGBA colour with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 220, 0);
    pub const RED: Color = Color::rgb(230, 30, 30);
    pub const LABEL_BACKGROUND: Color = Color::rgba(255, 255, 225, 230);

    /// Opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same colour with alpha scaled by `factor` (clamped to 0..=1).
    pub fn faded(self, factor: f32) -> Self {
        let a = (f32::from(self.a) * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

/// Minimal drawing capability a host provides.
pub trait Canvas {
    /// Blit the zoomed framebuffer image at the local origin.
    fn draw_frame(&mut self, frame: &FrameSnapshot);

    /// Outline a rectangle one pixel wide.
    fn stroke_rect(&mut self, rect: Rect, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// One pixel wide line between two points.
    fn line(&mut self, from: Point, to: Point, color: Color);

    /// Draw `text` with its top-left corner at `origin`.
    fn text(&mut self, origin: Point, text: &str, color: Color);

    /// Size of `text` in local pixels.
    fn text_size(&self, text: &str) -> (u32, u32);
}

/// Per-tick values shared by all layers.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// Zoom of the frame being drawn.
    pub zoom: ZoomFactor,
    /// Part of the zoomed image that is on screen, in local pixels.
    pub visible: Rect,
    /// Renderer tick, advanced once per rendered frame.
    pub tick: u64,
    /// Time the frame is rendered at.
    pub now: Instant,
}

/// Anything that can draw itself over the frame.
pub trait Renderable {
    fn render(&self, ctx: &RenderContext, canvas: &mut dyn Canvas);
}

/// Composes the frame and its overlay layers once per render tick.
#[derive(Debug, Default)]
pub struct ViewportRenderer {
    tick: u64,
}

impl ViewportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Draw `frame` then every layer in order, then advance the tick.
    ///
    /// Layers only read their own state; nothing here mutates the store,
    /// the overlay or the selection.
    pub fn render(
        &mut self,
        frame: &FrameSnapshot,
        visible: Rect,
        now: Instant,
        layers: &[&dyn Renderable],
        canvas: &mut dyn Canvas,
    ) {
        let ctx = RenderContext {
            zoom: frame.zoom,
            visible,
            tick: self.tick,
            now,
        };
        canvas.draw_frame(frame);
        for layer in layers {
            layer.render(&ctx, canvas);
        }
        trace!(
            "Rendered tick {} (version {}, {} layers)",
            self.tick,
            frame.version,
            layers.len()
        );
        self.tick = self.tick.wrapping_add(1);
    }
}

/// Length of one marching-ants dash in local pixels.
pub const DASH_LENGTH: i32 = 4;

/// Local pixels the marching-ants pattern moves on every render tick.
pub const ANT_STEP: i32 = 1;

/// Draw a dashed rectangle border whose dashes alternate between two colours.
///
/// The pattern moves forward along the outline by [`ANT_STEP`] pixels per
/// tick, so the border appears to crawl around the rectangle.
pub fn marching_ants(canvas: &mut dyn Canvas, rect: Rect, tick: u64, colors: (Color, Color)) {
    let (l, t) = (rect.x, rect.y);
    let (r, b) = (rect.right(), rect.bottom());
    let corners = [
        Point::new(l, t),
        Point::new(r, t),
        Point::new(r, b),
        Point::new(l, b),
        Point::new(l, t),
    ];

    let period = 2 * DASH_LENGTH;
    let phase = ((tick % period as u64) * ANT_STEP as u64 % period as u64) as i32;
    // Distance along the outline, shifted back by the phase
    let mut walked = period - phase;
    for pair in corners.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let len = (to.x - from.x).abs().max((to.y - from.y).abs());
        let (dx, dy) = ((to.x - from.x).signum(), (to.y - from.y).signum());
        let mut pos = 0;
        while pos < len {
            let end = (pos + DASH_LENGTH - walked % DASH_LENGTH).min(len);
            let color = if (walked / DASH_LENGTH) % 2 == 0 {
                colors.0
            } else {
                colors.1
            };
            canvas.line(
                Point::new(from.x + dx * pos, from.y + dy * pos),
                Point::new(from.x + dx * end, from.y + dy * end),
                color,
            );
            walked += end - pos;
            pos = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lines(Vec<(Point, Point, Color)>);

    impl Canvas for Lines {
        fn draw_frame(&mut self, _frame: &FrameSnapshot) {}
        fn stroke_rect(&mut self, _rect: Rect, _color: Color) {}
        fn fill_rect(&mut self, _rect: Rect, _color: Color) {}
        fn line(&mut self, from: Point, to: Point, color: Color) {
            self.0.push((from, to, color));
        }
        fn text(&mut self, _origin: Point, _text: &str, _color: Color) {}
        fn text_size(&self, text: &str) -> (u32, u32) {
            (text.len() as u32 * 6, 10)
        }
    }

    #[test]
    fn test_faded_color() {
        assert_eq!(Color::WHITE.faded(0.5).a, 128);
        assert_eq!(Color::WHITE.faded(2.0).a, 255);
        assert_eq!(Color::WHITE.faded(-1.0).a, 0);
    }

    #[test]
    fn test_marching_ants_covers_perimeter() {
        let mut canvas = Lines::default();
        marching_ants(
            &mut canvas,
            Rect::new(0, 0, 8, 4),
            0,
            (Color::BLACK, Color::WHITE),
        );
        // 8/4 + 4/4 + 8/4 + 4/4 dashes
        assert_eq!(canvas.0.len(), 6);
        assert_eq!(canvas.0[0], (Point::new(0, 0), Point::new(4, 0), Color::BLACK));
        assert_eq!(canvas.0[1].2, Color::WHITE);
        assert_eq!(canvas.0[5].1, Point::new(0, 0));
    }

    #[test]
    fn test_marching_ants_advance_every_tick() {
        let rect = Rect::new(0, 0, 8, 8);
        let draw = |tick| {
            let mut lines = Lines::default();
            marching_ants(&mut lines, rect, tick, (Color::BLACK, Color::WHITE));
            lines.0
        };

        for tick in 0..20 {
            assert_ne!(draw(tick), draw(tick + 1), "tick {tick}");
        }
        // One pixel forward: the leading white dash now shows its last pixel
        assert_eq!(
            draw(1)[..2],
            [
                (Point::new(0, 0), Point::new(1, 0), Color::WHITE),
                (Point::new(1, 0), Point::new(5, 0), Color::BLACK),
            ]
        );
        let period = (2 * DASH_LENGTH / ANT_STEP) as u64;
        assert_eq!(draw(3), draw(3 + period));
    }
}
