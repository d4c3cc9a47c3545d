//! Viewport management for zoom and scroll.
//!
//! The viewport tracks the window size, the remote desktop size, the zoom
//! factor and the scroll offset into the zoomed image. Window coordinates are
//! what the host's pointer events carry; local coordinates address the zoomed
//! image; remote coordinates address the desktop.

use rfb_common::{zoom, Point, Rect, ZoomFactor};
use std::fmt;
use tracing::{debug, trace};

/// Configuration for viewport behavior
#[derive(Debug, Clone)]
pub struct ViewportConfig {
    /// Zoom percentages visited by `zoom_in` / `zoom_out`, ascending.
    pub zoom_steps: Vec<u32>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            zoom_steps: vec![25, 50, 75, 100, 125, 150, 200, 300, 400],
        }
    }
}

/// Current viewport state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportState {
    /// Window dimensions in pixels
    pub window_width: u32,
    pub window_height: u32,
    /// Remote desktop dimensions in pixels
    pub desktop_width: u32,
    pub desktop_height: u32,
    /// Current zoom
    pub zoom: ZoomFactor,
    /// Scroll offset into the zoomed image, in local pixels
    pub scroll_x: i32,
    pub scroll_y: i32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            desktop_width: 800,
            desktop_height: 600,
            zoom: ZoomFactor::NATIVE,
            scroll_x: 0,
            scroll_y: 0,
        }
    }
}

impl fmt::Display for ViewportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Viewport(win={}x{}, desktop={}x{}, zoom={}, scroll={},{})",
            self.window_width,
            self.window_height,
            self.desktop_width,
            self.desktop_height,
            self.zoom,
            self.scroll_x,
            self.scroll_y
        )
    }
}

/// Viewport manager for zoom, scroll and coordinate transformations
pub struct Viewport {
    config: ViewportConfig,
    state: ViewportState,
}

impl Viewport {
    /// Create a new viewport with the specified configuration
    pub fn new(config: ViewportConfig) -> Self {
        debug!("Creating viewport with config: {:?}", config);
        Self {
            config,
            state: ViewportState::default(),
        }
    }

    /// Get the current viewport state
    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    /// Current zoom
    pub fn zoom(&self) -> ZoomFactor {
        self.state.zoom
    }

    /// Set the window size (called on window resize)
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        if self.state.window_width != width || self.state.window_height != height {
            debug!("Viewport window size changed to {}x{}", width, height);
            self.state.window_width = width;
            self.state.window_height = height;
            self.clamp_scroll();
        }
    }

    /// Set the desktop size (called when a session connects)
    pub fn set_desktop_size(&mut self, width: u32, height: u32) {
        if self.state.desktop_width != width || self.state.desktop_height != height {
            debug!("Viewport desktop size changed to {}x{}", width, height);
            self.state.desktop_width = width;
            self.state.desktop_height = height;
            self.clamp_scroll();
        }
    }

    /// Set zoom, keeping the remote point at the window centre in place
    pub fn set_zoom(&mut self, zoom: ZoomFactor) {
        if self.state.zoom == zoom {
            return;
        }
        let centre = Point::new(
            self.state.window_width as i32 / 2,
            self.state.window_height as i32 / 2,
        );
        let anchor = self.window_to_remote(centre);
        debug!("Zoom changed from {} to {}", self.state.zoom, zoom);
        self.state.zoom = zoom;

        let local = zoom::point_to_local(anchor, zoom);
        self.set_scroll(local.x - centre.x, local.y - centre.y);
    }

    /// Next larger configured step, if any
    pub fn zoom_in_step(&self) -> Option<ZoomFactor> {
        let current = self.state.zoom.percent();
        self.config
            .zoom_steps
            .iter()
            .find(|&&p| p > current)
            .and_then(|&p| ZoomFactor::new(i64::from(p)).ok())
    }

    /// Next smaller configured step, if any
    pub fn zoom_out_step(&self) -> Option<ZoomFactor> {
        let current = self.state.zoom.percent();
        self.config
            .zoom_steps
            .iter()
            .rev()
            .find(|&&p| p < current)
            .and_then(|&p| ZoomFactor::new(i64::from(p)).ok())
    }

    /// Size of the zoomed image in local pixels
    pub fn local_size(&self) -> (u32, u32) {
        let z = self.state.zoom;
        (
            z.to_local(self.state.desktop_width as i32).max(0) as u32,
            z.to_local(self.state.desktop_height as i32).max(0) as u32,
        )
    }

    /// Set the scroll offset, clamped so the image never scrolls past its edge
    pub fn set_scroll(&mut self, x: i32, y: i32) {
        let (max_x, max_y) = self.max_scroll();
        let (x, y) = (x.clamp(0, max_x), y.clamp(0, max_y));
        if x != self.state.scroll_x || y != self.state.scroll_y {
            trace!("Scroll changed to ({}, {})", x, y);
            self.state.scroll_x = x;
            self.state.scroll_y = y;
        }
    }

    /// Scroll by a delta in local pixels
    pub fn scroll_by(&mut self, dx: i32, dy: i32) {
        self.set_scroll(self.state.scroll_x + dx, self.state.scroll_y + dy);
    }

    fn max_scroll(&self) -> (i32, i32) {
        let (w, h) = self.local_size();
        (
            (w as i32 - self.state.window_width as i32).max(0),
            (h as i32 - self.state.window_height as i32).max(0),
        )
    }

    fn clamp_scroll(&mut self) {
        self.set_scroll(self.state.scroll_x, self.state.scroll_y);
    }

    /// Part of the zoomed image currently on screen, in local pixels
    pub fn visible_rect(&self) -> Rect {
        let (w, h) = self.local_size();
        Rect::new(
            self.state.scroll_x,
            self.state.scroll_y,
            w.saturating_sub(self.state.scroll_x as u32)
                .min(self.state.window_width),
            h.saturating_sub(self.state.scroll_y as u32)
                .min(self.state.window_height),
        )
    }

    /// Window point to local image point
    pub fn window_to_local(&self, p: Point) -> Point {
        Point::new(p.x + self.state.scroll_x, p.y + self.state.scroll_y)
    }

    /// Local image point to window point
    pub fn local_to_window(&self, p: Point) -> Point {
        Point::new(p.x - self.state.scroll_x, p.y - self.state.scroll_y)
    }

    /// Window point to remote desktop point
    pub fn window_to_remote(&self, p: Point) -> Point {
        zoom::point_to_remote(self.window_to_local(p), self.state.zoom)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}
