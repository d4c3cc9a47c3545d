//! Interactive rectangle (or point) selection over the remote desktop.
//!
//! The selector works in remote coordinates so a selection stays attached to
//! the same desktop pixels when the zoom changes. The owner converts pointer
//! positions before calling in and sets the hit-test tolerance for the
//! current zoom.
//!
//! ```text
//! Idle --press--> Defining --release--> Defined --press on handle--> Resizing
//!                    ^                     |  ^                          |
//!                    +----press on miss----+  +--------release-----------+
//! ```
//!
//! `commit` and `cancel` return the selector to `Idle` from any state.

use crate::renderer::{marching_ants, Canvas, Color, RenderContext, Renderable};
use rfb_common::{zoom, Point, Rect};
use rfb_session::Selected;
use std::fmt;
use tracing::debug;

/// Side of a resize handle square, in local pixels.
pub const HANDLE_SIZE: u32 = 5;

/// Gap between the selection and its label, in local pixels.
const LABEL_GAP: i32 = 2;
/// Padding around the label text.
const LABEL_PADDING: u32 = 2;
/// Half length of the crosshair drawn for a point.
const CROSSHAIR: i32 = 6;

/// One of the eight grab points of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    LeftUpper,
    Upper,
    RightUpper,
    Right,
    RightLower,
    Lower,
    LeftLower,
    Left,
}

impl Handle {
    /// All handles, corners first.
    pub const ALL: [Handle; 8] = [
        Handle::LeftUpper,
        Handle::RightUpper,
        Handle::RightLower,
        Handle::LeftLower,
        Handle::Upper,
        Handle::Right,
        Handle::Lower,
        Handle::Left,
    ];

    /// Anchor of this handle on `rect`.
    pub fn anchor(self, rect: Rect) -> Point {
        let (l, t, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
        let (cx, cy) = (l + (r - l) / 2, t + (b - t) / 2);
        match self {
            Handle::LeftUpper => Point::new(l, t),
            Handle::Upper => Point::new(cx, t),
            Handle::RightUpper => Point::new(r, t),
            Handle::Right => Point::new(r, cy),
            Handle::RightLower => Point::new(r, b),
            Handle::Lower => Point::new(cx, b),
            Handle::LeftLower => Point::new(l, b),
            Handle::Left => Point::new(l, cy),
        }
    }
}

/// Selector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// Nothing selected.
    Idle,
    /// The pointer is down and dragging out a new selection.
    Defining,
    /// A selection exists and the pointer is up.
    Defined,
    /// The pointer is down on a handle.
    Resizing(Handle),
}

/// Drag-to-define, drag-to-resize selection tool.
#[derive(Debug)]
pub struct RegionSelector {
    state: SelectorState,
    start: Point,
    end: Point,
    tolerance: u32,
    point_mode: bool,
    bounds: (u32, u32),
}

impl RegionSelector {
    /// Create an idle selector.
    ///
    /// `tolerance` is in remote pixels; `bounds` is the desktop size.
    pub fn new(tolerance: u32, point_mode: bool, bounds: (u32, u32)) -> Self {
        Self {
            state: SelectorState::Idle,
            start: Point::default(),
            end: Point::default(),
            tolerance,
            point_mode,
            bounds,
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Hit-test tolerance in remote pixels.
    pub fn set_tolerance(&mut self, tolerance: u32) {
        self.tolerance = tolerance;
    }

    pub fn point_mode(&self) -> bool {
        self.point_mode
    }

    /// Switch between rectangles and single points; clears any selection.
    pub fn set_point_mode(&mut self, point_mode: bool) {
        if self.point_mode != point_mode {
            self.point_mode = point_mode;
            self.reset();
        }
    }

    /// Desktop size. Rectangle corners are clamped to its edges,
    /// `[0, width] x [0, height]`; point selections to its last pixel.
    pub fn set_bounds(&mut self, width: u32, height: u32) {
        self.bounds = (width, height);
        self.start = self.clamp(self.start);
        self.end = self.clamp(self.end);
    }

    fn clamp(&self, p: Point) -> Point {
        p.clamp_to(self.bounds.0, self.bounds.1)
    }

    fn last_pixel(&self, p: Point) -> Point {
        p.clamp_to(self.bounds.0.saturating_sub(1), self.bounds.1.saturating_sub(1))
    }

    /// Current normalized selection, or `None` when idle.
    pub fn rect(&self) -> Option<Rect> {
        match self.state {
            SelectorState::Idle => None,
            _ => Some(Rect::from_corners(self.start, self.end)),
        }
    }

    /// Current selection as the owner would receive it on commit.
    pub fn selected(&self) -> Option<Selected> {
        let rect = self.rect()?;
        Some(if self.point_mode || (rect.width == 0 && rect.height == 0) {
            Selected::Point(self.last_pixel(rect.origin()))
        } else {
            Selected::Region(rect)
        })
    }

    /// Classify `p` against the current selection's corners and edges.
    ///
    /// Corners take priority over edges; `None` means a miss.
    pub fn hit_test(&self, p: Point) -> Option<Handle> {
        let rect = self.rect()?;
        let t = self.tolerance as i32;
        let near = |a: i32, b: i32| (a - b).abs() <= t;
        let (l, top, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
        let within_x = p.x >= l - t && p.x <= r + t;
        let within_y = p.y >= top - t && p.y <= b + t;

        Handle::ALL.into_iter().find(|h| match h {
            Handle::LeftUpper => near(p.x, l) && near(p.y, top),
            Handle::RightUpper => near(p.x, r) && near(p.y, top),
            Handle::RightLower => near(p.x, r) && near(p.y, b),
            Handle::LeftLower => near(p.x, l) && near(p.y, b),
            Handle::Upper => near(p.y, top) && within_x,
            Handle::Right => near(p.x, r) && within_y,
            Handle::Lower => near(p.y, b) && within_x,
            Handle::Left => near(p.x, l) && within_y,
        })
    }

    /// Pointer went down at `p` (remote coordinates).
    pub fn pointer_pressed(&mut self, p: Point) {
        let p = self.clamp(p);
        if self.state == SelectorState::Defined && !self.point_mode {
            if let Some(handle) = self.hit_test(p) {
                let rect = Rect::from_corners(self.start, self.end);
                self.start = rect.origin();
                self.end = Point::new(rect.right(), rect.bottom());
                self.state = SelectorState::Resizing(handle);
                debug!("Selection resize started on {:?}", handle);
                return;
            }
        }
        self.start = p;
        self.end = p;
        self.state = SelectorState::Defining;
    }

    /// Pointer moved to `p` with the button held.
    pub fn pointer_dragged(&mut self, p: Point) {
        let p = self.clamp(p);
        match self.state {
            SelectorState::Defining if self.point_mode => {
                self.start = p;
                self.end = p;
            }
            SelectorState::Defining => self.end = p,
            SelectorState::Resizing(handle) => self.resize(handle, p),
            SelectorState::Idle | SelectorState::Defined => {}
        }
    }

    /// A dragged edge never crosses the opposite one; it stops there with zero size.
    fn resize(&mut self, handle: Handle, p: Point) {
        let (left, top, right, bottom) = match handle {
            Handle::LeftUpper => (true, true, false, false),
            Handle::Upper => (false, true, false, false),
            Handle::RightUpper => (false, true, true, false),
            Handle::Right => (false, false, true, false),
            Handle::RightLower => (false, false, true, true),
            Handle::Lower => (false, false, false, true),
            Handle::LeftLower => (true, false, false, true),
            Handle::Left => (true, false, false, false),
        };
        if left {
            self.start.x = p.x.min(self.end.x);
        }
        if top {
            self.start.y = p.y.min(self.end.y);
        }
        if right {
            self.end.x = p.x.max(self.start.x);
        }
        if bottom {
            self.end.y = p.y.max(self.start.y);
        }
    }

    /// Pointer released at `p`. Returns the normalized selection when a drag finished.
    pub fn pointer_released(&mut self, p: Point) -> Option<Rect> {
        match self.state {
            SelectorState::Defining | SelectorState::Resizing(_) => {
                self.pointer_dragged(p);
                self.state = SelectorState::Defined;
                let rect = self.rect();
                debug!("Selection defined: {:?}", rect);
                rect
            }
            SelectorState::Idle | SelectorState::Defined => None,
        }
    }

    /// Accept the selection and return to `Idle`.
    pub fn commit(&mut self) -> Option<Selected> {
        let selected = self.selected();
        self.reset();
        if selected.is_some() {
            debug!("Selection committed: {:?}", selected);
        }
        selected
    }

    /// Discard the selection. Returns true if there was one.
    pub fn cancel(&mut self) -> bool {
        let had = self.state != SelectorState::Idle;
        self.reset();
        if had {
            debug!("Selection cancelled");
        }
        had
    }

    pub fn reset(&mut self) {
        self.state = SelectorState::Idle;
        self.start = Point::default();
        self.end = Point::default();
    }

    /// Text shown next to the selection.
    pub fn label(&self) -> Option<String> {
        self.selected().map(|s| match s {
            Selected::Point(p) => format!("x:{},y:{}", p.x, p.y),
            Selected::Region(r) => format!("x:{},y:{},w:{},h:{}", r.x, r.y, r.width, r.height),
        })
    }
}

impl fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{:?} {}", self.state, label),
            None => write!(f, "{:?}", self.state),
        }
    }
}

/// Place a `size` label box next to `sel` inside `visible`.
///
/// The box sits below the selection, right-aligned with it. It flips above
/// when it would leave the bottom of the visible area, and moves inside the
/// selection when there is no room above either. Returns `None` when the box
/// is larger than the visible area.
pub fn place_label(sel: Rect, size: (u32, u32), visible: Rect) -> Option<Rect> {
    let (w, h) = size;
    if w > visible.width || h > visible.height {
        return None;
    }
    let (w_i, h_i) = (w as i32, h as i32);

    let mut y = sel.bottom() + LABEL_GAP;
    if y + h_i > visible.bottom() {
        y = sel.y - LABEL_GAP - h_i;
        if y < visible.y {
            y = (sel.bottom() - LABEL_GAP - h_i).max(visible.y);
        }
    }
    let x = (sel.right() - w_i).clamp(visible.x, visible.right() - w_i);
    let y = y.clamp(visible.y, visible.bottom() - h_i);
    Some(Rect::new(x, y, w, h))
}

impl Renderable for RegionSelector {
    fn render(&self, ctx: &RenderContext, canvas: &mut dyn Canvas) {
        let (Some(rect), Some(label)) = (self.rect(), self.label()) else {
            return;
        };
        let local = zoom::rect_to_local_rounded(rect, ctx.zoom);

        let (tw, th) = canvas.text_size(&label);
        let size = (tw + 2 * LABEL_PADDING, th + 2 * LABEL_PADDING);
        let Some(label_box) = place_label(local, size, ctx.visible) else {
            return;
        };

        let colors = (Color::BLACK, Color::WHITE);
        if local.width == 0 && local.height == 0 {
            let c = local.origin();
            canvas.line(
                Point::new(c.x - CROSSHAIR, c.y),
                Point::new(c.x + CROSSHAIR, c.y),
                colors.0,
            );
            canvas.line(
                Point::new(c.x, c.y - CROSSHAIR),
                Point::new(c.x, c.y + CROSSHAIR),
                colors.0,
            );
        } else {
            marching_ants(canvas, local, ctx.tick, colors);
            if matches!(
                self.state,
                SelectorState::Defined | SelectorState::Resizing(_)
            ) {
                let half = (HANDLE_SIZE / 2) as i32;
                for handle in Handle::ALL {
                    let a = handle.anchor(local);
                    canvas.fill_rect(
                        Rect::new(a.x - half, a.y - half, HANDLE_SIZE, HANDLE_SIZE),
                        Color::WHITE,
                    );
                }
            }
        }

        canvas.fill_rect(label_box, Color::LABEL_BACKGROUND);
        canvas.stroke_rect(label_box, Color::BLACK);
        canvas.text(
            Point::new(
                label_box.x + LABEL_PADDING as i32,
                label_box.y + LABEL_PADDING as i32,
            ),
            &label,
            Color::BLACK,
        );
    }
}
