//! Common types and utilities for the remote framebuffer viewer.
//!
//! This crate provides shared types used across the viewer implementation:
//! - [`Point`] - 2D point with i32 coordinates
//! - [`Rect`] - Rectangle with position and dimensions
//! - [`zoom`] - Zoom factor and the remote/local coordinate transform

pub mod zoom;

pub use zoom::{ZoomError, ZoomFactor};

/// A 2D point with integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp the point into `[0, width] x [0, height]`.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        Self {
            x: self.x.clamp(0, width as i32),
            y: self.y.clamp(0, height as i32),
        }
    }
}

/// A rectangle defined by top-left position and dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized rectangle spanning two corner points given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x.max(b.x) - x) as u32,
            height: (a.y.max(b.y) - y) as u32,
        }
    }

    /// Get the right edge (x + width).
    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Get the bottom edge (y + height).
    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Top-left corner.
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Check if a point is contained within this rectangle.
    pub const fn contains_point(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Check whether `other` lies completely inside this rectangle.
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Get the area of the rectangle.
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check whether two rectangles overlap.
    pub const fn intersects(&self, other: Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Overlapping part of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32))
    }

    /// Smallest rectangle covering both. An empty side contributes nothing.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, (right - x) as u32, (bottom - y) as u32)
    }

    /// Grow the rectangle by `margin` on every side.
    pub fn inflate(&self, margin: u32) -> Rect {
        let m = margin as i32;
        Rect::new(
            self.x - m,
            self.y - m,
            self.width + 2 * margin,
            self.height + 2 * margin,
        )
    }

    /// Clip the rectangle to `[0, width) x [0, height)`.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        self.intersection(&Rect::new(0, 0, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point() {
        let p = Point::new(10, 20);
        assert_eq!(p.x, 10);
        assert_eq!(p.y, 20);
        assert_eq!(Point::new(-4, 900).clamp_to(800, 600), Point::new(0, 600));
    }

    #[test]
    fn test_rect() {
        let r = Rect::new(10, 20, 100, 50);
        assert_eq!(r.right(), 110);
        assert_eq!(r.bottom(), 70);
        assert_eq!(r.area(), 5000);
        assert!(!r.is_empty());
        assert!(Rect::new(3, 3, 0, 7).is_empty());
    }

    #[test]
    fn test_contains_point() {
        let r = Rect::new(10, 20, 100, 50);
        assert!(r.contains_point(10, 20)); // top-left corner
        assert!(r.contains_point(109, 69)); // bottom-right minus 1
        assert!(!r.contains_point(9, 20));
        assert!(!r.contains_point(110, 69)); // right edge (exclusive)
        assert!(!r.contains_point(109, 70)); // bottom edge (exclusive)
    }

    #[test]
    fn test_from_corners_normalizes() {
        let r = Rect::from_corners(Point::new(50, 40), Point::new(10, 10));
        assert_eq!(r, Rect::new(10, 10, 40, 30));
        let p = Rect::from_corners(Point::new(7, 7), Point::new(7, 7));
        assert!(p.is_empty());
    }

    #[test]
    fn test_union() {
        let a = Rect::new(2, 3, 4, 4);
        let b = Rect::new(10, 1, 2, 2);
        assert_eq!(a.union(&b), Rect::new(2, 1, 10, 6));
        assert_eq!(b.union(&a), a.union(&b));
        assert_eq!(a.union(&Rect::new(50, 50, 0, 0)), a);
        assert_eq!(Rect::default().union(&b), b);
    }

    #[test]
    fn test_intersection_and_clamp() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(90, 90, 20, 20);
        assert!(a.intersects(b));
        assert_eq!(a.intersection(&b), Some(Rect::new(90, 90, 10, 10)));
        assert_eq!(a.intersection(&Rect::new(100, 0, 5, 5)), None);

        let inflated = Rect::new(2, 3, 10, 10).inflate(10);
        assert_eq!(inflated, Rect::new(-8, -7, 30, 30));
        assert_eq!(inflated.clamp_to(15, 15), Some(Rect::new(0, 0, 15, 15)));
        assert_eq!(Rect::new(200, 200, 4, 4).clamp_to(15, 15), None);
    }

    #[test]
    fn test_contains_rect() {
        let bounds = Rect::new(0, 0, 640, 480);
        assert!(bounds.contains_rect(&Rect::new(600, 400, 40, 80)));
        assert!(!bounds.contains_rect(&Rect::new(600, 400, 41, 80)));
        assert!(!bounds.contains_rect(&Rect::new(-1, 0, 4, 4)));
    }
}
