//! Zoom factor and the remote/local coordinate transform.
//!
//! Remote coordinates address pixels of the remote desktop. Local coordinates
//! address pixels of the zoomed image shown on screen. Both directions are
//! derived from a single integer percentage so that a point clicked by the
//! user lands on the remote pixel currently displayed under it.

use crate::{Point, Rect};
use std::fmt;
use thiserror::Error;

/// Errors raised when a zoom factor is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ZoomError {
    /// The requested percentage is zero or negative.
    #[error("zoom factor must be positive, got {0}%")]
    NotPositive(i64),

    /// The requested percentage is outside the supported range.
    #[error("zoom factor {0}% is outside the supported range 10%..=1000%")]
    OutOfRange(i64),
}

/// Integer zoom percentage (100 = one local pixel per remote pixel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoomFactor(u32);

impl ZoomFactor {
    /// Smallest accepted percentage.
    pub const MIN: u32 = 10;
    /// Largest accepted percentage.
    pub const MAX: u32 = 1000;
    /// Native 1:1 mapping.
    pub const NATIVE: ZoomFactor = ZoomFactor(100);

    /// Validate a requested percentage.
    pub fn new(percent: i64) -> Result<Self, ZoomError> {
        if percent <= 0 {
            return Err(ZoomError::NotPositive(percent));
        }
        if percent < i64::from(Self::MIN) || percent > i64::from(Self::MAX) {
            return Err(ZoomError::OutOfRange(percent));
        }
        Ok(Self(percent as u32))
    }

    /// The percentage value.
    pub const fn percent(self) -> u32 {
        self.0
    }

    /// True at 100%.
    pub const fn is_native(self) -> bool {
        self.0 == 100
    }

    /// Scale factor as a float (1.0 = native).
    pub fn scale(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Remote length/coordinate to local.
    pub fn to_local(self, v: i32) -> i32 {
        to_local(v, self)
    }

    /// Local length/coordinate to remote.
    pub fn to_remote(self, v: i32) -> i32 {
        to_remote(v, self)
    }
}

impl Default for ZoomFactor {
    fn default() -> Self {
        Self::NATIVE
    }
}

impl fmt::Display for ZoomFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Integer division rounding half away from zero. `d` must be positive.
fn div_round(n: i64, d: i64) -> i64 {
    if n >= 0 {
        (n + d / 2) / d
    } else {
        -((-n + d / 2) / d)
    }
}

/// `round(v * zoom / 100)`.
pub fn to_local(v: i32, zoom: ZoomFactor) -> i32 {
    if zoom.is_native() {
        return v;
    }
    div_round(i64::from(v) * i64::from(zoom.0), 100) as i32
}

/// `round(v * 100 / zoom)`.
pub fn to_remote(v: i32, zoom: ZoomFactor) -> i32 {
    if zoom.is_native() {
        return v;
    }
    div_round(i64::from(v) * 100, i64::from(zoom.0)) as i32
}

/// Convert a remote point to local coordinates.
pub fn point_to_local(p: Point, zoom: ZoomFactor) -> Point {
    Point::new(to_local(p.x, zoom), to_local(p.y, zoom))
}

/// Convert a local point to remote coordinates.
pub fn point_to_remote(p: Point, zoom: ZoomFactor) -> Point {
    Point::new(to_remote(p.x, zoom), to_remote(p.y, zoom))
}

/// Smallest local rectangle covering every local pixel the remote rectangle maps onto.
///
/// The origin is floored and the far edge ceiled, so no pixel touched by the
/// remote area is left out because of rounding.
pub fn rect_to_local(r: Rect, zoom: ZoomFactor) -> Rect {
    if zoom.is_native() {
        return r;
    }
    let z = i64::from(zoom.0);
    let floor = |v: i32| (i64::from(v) * z).div_euclid(100) as i32;
    let ceil = |v: i32| -((-i64::from(v) * z).div_euclid(100)) as i32;
    let x = floor(r.x);
    let y = floor(r.y);
    Rect::new(x, y, (ceil(r.right()) - x) as u32, (ceil(r.bottom()) - y) as u32)
}

/// Rounded local rectangle used for drawing overlays over the zoomed image.
pub fn rect_to_local_rounded(r: Rect, zoom: ZoomFactor) -> Rect {
    let x = to_local(r.x, zoom);
    let y = to_local(r.y, zoom);
    let right = to_local(r.right(), zoom);
    let bottom = to_local(r.bottom(), zoom);
    Rect::new(x, y, (right - x).max(0) as u32, (bottom - y).max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ZOOMS: [u32; 5] = [25, 50, 100, 150, 200];

    fn zoom(p: u32) -> ZoomFactor {
        ZoomFactor::new(i64::from(p)).unwrap()
    }

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(ZoomFactor::new(0), Err(ZoomError::NotPositive(0)));
        assert_eq!(ZoomFactor::new(-50), Err(ZoomError::NotPositive(-50)));
        assert_eq!(ZoomFactor::new(5), Err(ZoomError::OutOfRange(5)));
        assert_eq!(ZoomFactor::new(5000), Err(ZoomError::OutOfRange(5000)));
        assert_eq!(ZoomFactor::new(150).unwrap().percent(), 150);
        assert_eq!(ZoomFactor::default(), ZoomFactor::NATIVE);
    }

    #[test]
    fn test_identity_at_native() {
        for v in [-7, 0, 1, 99, 1920] {
            assert_eq!(to_local(v, ZoomFactor::NATIVE), v);
            assert_eq!(to_remote(v, ZoomFactor::NATIVE), v);
        }
    }

    #[test]
    fn test_rounding() {
        assert_eq!(to_local(3, zoom(50)), 2); // 1.5 rounds up
        assert_eq!(to_local(5, zoom(150)), 8); // 7.5 rounds up
        assert_eq!(to_remote(7, zoom(200)), 4); // 3.5 rounds up
        assert_eq!(to_remote(10, zoom(25)), 40);
        assert_eq!(to_local(-3, zoom(50)), -2);
    }

    #[test]
    fn test_round_trip_exhaustive_small_range() {
        for z in ZOOMS.map(zoom) {
            for p in 0..2000 {
                let local = to_local(p, z);
                let again = to_local(to_remote(local, z), z);
                assert!((again - local).abs() <= 1, "zoom={z} p={p}");
            }
        }
    }

    #[test]
    fn test_rect_to_local_covers_rounding() {
        let r = Rect::new(3, 3, 1, 1);
        // At 150% remote pixel 3 spans local [4.5, 6.0)
        assert_eq!(rect_to_local(r, zoom(150)), Rect::new(4, 4, 2, 2));
        assert_eq!(rect_to_local(r, ZoomFactor::NATIVE), r);
        assert_eq!(
            rect_to_local_rounded(Rect::new(10, 10, 40, 30), zoom(200)),
            Rect::new(20, 20, 80, 60)
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip_within_one(p in 0i32..8192, idx in 0usize..ZOOMS.len()) {
            let z = zoom(ZOOMS[idx]);
            let local = to_local(p, z);
            let again = to_local(to_remote(local, z), z);
            prop_assert!((again - local).abs() <= 1);
        }

        #[test]
        fn prop_point_round_trip(x in 0i32..4096, y in 0i32..4096, pct in 10u32..=400) {
            let z = zoom(pct);
            let local = point_to_local(Point::new(x, y), z);
            let back = point_to_local(point_to_remote(local, z), z);
            prop_assert!((back.x - local.x).abs() <= 1);
            prop_assert!((back.y - local.y).abs() <= 1);
        }
    }
}
