//! Framebuffer store shared between the session pump and the presentation context.
//!
//! The store owns the canonical remote image and, when the zoom is not 100%,
//! a zoom-scaled copy. The pair is the front frame; snapshots are `Arc`
//! clones of it taken under one `parking_lot::Mutex`.
//!
//! A patch that arrives while no snapshot is held is written in place. While
//! a reader still holds the front images, the patch goes into a back frame
//! outside the lock and the lock only covers swapping it in. The previous
//! front is kept as the next back frame and caught up by copying the
//! rectangles it missed, so steady rendering does not copy whole images.

use parking_lot::Mutex;
use rfb_common::{zoom, Rect, ZoomFactor};
use rfb_pixelbuffer::{scale_full, scale_region, PixelBuffer, ScaleFilter, BYTES_PER_PIXEL};
use std::sync::Arc;
use tracing::{debug, trace};

/// Stale rectangles a spare frame may collect before it is thrown away.
const MAX_STALE: usize = 64;

/// Why a patch was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The rectangle does not fit inside the current image.
    OutOfBounds,
    /// The pixel payload is shorter than the rectangle needs.
    ShortPayload,
    /// The rectangle has no pixels.
    Empty,
    /// The session has ended and the store is closed.
    Closed,
}

/// Result of [`FramebufferStore::apply_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The patch was copied into the image.
    Applied,
    /// The patch was discarded.
    Dropped(DropReason),
}

impl PatchOutcome {
    /// True if the patch changed the image.
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Read-only view of the displayed image for one render.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Image in local (zoomed) coordinates.
    pub image: Arc<PixelBuffer>,
    /// Zoom the image was produced at.
    pub zoom: ZoomFactor,
    /// Store version the snapshot was taken at.
    pub version: u64,
}

impl FrameSnapshot {
    /// Size of the image in local pixels.
    pub fn local_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Local area a remote patch influences in the zoomed copy.
fn dirty_local(rect: Rect, zoom: ZoomFactor, filter: ScaleFilter) -> Rect {
    zoom::rect_to_local(rect.inflate(filter.margin()), zoom)
}

/// Canonical image plus its zoomed copy.
#[derive(Clone)]
struct Frame {
    canonical: Arc<PixelBuffer>,
    scaled: Option<Arc<PixelBuffer>>,
}

impl Frame {
    fn new(canonical: PixelBuffer, zoom: ZoomFactor, filter: ScaleFilter) -> Self {
        let mut frame = Self {
            canonical: Arc::new(canonical),
            scaled: None,
        };
        frame.rescale(zoom, filter);
        frame
    }

    fn rescale(&mut self, zoom: ZoomFactor, filter: ScaleFilter) {
        self.scaled = if zoom.is_native() {
            None
        } else {
            Some(Arc::new(scale_full(&self.canonical, zoom, filter)))
        };
    }

    fn displayed(&self) -> &Arc<PixelBuffer> {
        self.scaled.as_ref().unwrap_or(&self.canonical)
    }

    /// True while a snapshot or another handle holds one of the images.
    fn is_shared(&mut self) -> bool {
        Arc::get_mut(&mut self.canonical).is_none()
            || self
                .scaled
                .as_mut()
                .is_some_and(|s| Arc::get_mut(s).is_none())
    }

    fn same_images(&self, other: &Frame) -> bool {
        let scaled_eq = match (&self.scaled, &other.scaled) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        Arc::ptr_eq(&self.canonical, &other.canonical) && scaled_eq
    }

    fn deep_copy(&self) -> Self {
        Self {
            canonical: Arc::new(PixelBuffer::clone(&self.canonical)),
            scaled: self.scaled.as_ref().map(|s| Arc::new(PixelBuffer::clone(s))),
        }
    }

    /// Writes a validated patch and refreshes the zoomed copy around it.
    fn patch(
        &mut self,
        rect: Rect,
        pixels: &[u8],
        zoom: ZoomFactor,
        filter: ScaleFilter,
    ) -> anyhow::Result<()> {
        Arc::make_mut(&mut self.canonical).image_rect(rect, pixels, 0)?;
        if let Some(scaled) = &mut self.scaled {
            let dirty = dirty_local(rect, zoom, filter);
            scale_region(&self.canonical, Arc::make_mut(scaled), dirty, zoom, filter);
        }
        Ok(())
    }

    /// Copies the `stale` rectangles over from `front`. Returns false if this
    /// frame cannot be reused, either because a reader still holds it or
    /// because it no longer matches `front` in shape.
    fn catch_up(
        &mut self,
        front: &Frame,
        stale: &[Rect],
        zoom: ZoomFactor,
        filter: ScaleFilter,
    ) -> bool {
        let Some(canonical) = Arc::get_mut(&mut self.canonical) else {
            return false;
        };
        let mut scaled = match (&mut self.scaled, &front.scaled) {
            (Some(mine), Some(theirs)) => match Arc::get_mut(mine) {
                Some(mine) => Some((mine, &**theirs)),
                None => return false,
            },
            (None, None) => None,
            _ => return false,
        };

        for &rect in stale {
            if canonical.copy_rect_from(&front.canonical, rect).is_err() {
                return false;
            }
            if let Some((mine, theirs)) = scaled.as_mut() {
                let dirty = dirty_local(rect, zoom, filter);
                let Some(area) = dirty.clamp_to(mine.width(), mine.height()) else {
                    continue;
                };
                if mine.copy_rect_from(*theirs, area).is_err() {
                    return false;
                }
            }
        }
        true
    }
}

/// A former front frame waiting to be reused, with the rectangles it lacks.
struct Spare {
    frame: Frame,
    stale: Vec<Rect>,
}

struct StoreState {
    front: Frame,
    spare: Option<Spare>,
    zoom: ZoomFactor,
    filter: ScaleFilter,
    version: u64,
    /// Bumped whenever the front frame is replaced wholesale.
    generation: u64,
    closed: bool,
}

impl StoreState {
    fn check(&self, rect: Rect, pixels: &[u8]) -> Option<DropReason> {
        if self.closed {
            Some(DropReason::Closed)
        } else if rect.is_empty() {
            Some(DropReason::Empty)
        } else if !self.front.canonical.bounds().contains_rect(&rect) {
            Some(DropReason::OutOfBounds)
        } else if pixels.len() < rect.area() as usize * BYTES_PER_PIXEL {
            Some(DropReason::ShortPayload)
        } else {
            None
        }
    }

    /// Patches the front frame under the lock.
    fn patch_front(&mut self, rect: Rect, pixels: &[u8]) -> PatchOutcome {
        if let Err(e) = self.front.patch(rect, pixels, self.zoom, self.filter) {
            debug!("Dropping patch {:?}: {}", rect, e);
            return PatchOutcome::Dropped(DropReason::OutOfBounds);
        }
        let overflow = match &mut self.spare {
            Some(spare) => {
                spare.stale.push(rect);
                spare.stale.len() > MAX_STALE
            }
            None => false,
        };
        if overflow {
            self.spare = None;
        }
        self.applied(rect)
    }

    fn applied(&mut self, rect: Rect) -> PatchOutcome {
        self.version += 1;
        trace!("Applied patch {:?} (version {})", rect, self.version);
        PatchOutcome::Applied
    }

    fn replace_front(&mut self, front: Frame) {
        self.front = front;
        self.spare = None;
        self.generation += 1;
        self.version += 1;
    }
}

/// Work for one patch prepared outside the lock.
struct BackBuffer {
    front: Frame,
    spare: Option<Spare>,
    generation: u64,
    zoom: ZoomFactor,
    filter: ScaleFilter,
}

impl BackBuffer {
    /// Builds the next front frame: the spare caught up with the current
    /// front when possible, a fresh copy otherwise, then the patch.
    /// Returns the front it was based on alongside.
    fn prepare(self, rect: Rect, pixels: &[u8]) -> (Frame, Option<Frame>) {
        let (zoom, filter) = (self.zoom, self.filter);
        let reused = match self.spare {
            Some(mut spare) => {
                if spare.frame.catch_up(&self.front, &spare.stale, zoom, filter) {
                    Some(spare.frame)
                } else {
                    None
                }
            }
            None => None,
        };
        let mut back = match reused {
            Some(frame) => frame,
            None => {
                trace!("No reusable back frame, copying the front");
                self.front.deep_copy()
            }
        };
        match back.patch(rect, pixels, zoom, filter) {
            Ok(()) => (self.front, Some(back)),
            Err(e) => {
                debug!("Back frame patch {:?} failed: {}", rect, e);
                (self.front, None)
            }
        }
    }
}

/// Canonical remote image plus its zoomed copy.
pub struct FramebufferStore {
    state: Mutex<StoreState>,
}

impl FramebufferStore {
    /// Creates a store holding a black image of the given size.
    pub fn new(width: u32, height: u32, zoom: ZoomFactor, filter: ScaleFilter) -> Self {
        Self {
            state: Mutex::new(StoreState {
                front: Frame::new(PixelBuffer::new(width, height), zoom, filter),
                spare: None,
                zoom,
                filter,
                version: 0,
                generation: 0,
                closed: false,
            }),
        }
    }

    /// Copies a decoded patch into the image and refreshes the zoomed copy.
    ///
    /// Patches outside the current image, with a short payload, or arriving
    /// after [`close`](Self::close) are dropped and logged; they never fail.
    pub fn apply_update(&self, rect: Rect, pixels: &[u8]) -> PatchOutcome {
        let back = {
            let mut state = self.state.lock();
            if let Some(reason) = state.check(rect, pixels) {
                debug!("Dropping patch {:?}: {:?}", rect, reason);
                return PatchOutcome::Dropped(reason);
            }
            if !state.front.is_shared() {
                return state.patch_front(rect, pixels);
            }
            BackBuffer {
                front: state.front.clone(),
                spare: state.spare.take(),
                generation: state.generation,
                zoom: state.zoom,
                filter: state.filter,
            }
        };

        let generation = back.generation;
        let (based_on, prepared) = back.prepare(rect, pixels);

        let mut state = self.state.lock();
        let current = !state.closed
            && state.generation == generation
            && state.front.same_images(&based_on);
        drop(based_on);
        match prepared {
            Some(frame) if current => {
                let previous = std::mem::replace(&mut state.front, frame);
                state.spare = Some(Spare {
                    frame: previous,
                    stale: vec![rect],
                });
                state.applied(rect)
            }
            _ => {
                // The front moved on while the back frame was built.
                if let Some(reason) = state.check(rect, pixels) {
                    debug!("Dropping patch {:?}: {:?}", rect, reason);
                    return PatchOutcome::Dropped(reason);
                }
                state.patch_front(rect, pixels)
            }
        }
    }

    /// Returns the image to draw at the current zoom.
    pub fn snapshot(&self) -> FrameSnapshot {
        let state = self.state.lock();
        FrameSnapshot {
            image: Arc::clone(state.front.displayed()),
            zoom: state.zoom,
            version: state.version,
        }
    }

    /// Returns the unscaled remote image.
    pub fn canonical(&self) -> Arc<PixelBuffer> {
        Arc::clone(&self.state.lock().front.canonical)
    }

    /// Replaces the image for a new session and reopens the store.
    pub fn reset(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        let front = Frame::new(PixelBuffer::new(width, height), state.zoom, state.filter);
        state.replace_front(front);
        state.closed = false;
        debug!("Framebuffer reset to {}x{}", width, height);
    }

    /// Changes the zoom and rebuilds the zoomed copy.
    pub fn set_zoom(&self, zoom: ZoomFactor) {
        let mut state = self.state.lock();
        if state.zoom == zoom {
            return;
        }
        state.zoom = zoom;
        let mut front = state.front.clone();
        front.rescale(zoom, state.filter);
        state.replace_front(front);
        debug!("Framebuffer zoom set to {}", zoom);
    }

    /// Changes the scaling filter and rebuilds the zoomed copy.
    pub fn set_filter(&self, filter: ScaleFilter) {
        let mut state = self.state.lock();
        if state.filter == filter {
            return;
        }
        state.filter = filter;
        let mut front = state.front.clone();
        front.rescale(state.zoom, filter);
        state.replace_front(front);
        debug!("Framebuffer filter set to {}", filter);
    }

    /// Stops accepting patches; the last image stays available.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            debug!("Framebuffer closed at version {}", state.version);
        }
    }

    /// True after [`close`](Self::close) until the next [`reset`](Self::reset).
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Monotonic counter bumped by every applied patch, reset and zoom change.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Remote desktop size.
    pub fn desktop_size(&self) -> (u32, u32) {
        self.state.lock().front.canonical.dimensions()
    }

    /// Current zoom.
    pub fn zoom(&self) -> ZoomFactor {
        self.state.lock().zoom
    }

    /// Current scaling filter.
    pub fn filter(&self) -> ScaleFilter {
        self.state.lock().filter
    }
}
