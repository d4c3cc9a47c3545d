//! # rfb-display: framebuffer composition for the viewer
//!
//! This crate turns a framebuffer snapshot plus overlay state into drawing
//! calls on a host-provided [`Canvas`]. It owns no graphics API.
//!
//! ## Features
//!
//! - **Viewport**: zoom steps, scrolling and window/local/remote conversion
//! - **Renderer**: per-tick composition of the frame and overlay layers
//! - **Update flash overlay**: time-decayed markers for changed regions
//! - **Region selector**: drag-to-define, drag-to-resize selection with
//!   marching-ants border, resize handles and a coordinate label
//!
//! ## Example
//!
//! ```rust
//! use rfb_common::Point;
//! use rfb_display::{RegionSelector, SelectorState};
//!
//! let mut selector = RegionSelector::new(3, false, (1920, 1080));
//! selector.pointer_pressed(Point::new(10, 10));
//! selector.pointer_dragged(Point::new(50, 40));
//! selector.pointer_released(Point::new(50, 40));
//! assert_eq!(selector.state(), SelectorState::Defined);
//! assert_eq!(selector.label().unwrap(), "x:10,y:10,w:40,h:30");
//! ```

mod overlay;
mod renderer;
mod selector;
mod viewport;

pub use overlay::{RegionKind, UpdateFlashOverlay, UpdateRegion, MAX_REGIONS, PIXEL_MARK_SIZE};
pub use renderer::{
    marching_ants, Canvas, Color, RenderContext, Renderable, ViewportRenderer, ANT_STEP,
    DASH_LENGTH,
};
pub use selector::{place_label, Handle, RegionSelector, SelectorState, HANDLE_SIZE};
pub use viewport::{Viewport, ViewportConfig, ViewportState};
