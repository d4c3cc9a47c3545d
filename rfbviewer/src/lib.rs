//! rfbviewer: interactive viewer for a remote framebuffer session
//!
//! The library half holds the [`Viewer`] facade, which a host drives once per
//! frame, plus the pieces of the bundled egui host: the demo session, PNG
//! capture and the UI panels.

pub mod app;
pub mod args;
pub mod capture;
pub mod demo_session;
pub mod error;
pub mod ui;
pub mod viewer;

pub use error::ViewerError;
pub use viewer::Viewer;
