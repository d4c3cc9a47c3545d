use platform_input::KeyComboError;
use rfb_common::ZoomError;
use rfb_session::SessionError;
use thiserror::Error;

/// Errors surfaced by the [`crate::Viewer`] facade.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid zoom: {0}")]
    Zoom(#[from] ZoomError),

    #[error("Invalid reserved shortcut: {0}")]
    Shortcut(#[from] KeyComboError),

    #[error("Capture failed: {0}")]
    Capture(String),
}

impl ViewerError {
    /// True when the remote session could not be reached.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_io())
    }
}
