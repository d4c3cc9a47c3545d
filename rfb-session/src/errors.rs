//! Error types for the remote session interface.

use std::io;
use thiserror::Error;

/// Errors raised while talking to the remote session or loading its configuration.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport failed while sending an event.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session is no longer connected.
    #[error("Session disconnected")]
    Disconnected,

    /// The remote side refused the event.
    #[error("Event rejected: {0}")]
    Rejected(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O error (reading configuration, writing captures).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// Returns true if the failure came from the link to the remote desktop.
    ///
    /// Link failures are published to the scripting collaborator as
    /// `Notification::IoError`; configuration problems are not.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Disconnected | Self::Io(_))
    }

    /// Returns true if the error is a configuration problem.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
