//! Remote session plumbing for the framebuffer viewer.
//!
//! This crate sits between a remote-desktop session (which decodes the wire
//! protocol elsewhere) and the viewer. It provides:
//!
//! - the [`RemoteSession`] trait the input forwarder sends events through
//! - [`SessionEvent`]s consumed from the session and [`Notification`]s
//!   published to the viewer's owner
//! - the [`FramebufferStore`] holding the canonical and zoomed images
//! - the session-event pump ([`event_loop::spawn`])
//! - TOML configuration ([`ViewerConfig`])
//!
//! # Architecture
//!
//! ```text
//! session --SessionEvent--> pump --apply_update--> FramebufferStore
//!                            |                          |
//!                            +--ViewerEvent-->  presentation (snapshot)
//! ```
//!
//! The pump runs as a tokio task; the presentation context polls its
//! `ViewerEvent` receiver once per frame.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod event_loop;
pub mod framebuffer;
pub mod messages;

pub use config::{ReservedAction, ReservedShortcutConfig, ViewerConfig};
pub use errors::SessionError;
pub use framebuffer::{DropReason, FrameSnapshot, FramebufferStore, PatchOutcome};
pub use messages::{Notification, Selected, SessionCommand, SessionEvent, ViewerEvent};

use std::sync::Arc;

/// Type alias for a thread-safe handle to the framebuffer store.
///
/// The store is shared between the pump (which patches it) and the
/// presentation context (which snapshots it for rendering).
pub type FramebufferHandle = Arc<FramebufferStore>;

/// Outbound half of a remote-desktop session.
///
/// Coordinates are remote pixels; `buttons` is the RFB button mask.
pub trait RemoteSession: Send + Sync {
    /// Send a pointer position and button state.
    fn send_pointer_event(&self, x: u16, y: u16, buttons: u8) -> Result<(), SessionError>;

    /// Send a key press or release.
    fn send_key_event(&self, keysym: u32, down: bool) -> Result<(), SessionError>;

    /// Remote desktop size in pixels.
    fn desktop_size(&self) -> (u32, u32);

    /// True while the session accepts events.
    fn is_connected(&self) -> bool;
}

/// [`RemoteSession`] backed by a command channel.
///
/// Commands go to whatever task owns the receiving end. The desktop size and
/// connection state come from the store the pump maintains.
#[derive(Clone)]
pub struct SessionHandle {
    commands: flume::Sender<SessionCommand>,
    store: FramebufferHandle,
}

impl SessionHandle {
    /// Creates a handle sending on `commands`.
    pub fn new(commands: flume::Sender<SessionCommand>, store: FramebufferHandle) -> Self {
        Self { commands, store }
    }

    fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        if self.store.is_closed() {
            return Err(SessionError::Disconnected);
        }
        self.commands
            .send(cmd)
            .map_err(|_| SessionError::Disconnected)
    }

    /// Asks the backend to end the session.
    pub fn close(&self) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::Close)
            .map_err(|_| SessionError::Disconnected)
    }
}

impl RemoteSession for SessionHandle {
    fn send_pointer_event(&self, x: u16, y: u16, buttons: u8) -> Result<(), SessionError> {
        self.send(SessionCommand::Pointer { x, y, buttons })
    }

    fn send_key_event(&self, keysym: u32, down: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::Key { keysym, down })
    }

    fn desktop_size(&self) -> (u32, u32) {
        self.store.desktop_size()
    }

    fn is_connected(&self) -> bool {
        !self.store.is_closed() && !self.commands.is_disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfb_common::ZoomFactor;
    use rfb_pixelbuffer::ScaleFilter;

    fn handle() -> (SessionHandle, flume::Receiver<SessionCommand>, FramebufferHandle) {
        let store = Arc::new(FramebufferStore::new(
            640,
            480,
            ZoomFactor::NATIVE,
            ScaleFilter::Nearest,
        ));
        let (tx, rx) = flume::unbounded();
        (SessionHandle::new(tx, Arc::clone(&store)), rx, store)
    }

    #[test]
    fn test_handle_sends_commands() {
        let (session, rx, _store) = handle();
        session.send_pointer_event(10, 20, 1).unwrap();
        session.send_key_event(0x61, true).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionCommand::Pointer {
                x: 10,
                y: 20,
                buttons: 1
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionCommand::Key {
                keysym: 0x61,
                down: true
            }
        );
        assert_eq!(session.desktop_size(), (640, 480));
        assert!(session.is_connected());
    }

    #[test]
    fn test_handle_fails_after_close() {
        let (session, _rx, store) = handle();
        store.close();
        assert!(!session.is_connected());
        assert!(matches!(
            session.send_key_event(0x61, true),
            Err(SessionError::Disconnected)
        ));
    }

    #[test]
    fn test_handle_fails_when_backend_gone() {
        let (session, rx, _store) = handle();
        drop(rx);
        assert!(!session.is_connected());
        assert!(session.send_pointer_event(0, 0, 0).is_err());
    }
}
