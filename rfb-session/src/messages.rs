//! Message types exchanged between the remote session, the viewer and its owner.
//!
//! - [`SessionEvent`] flows from the remote-session collaborator into the pump.
//! - [`ViewerEvent`] flows from the pump to the presentation context.
//! - [`Notification`] flows from the viewer to whoever drives it (a script
//!   runner, a status bar).
//! - [`SessionCommand`] flows from [`crate::SessionHandle`] to a session backend.

use bytes::Bytes;
use rfb_common::{Point, Rect};

/// Events delivered by the remote-session collaborator.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was (re)established with a desktop of the given size.
    Connected {
        /// Desktop width in pixels.
        width: u32,
        /// Desktop height in pixels.
        height: u32,
        /// Desktop name.
        name: String,
    },

    /// A decoded rectangle of the remote desktop changed.
    FrameUpdate {
        /// Updated area in remote coordinates.
        rect: Rect,
        /// Tightly packed RGBA pixels for `rect`.
        pixels: Bytes,
    },

    /// The remote desktop rang the bell.
    Bell,

    /// The remote clipboard changed.
    Clipboard {
        /// Clipboard text.
        text: String,
    },

    /// The transport reported an error; the session may still be alive.
    IoError {
        /// The error message.
        message: String,
    },

    /// The session ended.
    Disconnected,
}

/// Events forwarded by the pump to the presentation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// The store was reset for a new session.
    Connected {
        /// Desktop width in pixels.
        width: u32,
        /// Desktop height in pixels.
        height: u32,
        /// Desktop name.
        name: String,
    },

    /// A patch was applied to the store.
    Damage {
        /// Updated area in remote coordinates.
        rect: Rect,
    },

    /// The remote desktop rang the bell.
    Bell,

    /// The remote clipboard changed.
    Clipboard {
        /// Clipboard text.
        text: String,
    },

    /// The transport reported an error.
    IoError {
        /// The error message.
        message: String,
    },

    /// The session ended; the store is closed.
    Disconnected,
}

/// Result of a committed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    /// A normalized rectangle in remote coordinates.
    Region(Rect),
    /// A single point in remote coordinates.
    Point(Point),
}

/// Outward notifications published by the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The local pointer moved; position in remote coordinates.
    PointerPosition(Point),
    /// A selection drag finished with this normalized rectangle.
    SelectionDefined(Rect),
    /// The selection was accepted.
    SelectionCommitted(Selected),
    /// The selection was discarded.
    SelectionCancelled,
    /// Forwarding input or the transport failed.
    IoError(String),
    /// A session was established.
    Connected {
        /// Desktop width in pixels.
        width: u32,
        /// Desktop height in pixels.
        height: u32,
        /// Desktop name.
        name: String,
    },
    /// The session ended.
    Disconnected,
    /// The remote desktop rang the bell.
    Bell,
    /// The remote clipboard changed.
    Clipboard(String),
}

/// Commands sent from a [`crate::SessionHandle`] to a session backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Send pointer (mouse) event.
    Pointer {
        /// X coordinate in pixels.
        x: u16,
        /// Y coordinate in pixels.
        y: u16,
        /// Button mask (bit 0 = left, bit 1 = middle, bit 2 = right).
        buttons: u8,
    },

    /// Send keyboard event.
    Key {
        /// X11 keysym value.
        keysym: u32,
        /// True if key was pressed, false if released.
        down: bool,
    },

    /// Close the session.
    Close,
}
