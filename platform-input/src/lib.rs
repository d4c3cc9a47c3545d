//! platform-input: turn local input into remote session events
//!
//! This crate provides [`InputForwarder`], which converts local pointer and
//! key input to remote coordinates, applies the read-only and
//! reserved-shortcut policy, and sends what survives through a
//! [`rfb_session::RemoteSession`].

mod forwarder;
mod keyboard;
mod mouse;
mod shortcuts;

pub use forwarder::{HostControls, InputForwarder, InputOrigin, InputOutcome, InputSink, LocalInput};
pub use keyboard::{
    keysym_from_name, keysym_name, keysyms, modifier_for_keysym, normalize_keysym, KeyCombo,
    KeyComboError, Modifiers,
};
pub use mouse::{ButtonMask, MouseState, PointerButton, WheelDirection};
pub use shortcuts::{ReadOnlyFlag, ReadOnlyPolicy, ReservedShortcuts};
