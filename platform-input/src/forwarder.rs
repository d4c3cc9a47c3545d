//! Local input to remote session events.
//!
//! Every event goes through the same checks, in order:
//!
//! 1. A key press matching a reserved combination, while no script is
//!    running, is consumed locally. Its release is swallowed as well.
//! 2. While read-only, user input is blocked. Replayed input still goes
//!    through. A blocked pointer press asks the host to show a hint.
//! 3. Everything else is converted to remote coordinates and sent.

use crate::keyboard::{normalize_keysym, KeyCombo, Modifiers};
use crate::mouse::{MouseState, PointerButton, WheelDirection};
use crate::shortcuts::ReadOnlyPolicy;
use rfb_common::{zoom, Point, ZoomFactor};
use rfb_session::{Notification, RemoteSession, ReservedAction, SessionError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Where an input event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOrigin {
    /// The person at the keyboard.
    User,
    /// A recorded sequence being played back.
    Replay,
}

/// Input from the host window. Positions are local image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalInput {
    PointerMoved {
        pos: Point,
    },
    PointerPressed {
        pos: Point,
        button: PointerButton,
    },
    PointerReleased {
        pos: Point,
        button: PointerButton,
    },
    Wheel {
        pos: Point,
        direction: WheelDirection,
    },
    Key {
        keysym: u32,
        down: bool,
        modifiers: Modifiers,
    },
}

impl LocalInput {
    /// Local position carried by pointer input.
    pub fn position(&self) -> Option<Point> {
        match *self {
            LocalInput::PointerMoved { pos }
            | LocalInput::PointerPressed { pos, .. }
            | LocalInput::PointerReleased { pos, .. }
            | LocalInput::Wheel { pos, .. } => Some(pos),
            LocalInput::Key { .. } => None,
        }
    }
}

/// What happened to an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Sent to the remote session.
    Forwarded,
    /// Matched a reserved combination.
    Reserved(ReservedAction),
    /// Swallowed locally, e.g. the release of a reserved key.
    Consumed,
    /// Dropped because the viewer is read-only.
    Blocked,
}

/// Window-level controls the forwarder may trigger.
pub trait HostControls: Send + Sync {
    /// Flip the viewer's read-only mode.
    fn toggle_read_only(&self);

    /// Tell the user their input is being ignored.
    fn read_only_hint(&self);
}

/// Anything that accepts local input.
pub trait InputSink {
    fn handle_input(
        &mut self,
        input: LocalInput,
        origin: InputOrigin,
    ) -> Result<InputOutcome, SessionError>;
}

/// Applies the read-only and reserved-shortcut policy, then forwards.
pub struct InputForwarder {
    session: Arc<dyn RemoteSession>,
    host: Arc<dyn HostControls>,
    policy: ReadOnlyPolicy,
    script_running: bool,
    zoom: ZoomFactor,
    mouse: MouseState,
    swallowed: HashSet<u32>,
    notifications: flume::Sender<Notification>,
}

impl InputForwarder {
    pub fn new(
        session: Arc<dyn RemoteSession>,
        host: Arc<dyn HostControls>,
        policy: ReadOnlyPolicy,
        notifications: flume::Sender<Notification>,
    ) -> Self {
        debug!(
            "Input forwarder created (read-only: {}, {} reserved combinations)",
            policy.is_read_only(),
            policy.reserved.len()
        );
        Self {
            session,
            host,
            policy,
            script_running: false,
            zoom: ZoomFactor::NATIVE,
            mouse: MouseState::new(),
            swallowed: HashSet::new(),
            notifications,
        }
    }

    pub fn zoom(&self) -> ZoomFactor {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: ZoomFactor) {
        self.zoom = zoom;
    }

    pub fn policy(&self) -> &ReadOnlyPolicy {
        &self.policy
    }

    pub fn is_read_only(&self) -> bool {
        self.policy.is_read_only()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        debug!("Read-only {}", if read_only { "on" } else { "off" });
        self.policy.flag.set(read_only);
    }

    pub fn is_script_running(&self) -> bool {
        self.script_running
    }

    /// While a script runs, reserved combinations are forwarded like any key.
    pub fn set_script_running(&mut self, running: bool) {
        self.script_running = running;
    }

    /// Last pointer position in remote coordinates.
    pub fn pointer_position(&self) -> Point {
        self.mouse.position()
    }

    /// Forget held buttons and swallowed releases.
    pub fn reset(&mut self) {
        self.mouse.reset_buttons();
        self.swallowed.clear();
    }

    /// Convert a local position to the remote desktop and publish it.
    pub fn track_pointer(&mut self, pos: Point) -> Point {
        let remote = self.locate(pos);
        self.publish(Notification::PointerPosition(remote));
        remote
    }

    fn locate(&mut self, pos: Point) -> Point {
        let (w, h) = self.session.desktop_size();
        let remote = zoom::point_to_remote(pos, self.zoom)
            .clamp_to(w.saturating_sub(1), h.saturating_sub(1));
        self.mouse.set_position(remote);
        remote
    }

    fn publish(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            trace!("Notification dropped, nobody is listening");
        }
    }

    fn blocked(&self, origin: InputOrigin) -> bool {
        origin == InputOrigin::User && self.policy.is_read_only()
    }

    fn forward(
        &self,
        send: impl FnOnce(&dyn RemoteSession) -> Result<(), SessionError>,
    ) -> Result<InputOutcome, SessionError> {
        match send(self.session.as_ref()) {
            Ok(()) => Ok(InputOutcome::Forwarded),
            Err(e) => {
                if e.is_io() {
                    warn!("Failed to forward input: {}", e);
                    self.publish(Notification::IoError(e.to_string()));
                }
                Err(e)
            }
        }
    }

    fn send_pointer(&self, buttons: u8) -> Result<InputOutcome, SessionError> {
        let p = self.mouse.position();
        let x = u16::try_from(p.x.max(0)).unwrap_or(u16::MAX);
        let y = u16::try_from(p.y.max(0)).unwrap_or(u16::MAX);
        self.forward(|s| s.send_pointer_event(x, y, buttons))
    }

    fn key(
        &mut self,
        keysym: u32,
        down: bool,
        modifiers: Modifiers,
        origin: InputOrigin,
    ) -> Result<InputOutcome, SessionError> {
        let key = normalize_keysym(keysym);
        if !down && self.swallowed.remove(&key) {
            trace!("Swallowed release of reserved key 0x{:04x}", keysym);
            return Ok(InputOutcome::Consumed);
        }

        if down && !self.script_running {
            let combo = KeyCombo::new(modifiers, keysym);
            if let Some(action) = self.policy.reserved.lookup(&combo) {
                debug!("Reserved combination {} consumed ({:?})", combo, action);
                self.swallowed.insert(key);
                if action == ReservedAction::ToggleReadOnly {
                    self.host.toggle_read_only();
                }
                return Ok(InputOutcome::Reserved(action));
            }
        }

        if self.blocked(origin) {
            return Ok(InputOutcome::Blocked);
        }
        self.forward(|s| s.send_key_event(keysym, down))
    }
}

impl InputSink for InputForwarder {
    fn handle_input(
        &mut self,
        input: LocalInput,
        origin: InputOrigin,
    ) -> Result<InputOutcome, SessionError> {
        match input {
            LocalInput::PointerMoved { pos } => {
                self.track_pointer(pos);
                if self.blocked(origin) {
                    return Ok(InputOutcome::Blocked);
                }
                self.send_pointer(self.mouse.buttons().bits())
            }
            LocalInput::PointerPressed { pos, button } => {
                self.locate(pos);
                if self.blocked(origin) {
                    self.host.read_only_hint();
                    return Ok(InputOutcome::Blocked);
                }
                let buttons = self.mouse.press(button);
                self.send_pointer(buttons.bits())
            }
            LocalInput::PointerReleased { pos, button } => {
                self.locate(pos);
                let buttons = self.mouse.release(button);
                if self.blocked(origin) {
                    return Ok(InputOutcome::Blocked);
                }
                self.send_pointer(buttons.bits())
            }
            LocalInput::Wheel { pos, direction } => {
                self.locate(pos);
                if self.blocked(origin) {
                    return Ok(InputOutcome::Blocked);
                }
                for mask in self.mouse.wheel_masks(direction) {
                    self.send_pointer(mask.bits())?;
                }
                Ok(InputOutcome::Forwarded)
            }
            LocalInput::Key {
                keysym,
                down,
                modifiers,
            } => self.key(keysym, down, modifiers, origin),
        }
    }
}
