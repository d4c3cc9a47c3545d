//! Integration tests for input forwarding policy.

use recorder::Recorder;
use platform_input::{
    keysyms::*, HostControls, InputForwarder, InputOrigin, InputOutcome, InputSink, LocalInput,
    Modifiers, PointerButton, ReadOnlyPolicy, WheelDirection,
};
use pretty_assertions::assert_eq;
use rfb_common::{Point, ZoomFactor};
use rfb_session::{
    Notification, RemoteSession, ReservedAction, ReservedShortcutConfig, SessionError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod recorder {
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Pointer(u16, u16, u8),
        Key(u32, bool),
    }

    #[derive(Default)]
    pub struct Recorder {
        pub sent: Mutex<Vec<Sent>>,
        pub fail: Mutex<bool>,
    }

    impl Recorder {
        pub fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }
}

use recorder::Sent;

impl RemoteSession for Recorder {
    fn send_pointer_event(&self, x: u16, y: u16, buttons: u8) -> Result<(), SessionError> {
        if *self.fail.lock().unwrap() {
            return Err(SessionError::Transport("broken pipe".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Pointer(x, y, buttons));
        Ok(())
    }

    fn send_key_event(&self, keysym: u32, down: bool) -> Result<(), SessionError> {
        if *self.fail.lock().unwrap() {
            return Err(SessionError::Transport("broken pipe".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Key(keysym, down));
        Ok(())
    }

    fn desktop_size(&self) -> (u32, u32) {
        (1024, 768)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct Host {
    toggles: AtomicUsize,
    hints: AtomicUsize,
}

impl HostControls for Host {
    fn toggle_read_only(&self) {
        self.toggles.fetch_add(1, Ordering::SeqCst);
    }

    fn read_only_hint(&self) {
        self.hints.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    session: Arc<Recorder>,
    host: Arc<Host>,
    forwarder: InputForwarder,
    notifications: flume::Receiver<Notification>,
}

fn fixture(read_only: bool) -> Fixture {
    let session = Arc::new(Recorder::default());
    let host = Arc::new(Host::default());
    let policy = ReadOnlyPolicy::from_config(
        read_only,
        &[
            ReservedShortcutConfig {
                keys: "F8".to_string(),
                action: ReservedAction::Local,
            },
            ReservedShortcutConfig {
                keys: "Ctrl+Shift+F10".to_string(),
                action: ReservedAction::ToggleReadOnly,
            },
        ],
    )
    .unwrap();
    let (tx, rx) = flume::unbounded();
    let forwarder = InputForwarder::new(session.clone(), host.clone(), policy, tx);
    Fixture {
        session,
        host,
        forwarder,
        notifications: rx,
    }
}

fn key(keysym: u32, down: bool) -> LocalInput {
    LocalInput::Key {
        keysym,
        down,
        modifiers: Modifiers::empty(),
    }
}

#[test]
fn test_key_forwarded_exactly_once() {
    let mut f = fixture(false);
    for down in [true, false] {
        let outcome = f
            .forwarder
            .handle_input(key('a' as u32, down), InputOrigin::User)
            .unwrap();
        assert_eq!(outcome, InputOutcome::Forwarded);
    }
    assert_eq!(
        f.session.take(),
        vec![Sent::Key('a' as u32, true), Sent::Key('a' as u32, false)]
    );
}

#[test]
fn test_read_only_never_sends_keys() {
    let mut f = fixture(true);
    for keysym in ['a' as u32, XK_Return, XK_F1] {
        for down in [true, false] {
            let outcome = f
                .forwarder
                .handle_input(key(keysym, down), InputOrigin::User)
                .unwrap();
            assert_eq!(outcome, InputOutcome::Blocked);
        }
    }
    assert!(f.session.take().is_empty());
}

#[test]
fn test_read_only_lets_replay_through() {
    let mut f = fixture(true);
    let outcome = f
        .forwarder
        .handle_input(key('x' as u32, true), InputOrigin::Replay)
        .unwrap();
    assert_eq!(outcome, InputOutcome::Forwarded);
    assert_eq!(f.session.take(), vec![Sent::Key('x' as u32, true)]);
}

#[test]
fn test_read_only_press_shows_hint() {
    let mut f = fixture(true);
    let pos = Point::new(10, 10);
    let pressed = LocalInput::PointerPressed {
        pos,
        button: PointerButton::Left,
    };
    assert_eq!(
        f.forwarder.handle_input(pressed, InputOrigin::User).unwrap(),
        InputOutcome::Blocked
    );
    assert_eq!(f.host.hints.load(Ordering::SeqCst), 1);
    assert!(f.session.take().is_empty());
}

#[test]
fn test_reserved_key_consumed_and_release_swallowed() {
    let mut f = fixture(false);
    assert_eq!(
        f.forwarder
            .handle_input(key(XK_F8, true), InputOrigin::User)
            .unwrap(),
        InputOutcome::Reserved(ReservedAction::Local)
    );
    assert_eq!(
        f.forwarder
            .handle_input(key(XK_F8, false), InputOrigin::User)
            .unwrap(),
        InputOutcome::Consumed
    );
    assert!(f.session.take().is_empty());
}

#[test]
fn test_reserved_key_wins_over_read_only() {
    let mut f = fixture(true);
    let toggle = LocalInput::Key {
        keysym: XK_F10,
        down: true,
        modifiers: Modifiers::CONTROL | Modifiers::SHIFT,
    };
    assert_eq!(
        f.forwarder.handle_input(toggle, InputOrigin::User).unwrap(),
        InputOutcome::Reserved(ReservedAction::ToggleReadOnly)
    );
    assert_eq!(f.host.toggles.load(Ordering::SeqCst), 1);
}

#[test]
fn test_local_reserved_key_consumed_while_read_only() {
    let mut f = fixture(true);
    assert_eq!(
        f.forwarder
            .handle_input(key(XK_F8, true), InputOrigin::User)
            .unwrap(),
        InputOutcome::Reserved(ReservedAction::Local)
    );
    assert_eq!(
        f.forwarder
            .handle_input(key(XK_F8, false), InputOrigin::User)
            .unwrap(),
        InputOutcome::Consumed
    );
    assert!(f.session.take().is_empty());
    assert_eq!(f.host.toggles.load(Ordering::SeqCst), 0);
    assert_eq!(f.host.hints.load(Ordering::SeqCst), 0);

    // Once the release is swallowed, a stray F8 release is just blocked
    assert_eq!(
        f.forwarder
            .handle_input(key(XK_F8, false), InputOrigin::User)
            .unwrap(),
        InputOutcome::Blocked
    );
}

#[test]
fn test_reserved_key_forwarded_while_script_runs() {
    let mut f = fixture(false);
    f.forwarder.set_script_running(true);
    for down in [true, false] {
        assert_eq!(
            f.forwarder
                .handle_input(key(XK_F8, down), InputOrigin::Replay)
                .unwrap(),
            InputOutcome::Forwarded
        );
    }
    assert_eq!(
        f.session.take(),
        vec![Sent::Key(XK_F8, true), Sent::Key(XK_F8, false)]
    );
}

#[test]
fn test_pointer_converted_clamped_and_published() {
    let mut f = fixture(false);
    f.forwarder.set_zoom(ZoomFactor::new(200).unwrap());

    f.forwarder
        .handle_input(
            LocalInput::PointerMoved {
                pos: Point::new(101, 60),
            },
            InputOrigin::User,
        )
        .unwrap();
    f.forwarder
        .handle_input(
            LocalInput::PointerPressed {
                pos: Point::new(5000, -20),
                button: PointerButton::Right,
            },
            InputOrigin::User,
        )
        .unwrap();

    assert_eq!(
        f.session.take(),
        vec![Sent::Pointer(51, 30, 0), Sent::Pointer(1023, 0, 4)]
    );
    assert_eq!(
        f.notifications.try_iter().collect::<Vec<_>>(),
        vec![Notification::PointerPosition(Point::new(51, 30))]
    );
}

#[test]
fn test_pointer_move_published_even_when_blocked() {
    let mut f = fixture(true);
    let outcome = f
        .forwarder
        .handle_input(
            LocalInput::PointerMoved {
                pos: Point::new(3, 4),
            },
            InputOrigin::User,
        )
        .unwrap();
    assert_eq!(outcome, InputOutcome::Blocked);
    assert_eq!(
        f.notifications.try_recv().unwrap(),
        Notification::PointerPosition(Point::new(3, 4))
    );
}

#[test]
fn test_wheel_sends_press_and_release() {
    let mut f = fixture(false);
    f.forwarder
        .handle_input(
            LocalInput::Wheel {
                pos: Point::new(7, 8),
                direction: WheelDirection::Up,
            },
            InputOrigin::User,
        )
        .unwrap();
    assert_eq!(
        f.session.take(),
        vec![Sent::Pointer(7, 8, 8), Sent::Pointer(7, 8, 0)]
    );
}

#[test]
fn test_transport_failure_published_and_returned() {
    let mut f = fixture(false);
    *f.session.fail.lock().unwrap() = true;

    let err = f
        .forwarder
        .handle_input(key('q' as u32, true), InputOrigin::User)
        .unwrap_err();
    assert!(err.is_io());
    assert_eq!(
        f.notifications.try_recv().unwrap(),
        Notification::IoError("Transport error: broken pipe".to_string())
    );
}
