//! Viewer facade tests, driven without a window.

use bytes::Bytes;
use platform_input::{
    keysyms::*, HostControls, InputOrigin, InputOutcome, InputSink, LocalInput, Modifiers,
    PointerButton,
};
use pretty_assertions::assert_eq;
use rfb_common::{Point, Rect, ZoomFactor};
use rfb_display::{Canvas, Color, SelectorState};
use rfb_pixelbuffer::ScaleFilter;
use rfb_session::{
    event_loop, FrameSnapshot, FramebufferHandle, FramebufferStore, Notification, RemoteSession,
    Selected, SessionError, SessionEvent, ViewerConfig, ViewerEvent,
};
use rfbviewer::{Viewer, ViewerError};
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Default)]
struct RecordingSession {
    keys: Mutex<Vec<(u32, bool)>>,
    pointer: Mutex<Vec<(u16, u16, u8)>>,
}

impl RemoteSession for RecordingSession {
    fn send_pointer_event(&self, x: u16, y: u16, buttons: u8) -> Result<(), SessionError> {
        self.pointer.lock().unwrap().push((x, y, buttons));
        Ok(())
    }

    fn send_key_event(&self, keysym: u32, down: bool) -> Result<(), SessionError> {
        self.keys.lock().unwrap().push((keysym, down));
        Ok(())
    }

    fn desktop_size(&self) -> (u32, u32) {
        (200, 100)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

struct NoHost;

impl HostControls for NoHost {
    fn toggle_read_only(&self) {}
    fn read_only_hint(&self) {}
}

#[derive(Default)]
struct CountingCanvas {
    frames: usize,
    strokes: Vec<Rect>,
}

impl Canvas for CountingCanvas {
    fn draw_frame(&mut self, _frame: &FrameSnapshot) {
        self.frames += 1;
    }
    fn stroke_rect(&mut self, rect: Rect, _color: Color) {
        self.strokes.push(rect);
    }
    fn fill_rect(&mut self, _rect: Rect, _color: Color) {}
    fn line(&mut self, _from: Point, _to: Point, _color: Color) {}
    fn text(&mut self, _origin: Point, _text: &str, _color: Color) {}
    fn text_size(&self, text: &str) -> (u32, u32) {
        (text.len() as u32 * 6, 10)
    }
}

struct Harness {
    viewer: Viewer,
    store: FramebufferHandle,
    session: Arc<RecordingSession>,
    pump: flume::Sender<ViewerEvent>,
    notifications: flume::Receiver<Notification>,
}

impl Harness {
    fn new(config: ViewerConfig) -> Self {
        let store = Arc::new(FramebufferStore::new(
            200,
            100,
            ZoomFactor::NATIVE,
            ScaleFilter::Nearest,
        ));
        let (pump, events) = flume::unbounded();
        let session = Arc::new(RecordingSession::default());
        let viewer = Viewer::new(
            &config,
            store.clone(),
            events,
            session.clone(),
            Arc::new(NoHost),
        )
        .unwrap();
        let notifications = viewer.notifications();
        Self {
            viewer,
            store,
            session,
            pump,
            notifications,
        }
    }

    fn deliver(&self, event: SessionEvent) {
        event_loop::handle_event(&self.store, event, &self.pump);
    }

    fn drain(&self) -> Vec<Notification> {
        self.notifications
            .try_iter()
            .filter(|n| !matches!(n, Notification::PointerPosition(_)))
            .collect()
    }

    fn input(&mut self, input: LocalInput) -> InputOutcome {
        self.viewer.handle_input(input, InputOrigin::User).unwrap()
    }
}

fn solid(rect: Rect, value: u8) -> Bytes {
    Bytes::from(vec![value; rect.area() as usize * 4])
}

fn connected() -> Harness {
    let h = Harness::new(ViewerConfig::default());
    h.deliver(SessionEvent::Connected {
        width: 200,
        height: 100,
        name: "test".to_string(),
    });
    h
}

#[test]
fn test_connect_is_published() {
    let mut h = connected();
    assert_eq!(h.viewer.poll_events(Instant::now()), 1);
    assert!(h.viewer.is_connected());
    assert_eq!(
        h.drain(),
        vec![Notification::Connected {
            width: 200,
            height: 100,
            name: "test".to_string()
        }]
    );
}

#[test]
fn test_disconnect_mid_burst_keeps_frame_and_clears_selection() {
    let mut h = connected();
    h.viewer.set_selection_mode(true);
    h.viewer.poll_events(Instant::now());

    h.input(LocalInput::PointerPressed {
        pos: Point::new(10, 10),
        button: PointerButton::Left,
    });
    h.input(LocalInput::PointerReleased {
        pos: Point::new(50, 40),
        button: PointerButton::Left,
    });
    assert_eq!(h.viewer.region_selector().state(), SelectorState::Defined);

    let patch = Rect::new(0, 0, 4, 4);
    h.deliver(SessionEvent::FrameUpdate {
        rect: patch,
        pixels: solid(patch, 9),
    });
    h.deliver(SessionEvent::Disconnected);
    h.deliver(SessionEvent::FrameUpdate {
        rect: patch,
        pixels: solid(patch, 200),
    });
    h.viewer.poll_events(Instant::now());

    assert!(!h.viewer.is_connected());
    assert_eq!(h.viewer.region_selector().state(), SelectorState::Idle);
    assert!(h.viewer.overlay().is_empty());
    assert_eq!(h.store.canonical().pixel(1, 1), Some([9, 9, 9, 9]));
}

#[test]
fn test_selection_drag_commit_at_zoom() {
    let mut h = connected();
    h.viewer.poll_events(Instant::now());
    h.viewer.set_zoom_factor(200).unwrap();
    h.viewer.set_selection_mode(true);
    h.drain();

    assert_eq!(
        h.input(LocalInput::PointerPressed {
            pos: Point::new(20, 20),
            button: PointerButton::Left,
        }),
        InputOutcome::Consumed
    );
    h.input(LocalInput::PointerMoved {
        pos: Point::new(60, 40),
    });
    h.input(LocalInput::PointerReleased {
        pos: Point::new(100, 80),
        button: PointerButton::Left,
    });
    h.input(LocalInput::Key {
        keysym: XK_Return,
        down: true,
        modifiers: Modifiers::empty(),
    });

    let region = Rect::new(10, 10, 40, 30);
    assert_eq!(
        h.drain(),
        vec![
            Notification::SelectionDefined(region),
            Notification::SelectionCommitted(Selected::Region(region)),
        ]
    );
    assert!(h.session.pointer.lock().unwrap().is_empty());
    assert!(h.session.keys.lock().unwrap().is_empty());
}

#[test]
fn test_escape_cancels_selection() {
    let mut h = connected();
    h.viewer.set_selection_mode(true);
    h.input(LocalInput::PointerPressed {
        pos: Point::new(5, 5),
        button: PointerButton::Left,
    });
    h.input(LocalInput::PointerReleased {
        pos: Point::new(9, 9),
        button: PointerButton::Left,
    });
    h.input(LocalInput::Key {
        keysym: XK_Escape,
        down: true,
        modifiers: Modifiers::empty(),
    });
    assert_eq!(
        h.drain(),
        vec![
            Notification::SelectionDefined(Rect::new(5, 5, 4, 4)),
            Notification::SelectionCancelled,
        ]
    );
}

#[test]
fn test_reserved_shortcut_toggles_selection_mode() {
    let mut h = connected();
    let outcome = h.input(LocalInput::Key {
        keysym: XK_F11,
        down: true,
        modifiers: Modifiers::CONTROL | Modifiers::SHIFT,
    });
    assert!(matches!(outcome, InputOutcome::Reserved(_)));
    assert!(h.viewer.is_selection_mode());
    assert!(h.session.keys.lock().unwrap().is_empty());
}

#[test]
fn test_invalid_zoom_keeps_previous() {
    let mut h = connected();
    h.viewer.set_zoom_factor(150).unwrap();
    let err = h.viewer.set_zoom_factor(0).unwrap_err();
    assert!(matches!(err, ViewerError::Zoom(_)));
    assert_eq!(h.viewer.zoom().percent(), 150);
    assert_eq!(h.store.zoom().percent(), 150);
}

#[test]
fn test_read_only_blocks_forwarding() {
    let mut h = connected();
    h.viewer.set_read_only(true);
    let outcome = h.input(LocalInput::Key {
        keysym: 'a' as u32,
        down: true,
        modifiers: Modifiers::empty(),
    });
    assert_eq!(outcome, InputOutcome::Blocked);

    h.viewer.set_read_only(false);
    h.input(LocalInput::Key {
        keysym: 'a' as u32,
        down: true,
        modifiers: Modifiers::empty(),
    });
    assert_eq!(*h.session.keys.lock().unwrap(), vec![('a' as u32, true)]);
}

#[test]
fn test_damage_flashes_and_renders() {
    let config = ViewerConfig::builder().flash_updates(true).build().unwrap();
    let mut h = Harness::new(config);
    let rect = Rect::new(10, 10, 8, 8);
    h.deliver(SessionEvent::FrameUpdate {
        rect,
        pixels: solid(rect, 1),
    });
    let now = Instant::now();
    h.viewer.poll_events(now);
    assert_eq!(h.viewer.overlay().len(), 1);

    let mut canvas = CountingCanvas::default();
    h.viewer.render(&mut canvas, now);
    assert_eq!(canvas.frames, 1);
    assert_eq!(canvas.strokes, vec![rect]);
}

#[test]
fn test_capture_crops_canonical_image() {
    let mut h = connected();
    let rect = Rect::new(2, 3, 4, 5);
    h.deliver(SessionEvent::FrameUpdate {
        rect,
        pixels: solid(rect, 77),
    });
    h.viewer.poll_events(Instant::now());

    let image = h.viewer.capture(Selected::Region(rect)).unwrap();
    assert_eq!(image.dimensions(), (4, 5));
    assert!(image.data().iter().all(|&b| b == 77));

    let point = h.viewer.capture(Selected::Point(Point::new(0, 0))).unwrap();
    assert_eq!(point.dimensions(), (1, 1));
    assert!(h.viewer.capture(Selected::Region(Rect::new(190, 0, 20, 1))).is_err());
}

#[test]
fn test_full_desktop_drag_selects_whole_desktop() {
    let mut h = connected();
    h.viewer.poll_events(Instant::now());
    h.viewer.set_selection_mode(true);
    h.drain();

    h.input(LocalInput::PointerPressed {
        pos: Point::new(-10, -10),
        button: PointerButton::Left,
    });
    h.input(LocalInput::PointerMoved {
        pos: Point::new(500, 500),
    });
    h.input(LocalInput::PointerReleased {
        pos: Point::new(500, 500),
        button: PointerButton::Left,
    });

    let whole = Rect::new(0, 0, 200, 100);
    assert_eq!(h.drain(), vec![Notification::SelectionDefined(whole)]);
    let image = h.viewer.capture(Selected::Region(whole)).unwrap();
    assert_eq!(image.dimensions(), (200, 100));
}

#[test]
fn test_point_selection_past_edge_lands_on_last_pixel() {
    let mut h = connected();
    h.viewer.poll_events(Instant::now());
    h.viewer.set_selection_mode(true);
    h.input(LocalInput::PointerPressed {
        pos: Point::new(400, 300),
        button: PointerButton::Left,
    });
    h.input(LocalInput::PointerReleased {
        pos: Point::new(400, 300),
        button: PointerButton::Left,
    });
    h.input(LocalInput::Key {
        keysym: XK_Return,
        down: true,
        modifiers: Modifiers::empty(),
    });

    let committed = h
        .drain()
        .into_iter()
        .find_map(|n| match n {
            Notification::SelectionCommitted(selected) => Some(selected),
            _ => None,
        })
        .unwrap();
    assert_eq!(committed, Selected::Point(Point::new(199, 99)));
    assert_eq!(h.viewer.capture(committed).unwrap().dimensions(), (1, 1));
}
