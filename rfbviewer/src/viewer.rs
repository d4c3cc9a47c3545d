//! The viewer facade.
//!
//! [`Viewer`] ties the framebuffer store, the input forwarder, the region
//! selector, the update flash overlay and the renderer together. It lives in
//! the presentation context: the host calls [`Viewer::poll_events`] and
//! [`Viewer::render`] once per frame and feeds it input through
//! [`InputSink`]. Everything the viewer has to say goes out on the
//! notification channel.

use crate::error::ViewerError;
use platform_input::{
    keysyms::{XK_Escape, XK_Return},
    HostControls, InputForwarder, InputOrigin, InputOutcome, InputSink, LocalInput,
    PointerButton, ReadOnlyPolicy,
};
use rfb_common::{zoom, Point, Rect, ZoomFactor};
use rfb_display::{
    Canvas, RegionSelector, Renderable, UpdateFlashOverlay, Viewport, ViewportConfig,
    ViewportRenderer,
};
use rfb_pixelbuffer::PixelBuffer;
use rfb_session::{
    FramebufferHandle, Notification, RemoteSession, ReservedAction, Selected, SessionError,
    ViewerConfig, ViewerEvent,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

pub struct Viewer {
    store: FramebufferHandle,
    events: flume::Receiver<ViewerEvent>,
    notify_tx: flume::Sender<Notification>,
    notify_rx: flume::Receiver<Notification>,
    forwarder: InputForwarder,
    selector: RegionSelector,
    overlay: UpdateFlashOverlay,
    renderer: ViewportRenderer,
    viewport: Viewport,
    /// Selector tolerance in local pixels, as configured.
    tolerance: u32,
    selection_mode: bool,
    dragging: bool,
    connected: bool,
    desktop_name: String,
}

impl Viewer {
    /// Build a viewer over an existing store and its pump's event channel.
    pub fn new(
        config: &ViewerConfig,
        store: FramebufferHandle,
        events: flume::Receiver<ViewerEvent>,
        session: Arc<dyn RemoteSession>,
        host: Arc<dyn HostControls>,
    ) -> Result<Self, ViewerError> {
        config.validate()?;
        let zoom = ZoomFactor::new(config.display.zoom_percent)?;
        let policy = ReadOnlyPolicy::from_config(config.input.read_only, &config.input.reserved)?;
        let (notify_tx, notify_rx) = flume::unbounded();

        let mut forwarder = InputForwarder::new(session, host, policy, notify_tx.clone());
        forwarder.set_zoom(zoom);

        store.set_filter(config.display.filter);
        store.set_zoom(zoom);
        let (width, height) = store.desktop_size();

        let mut viewport = Viewport::new(ViewportConfig::default());
        viewport.set_desktop_size(width, height);
        viewport.set_zoom(zoom);

        let tolerance = config.selector.tolerance;
        let selector = RegionSelector::new(
            remote_tolerance(tolerance, zoom),
            config.selector.point_mode,
            (width, height),
        );

        info!(
            "Viewer ready: {}x{} at {}, read-only {}",
            width, height, zoom, config.input.read_only
        );

        Ok(Self {
            store,
            events,
            notify_tx,
            notify_rx,
            forwarder,
            selector,
            overlay: UpdateFlashOverlay::new(
                config.flash_duration(),
                config.display.flash_updates,
            ),
            renderer: ViewportRenderer::new(),
            viewport,
            tolerance,
            selection_mode: false,
            dragging: false,
            connected: false,
            desktop_name: String::new(),
        })
    }

    /// Receiver for outward notifications. Clones share one queue.
    pub fn notifications(&self) -> flume::Receiver<Notification> {
        self.notify_rx.clone()
    }

    fn publish(&self, notification: Notification) {
        if self.notify_tx.send(notification).is_err() {
            trace!("Notification dropped");
        }
    }

    pub fn store(&self) -> &FramebufferHandle {
        &self.store
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn desktop_name(&self) -> &str {
        &self.desktop_name
    }

    // Zoom

    pub fn zoom(&self) -> ZoomFactor {
        self.forwarder.zoom()
    }

    /// Change the zoom. An invalid percentage leaves the current zoom in place.
    pub fn set_zoom_factor(&mut self, percent: i64) -> Result<(), ViewerError> {
        let zoom = ZoomFactor::new(percent).map_err(|e| {
            warn!("Rejected zoom {}%: {}", percent, e);
            e
        })?;
        self.apply_zoom(zoom);
        Ok(())
    }

    pub fn zoom_in(&mut self) -> bool {
        match self.viewport.zoom_in_step() {
            Some(zoom) => {
                self.apply_zoom(zoom);
                true
            }
            None => false,
        }
    }

    pub fn zoom_out(&mut self) -> bool {
        match self.viewport.zoom_out_step() {
            Some(zoom) => {
                self.apply_zoom(zoom);
                true
            }
            None => false,
        }
    }

    fn apply_zoom(&mut self, zoom: ZoomFactor) {
        if zoom == self.zoom() {
            return;
        }
        debug!("Zoom {} -> {}", self.zoom(), zoom);
        self.store.set_zoom(zoom);
        self.forwarder.set_zoom(zoom);
        self.viewport.set_zoom(zoom);
        self.selector
            .set_tolerance(remote_tolerance(self.tolerance, zoom));
    }

    // Viewport

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    // Input policy

    pub fn is_read_only(&self) -> bool {
        self.forwarder.is_read_only()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.forwarder.set_read_only(read_only);
    }

    pub fn set_script_running(&mut self, running: bool) {
        debug!("Script running: {}", running);
        self.forwarder.set_script_running(running);
    }

    /// Last pointer position in remote coordinates.
    pub fn pointer_position(&self) -> Point {
        self.forwarder.pointer_position()
    }

    // Selection

    pub fn is_selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Turn the region selector on or off. Turning it off cancels any selection.
    pub fn set_selection_mode(&mut self, enabled: bool) {
        if self.selection_mode == enabled {
            return;
        }
        debug!("Selection mode {}", if enabled { "on" } else { "off" });
        if !enabled {
            self.cancel_selection();
        }
        self.selection_mode = enabled;
        self.dragging = false;
    }

    pub fn region_selector(&self) -> &RegionSelector {
        &self.selector
    }

    /// Direct access for the scripting side; prefer
    /// [`Viewer::commit_selection`], which also notifies.
    pub fn region_selector_mut(&mut self) -> &mut RegionSelector {
        &mut self.selector
    }

    /// Accept the current selection and publish it.
    pub fn commit_selection(&mut self) -> Option<Selected> {
        self.dragging = false;
        let selected = self.selector.commit()?;
        info!("Selection committed: {:?}", selected);
        self.publish(Notification::SelectionCommitted(selected));
        Some(selected)
    }

    /// Discard the current selection. Returns true if there was one.
    pub fn cancel_selection(&mut self) -> bool {
        self.dragging = false;
        let had = self.selector.cancel();
        if had {
            self.publish(Notification::SelectionCancelled);
        }
        had
    }

    // Overlay

    pub fn overlay(&self) -> &UpdateFlashOverlay {
        &self.overlay
    }

    pub fn set_flash_updates(&mut self, enabled: bool) {
        self.overlay.set_enabled(enabled);
    }

    /// Flash a single remote pixel.
    pub fn mark_pixel(&mut self, point: Point, now: Instant) {
        self.overlay.add_pixel_mark(point, now);
    }

    /// Copy of the remote pixels under `selected`.
    ///
    /// A point selection yields a 1x1 image.
    pub fn capture(&self, selected: Selected) -> Result<PixelBuffer, ViewerError> {
        let rect = match selected {
            Selected::Region(r) => r,
            Selected::Point(p) => Rect::new(p.x, p.y, 1, 1),
        };
        self.store
            .canonical()
            .crop(rect)
            .map_err(|e| ViewerError::Capture(e.to_string()))
    }

    // Per-frame work

    /// Drain pump events and expire old flashes. Returns the number of events.
    pub fn poll_events(&mut self, now: Instant) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events.try_recv() {
            count += 1;
            self.handle_event(event, now);
        }
        self.overlay.prune(now);
        count
    }

    fn handle_event(&mut self, event: ViewerEvent, now: Instant) {
        match event {
            ViewerEvent::Connected {
                width,
                height,
                name,
            } => {
                info!("Session {:?} connected ({}x{})", name, width, height);
                self.connected = true;
                self.desktop_name = name.clone();
                self.viewport.set_desktop_size(width, height);
                self.selector.set_bounds(width, height);
                self.clear_interaction();
                self.publish(Notification::Connected {
                    width,
                    height,
                    name,
                });
            }
            ViewerEvent::Damage { rect } => self.overlay.add_frame_update(rect, now),
            ViewerEvent::Bell => self.publish(Notification::Bell),
            ViewerEvent::Clipboard { text } => self.publish(Notification::Clipboard(text)),
            ViewerEvent::IoError { message } => {
                warn!("Session I/O error: {}", message);
                self.publish(Notification::IoError(message));
            }
            ViewerEvent::Disconnected => {
                info!("Session disconnected");
                self.connected = false;
                self.clear_interaction();
                self.publish(Notification::Disconnected);
            }
        }
    }

    fn clear_interaction(&mut self) {
        self.selector.reset();
        self.overlay.clear();
        self.forwarder.reset();
        self.dragging = false;
    }

    /// Draw the current frame and overlays.
    pub fn render(&mut self, canvas: &mut dyn Canvas, now: Instant) {
        let frame = self.store.snapshot();
        let visible = self.viewport.visible_rect();
        let mut layers: Vec<&dyn Renderable> = vec![&self.overlay];
        if self.selection_mode {
            layers.push(&self.selector);
        }
        self.renderer.render(&frame, visible, now, &layers, canvas);
    }

    /// Publishes the pointer position and returns the unclamped grid point
    /// for the selector, which clamps corners to the desktop edges.
    fn selection_point(&mut self, pos: Point) -> Point {
        self.forwarder.track_pointer(pos);
        zoom::point_to_remote(pos, self.zoom())
    }

    fn handle_selection_input(
        &mut self,
        input: LocalInput,
        origin: InputOrigin,
    ) -> Result<InputOutcome, SessionError> {
        match input {
            LocalInput::PointerPressed {
                pos,
                button: PointerButton::Left,
            } => {
                let remote = self.selection_point(pos);
                self.selector.pointer_pressed(remote);
                self.dragging = true;
            }
            LocalInput::PointerMoved { pos } => {
                let remote = self.selection_point(pos);
                if self.dragging {
                    self.selector.pointer_dragged(remote);
                }
            }
            LocalInput::PointerReleased {
                pos,
                button: PointerButton::Left,
            } => {
                let remote = self.selection_point(pos);
                if self.dragging {
                    self.dragging = false;
                    if let Some(rect) = self.selector.pointer_released(remote) {
                        self.publish(Notification::SelectionDefined(rect));
                    }
                }
            }
            LocalInput::PointerPressed { .. }
            | LocalInput::PointerReleased { .. }
            | LocalInput::Wheel { .. } => {}
            LocalInput::Key {
                keysym: XK_Return,
                down,
                ..
            } => {
                if down {
                    self.commit_selection();
                }
            }
            LocalInput::Key {
                keysym: XK_Escape,
                down,
                ..
            } => {
                if down {
                    self.cancel_selection();
                }
            }
            LocalInput::Key { .. } => return self.forward(input, origin),
        }
        Ok(InputOutcome::Consumed)
    }

    fn forward(
        &mut self,
        input: LocalInput,
        origin: InputOrigin,
    ) -> Result<InputOutcome, SessionError> {
        let outcome = self.forwarder.handle_input(input, origin)?;
        if outcome == InputOutcome::Reserved(ReservedAction::ToggleSelectionMode) {
            self.set_selection_mode(!self.selection_mode);
        }
        Ok(outcome)
    }
}

impl InputSink for Viewer {
    /// In selection mode, user pointer input drives the selector and is not
    /// forwarded; Enter accepts and Escape cancels. Other keys and all
    /// replayed input take the normal forwarding path.
    fn handle_input(
        &mut self,
        input: LocalInput,
        origin: InputOrigin,
    ) -> Result<InputOutcome, SessionError> {
        if self.selection_mode && origin == InputOrigin::User {
            self.handle_selection_input(input, origin)
        } else {
            self.forward(input, origin)
        }
    }
}

/// Selector tolerance in remote pixels for a local tolerance at `zoom`.
fn remote_tolerance(local: u32, zoom: ZoomFactor) -> u32 {
    zoom::to_remote(local as i32, zoom).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_tolerance() {
        let z = |p| ZoomFactor::new(p).unwrap();
        assert_eq!(remote_tolerance(3, z(100)), 3);
        assert_eq!(remote_tolerance(3, z(50)), 6);
        assert_eq!(remote_tolerance(3, z(400)), 1);
    }
}
