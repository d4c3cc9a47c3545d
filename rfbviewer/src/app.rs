use eframe::{egui, App, Frame};
use parking_lot::Mutex;
use platform_input::{HostControls, InputOrigin, InputSink, LocalInput};
use rfb_session::{Notification, Selected, SessionHandle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::capture;
use crate::ui::{
    desktop::DesktopView,
    statusbar::{StatusAction, StatusBar, StatusInfo},
};
use crate::viewer::Viewer;

/// Requests the input forwarder makes of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    ToggleReadOnly,
    ReadOnlyHint,
}

/// [`HostControls`] that queues requests for the next frame.
pub struct AppControls {
    requests: flume::Sender<HostRequest>,
}

impl AppControls {
    pub fn new() -> (Arc<Self>, flume::Receiver<HostRequest>) {
        let (tx, rx) = flume::unbounded();
        (Arc::new(Self { requests: tx }), rx)
    }

    fn request(&self, request: HostRequest) {
        if self.requests.send(request).is_err() {
            debug!("Host gone, dropping {:?}", request);
        }
    }
}

impl HostControls for AppControls {
    fn toggle_read_only(&self) {
        self.request(HostRequest::ToggleReadOnly);
    }

    fn read_only_hint(&self) {
        self.request(HostRequest::ReadOnlyHint);
    }
}

/// First fatal error in unattended mode, read by `main` after the window closes.
pub type FailureSlot = Arc<Mutex<Option<String>>>;

pub struct ViewerApp {
    viewer: Viewer,
    session: SessionHandle,
    notifications: flume::Receiver<Notification>,
    host_requests: flume::Receiver<HostRequest>,

    desktop: DesktopView,
    statusbar: StatusBar,
    clipboard: Option<arboard::Clipboard>,

    capture_dir: Option<PathBuf>,
    unattended: bool,
    failure: FailureSlot,

    /// Keeps the pump and the session task alive.
    _runtime: tokio::runtime::Runtime,
}

impl ViewerApp {
    pub fn new(
        viewer: Viewer,
        session: SessionHandle,
        host_requests: flume::Receiver<HostRequest>,
        capture_dir: Option<PathBuf>,
        unattended: bool,
        failure: FailureSlot,
        runtime: tokio::runtime::Runtime,
    ) -> Self {
        let clipboard = match arboard::Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Clipboard unavailable: {}", e);
                None
            }
        };
        Self {
            notifications: viewer.notifications(),
            viewer,
            session,
            host_requests,
            desktop: DesktopView::new(),
            statusbar: StatusBar::new(),
            clipboard,
            capture_dir,
            unattended,
            failure,
            _runtime: runtime,
        }
    }

    fn fail(&mut self, ctx: &egui::Context, message: String) {
        error!("{}", message);
        if self.unattended {
            let mut slot = self.failure.lock();
            if slot.is_none() {
                *slot = Some(message);
            }
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        } else {
            self.statusbar.set_message(message, Instant::now());
        }
    }

    fn handle_host_requests(&mut self, now: Instant) {
        while let Ok(request) = self.host_requests.try_recv() {
            match request {
                HostRequest::ToggleReadOnly => {
                    let read_only = !self.viewer.is_read_only();
                    self.viewer.set_read_only(read_only);
                    self.statusbar.set_message(
                        if read_only { "Read-only on" } else { "Read-only off" },
                        now,
                    );
                }
                HostRequest::ReadOnlyHint => {
                    self.statusbar
                        .set_message("Read-only: input is not sent to the remote desktop", now);
                }
            }
        }
    }

    fn handle_notifications(&mut self, ctx: &egui::Context, now: Instant) {
        while let Ok(notification) = self.notifications.try_recv() {
            match notification {
                Notification::PointerPosition(_) => {}
                Notification::SelectionDefined(rect) => {
                    debug!("Selection defined: {:?}", rect);
                }
                Notification::SelectionCommitted(selected) => self.on_committed(ctx, selected, now),
                Notification::SelectionCancelled => {
                    self.statusbar.set_message("Selection cancelled", now);
                }
                Notification::IoError(message) => {
                    self.fail(ctx, format!("I/O error: {}", message));
                }
                Notification::Connected {
                    width,
                    height,
                    name,
                } => {
                    self.statusbar
                        .set_message(format!("Connected to {} ({}x{})", name, width, height), now);
                }
                Notification::Disconnected => {
                    self.statusbar.set_message("Disconnected", now);
                }
                Notification::Bell => self.statusbar.set_message("Bell", now),
                Notification::Clipboard(text) => {
                    if let Some(clipboard) = self.clipboard.as_mut() {
                        if let Err(e) = clipboard.set_text(text) {
                            warn!("Failed to update clipboard: {}", e);
                        }
                    }
                }
            }
        }
    }

    fn on_committed(&mut self, ctx: &egui::Context, selected: Selected, now: Instant) {
        let Some(dir) = self.capture_dir.clone() else {
            self.statusbar
                .set_message(format!("Selected {:?}", selected), now);
            return;
        };
        let result = self
            .viewer
            .capture(selected)
            .map_err(anyhow::Error::from)
            .and_then(|image| capture::save_png(&dir, selected, &image));
        match result {
            Ok(path) => self
                .statusbar
                .set_message(format!("Saved {}", path.display()), now),
            Err(e) => self.fail(ctx, format!("Capture failed: {:#}", e)),
        }
    }

    fn handle_status_actions(&mut self, actions: Vec<StatusAction>) {
        for action in actions {
            debug!("Status bar action: {:?}", action);
            match action {
                StatusAction::ZoomIn => {
                    self.viewer.zoom_in();
                }
                StatusAction::ZoomOut => {
                    self.viewer.zoom_out();
                }
                StatusAction::ZoomNative => {
                    if let Err(e) = self.viewer.set_zoom_factor(100) {
                        warn!("{}", e);
                    }
                }
                StatusAction::ToggleReadOnly => {
                    let read_only = !self.viewer.is_read_only();
                    self.viewer.set_read_only(read_only);
                }
                StatusAction::ToggleSelectionMode => {
                    let enabled = !self.viewer.is_selection_mode();
                    self.viewer.set_selection_mode(enabled);
                }
                StatusAction::ToggleFlash => {
                    let enabled = !self.viewer.overlay().is_enabled();
                    self.viewer.set_flash_updates(enabled);
                }
                StatusAction::AcceptSelection => {
                    self.viewer.commit_selection();
                }
                StatusAction::CancelSelection => {
                    self.viewer.cancel_selection();
                }
            }
        }
    }

    fn dispatch_input(&mut self, ctx: &egui::Context, inputs: Vec<LocalInput>) {
        for input in inputs {
            match self.viewer.handle_input(input, InputOrigin::User) {
                Ok(_) => {}
                // Already published as a notification
                Err(e) if e.is_io() => {}
                Err(e) => self.fail(ctx, format!("Input rejected: {}", e)),
            }
        }
    }

    fn status_info(&self) -> StatusInfo {
        StatusInfo {
            connected: self.viewer.is_connected(),
            desktop_name: self.viewer.desktop_name().to_string(),
            desktop_size: self.viewer.store().desktop_size(),
            pointer: self.viewer.pointer_position(),
            zoom: self.viewer.zoom(),
            read_only: self.viewer.is_read_only(),
            selection_mode: self.viewer.is_selection_mode(),
            selection_label: self.viewer.region_selector().label(),
            flash_updates: self.viewer.overlay().is_enabled(),
        }
    }
}

impl App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        let now = Instant::now();

        self.viewer.poll_events(now);
        self.handle_host_requests(now);
        self.handle_notifications(ctx, now);

        let info = self.status_info();
        let actions = self.statusbar.show(ctx, &info, now);
        self.handle_status_actions(actions);

        let (inputs, requests) = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.desktop.show(ui, &mut self.viewer, now))
            .inner;

        for _ in 0..requests.zoom_steps.max(0) {
            self.viewer.zoom_in();
        }
        for _ in 0..(-requests.zoom_steps).max(0) {
            self.viewer.zoom_out();
        }
        if requests.scroll != (0, 0) {
            self.viewer
                .viewport_mut()
                .scroll_by(requests.scroll.0, requests.scroll.1);
        }
        self.dispatch_input(ctx, inputs);

        // Marching ants and flash fades need continuous frames
        ctx.request_repaint();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application shutting down");
        if let Err(e) = self.session.close() {
            debug!("Session already closed: {}", e);
        }
    }
}
