use eframe::egui;
use rfb_common::{Point, ZoomFactor};
use std::time::{Duration, Instant};

/// How long a transient message stays in the status bar.
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    ZoomIn,
    ZoomOut,
    ZoomNative,
    ToggleReadOnly,
    ToggleSelectionMode,
    ToggleFlash,
    AcceptSelection,
    CancelSelection,
}

/// What the status bar shows this frame.
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub connected: bool,
    pub desktop_name: String,
    pub desktop_size: (u32, u32),
    pub pointer: Point,
    pub zoom: ZoomFactor,
    pub read_only: bool,
    pub selection_mode: bool,
    pub selection_label: Option<String>,
    pub flash_updates: bool,
}

pub struct StatusBar {
    message: Option<(String, Instant)>,
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBar {
    pub fn new() -> Self {
        Self { message: None }
    }

    /// Show `text` for a few seconds.
    pub fn set_message(&mut self, text: impl Into<String>, now: Instant) {
        self.message = Some((text.into(), now));
    }

    fn current_message(&mut self, now: Instant) -> Option<&str> {
        if let Some((_, since)) = &self.message {
            if now.saturating_duration_since(*since) > MESSAGE_TIMEOUT {
                self.message = None;
            }
        }
        self.message.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn show(&mut self, ctx: &egui::Context, info: &StatusInfo, now: Instant) -> Vec<StatusAction> {
        let mut actions = Vec::new();
        let message = self.current_message(now).map(str::to_owned);

        egui::TopBottomPanel::bottom("statusbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if info.connected {
                    ui.colored_label(egui::Color32::GREEN, "●");
                    ui.label(format!(
                        "{} {}×{}",
                        info.desktop_name, info.desktop_size.0, info.desktop_size.1
                    ));
                } else {
                    ui.colored_label(egui::Color32::RED, "●");
                    ui.label("Not connected");
                }

                ui.separator();
                ui.monospace(format!("{:>5},{:<5}", info.pointer.x, info.pointer.y));

                ui.separator();
                if ui.small_button("−").clicked() {
                    actions.push(StatusAction::ZoomOut);
                }
                if ui.small_button(info.zoom.to_string()).clicked() {
                    actions.push(StatusAction::ZoomNative);
                }
                if ui.small_button("+").clicked() {
                    actions.push(StatusAction::ZoomIn);
                }

                ui.separator();
                if ui.selectable_label(info.read_only, "Read-only").clicked() {
                    actions.push(StatusAction::ToggleReadOnly);
                }
                if ui.selectable_label(info.flash_updates, "Flash").clicked() {
                    actions.push(StatusAction::ToggleFlash);
                }
                if ui.selectable_label(info.selection_mode, "Select").clicked() {
                    actions.push(StatusAction::ToggleSelectionMode);
                }

                if info.selection_mode {
                    if let Some(label) = &info.selection_label {
                        ui.monospace(label);
                        if ui.small_button("Accept").clicked() {
                            actions.push(StatusAction::AcceptSelection);
                        }
                        if ui.small_button("Cancel").clicked() {
                            actions.push(StatusAction::CancelSelection);
                        }
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let now = chrono::Local::now();
                    ui.label(now.format("%H:%M:%S").to_string());
                    if let Some(text) = &message {
                        ui.separator();
                        ui.label(text);
                    }
                });
            });
        });

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_expires() {
        let t0 = Instant::now();
        let mut bar = StatusBar::new();
        bar.set_message("Bell", t0);
        assert_eq!(bar.current_message(t0 + Duration::from_secs(1)), Some("Bell"));
        assert_eq!(bar.current_message(t0 + Duration::from_secs(5)), None);
    }
}
