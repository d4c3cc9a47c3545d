use eframe::egui;
use platform_input::{keysym_from_name, keysyms::*, LocalInput, Modifiers, PointerButton, WheelDirection};
use rfb_common::{Point, Rect};
use rfb_display::{Canvas, Color};
use rfb_session::FrameSnapshot;
use std::time::Instant;
use tracing::debug;

use crate::viewer::Viewer;

const LABEL_FONT_SIZE: f32 = 12.0;

/// The remote desktop panel.
///
/// Owns the frame texture and turns egui input into [`LocalInput`].
pub struct DesktopView {
    texture: Option<egui::TextureHandle>,
    texture_version: Option<u64>,
    modifiers: egui::Modifiers,
}

impl Default for DesktopView {
    fn default() -> Self {
        Self::new()
    }
}

/// View-only requests made with modifier + wheel.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ViewRequests {
    /// +1 zoom in, -1 zoom out
    pub zoom_steps: i32,
    pub scroll: (i32, i32),
}

impl DesktopView {
    pub fn new() -> Self {
        Self {
            texture: None,
            texture_version: None,
            modifiers: egui::Modifiers::NONE,
        }
    }

    /// Lay out the panel, collect its input and draw the viewer into it.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        viewer: &mut Viewer,
        now: Instant,
    ) -> (Vec<LocalInput>, ViewRequests) {
        let size = ui.available_size();
        let response = ui.allocate_response(size, egui::Sense::click_and_drag());
        let rect = response.rect;
        viewer
            .viewport_mut()
            .set_window_size(rect.width().max(0.0) as u32, rect.height().max(0.0) as u32);

        let (inputs, requests) = self.collect_input(ui, &response, viewer);

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, egui::Color32::BLACK);
        let scroll = viewer.viewport().state();
        let origin = rect.min - egui::vec2(scroll.scroll_x as f32, scroll.scroll_y as f32);
        let mut canvas = EguiCanvas {
            painter: &painter,
            origin,
            texture: &mut self.texture,
            texture_version: &mut self.texture_version,
        };
        viewer.render(&mut canvas, now);

        (inputs, requests)
    }

    fn collect_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        viewer: &Viewer,
    ) -> (Vec<LocalInput>, ViewRequests) {
        let rect = response.rect;
        let to_local = |pos: egui::Pos2| {
            let window = Point::new((pos.x - rect.min.x) as i32, (pos.y - rect.min.y) as i32);
            viewer.viewport().window_to_local(window)
        };

        let mut inputs = Vec::new();
        let mut requests = ViewRequests::default();
        let focused = response.hovered() || response.has_focus() || response.dragged();

        ui.input(|i| {
            if focused {
                self.modifier_changes(i.modifiers, &mut inputs);
            }

            for event in &i.events {
                match event {
                    egui::Event::PointerMoved(pos) if rect.contains(*pos) => {
                        inputs.push(LocalInput::PointerMoved { pos: to_local(*pos) });
                    }
                    egui::Event::PointerButton {
                        pos,
                        button,
                        pressed,
                        ..
                    } => {
                        let Some(button) = map_button(*button) else {
                            continue;
                        };
                        let inside = rect.contains(*pos);
                        let pos = to_local(*pos);
                        if !*pressed {
                            inputs.push(LocalInput::PointerReleased { pos, button });
                        } else if inside {
                            inputs.push(LocalInput::PointerPressed { pos, button });
                        }
                    }
                    egui::Event::Key {
                        key,
                        pressed,
                        repeat,
                        modifiers,
                        ..
                    } if focused => {
                        if *repeat && !*pressed {
                            continue;
                        }
                        if let Some(keysym) = map_key(*key, modifiers.shift) {
                            inputs.push(LocalInput::Key {
                                keysym,
                                down: *pressed,
                                modifiers: map_modifiers(*modifiers),
                            });
                        }
                    }
                    _ => {}
                }
            }

            if response.hovered() {
                let zoom = i.zoom_delta();
                if zoom > 1.0 {
                    requests.zoom_steps += 1;
                } else if zoom < 1.0 {
                    requests.zoom_steps -= 1;
                }

                let delta = i.raw_scroll_delta;
                if i.modifiers.shift {
                    requests.scroll = (-delta.x as i32, -delta.y as i32);
                } else if let Some(pos) = i.pointer.hover_pos() {
                    let pos = to_local(pos);
                    let directions = [
                        (delta.y > 0.0, WheelDirection::Up),
                        (delta.y < 0.0, WheelDirection::Down),
                        (delta.x > 0.0, WheelDirection::Left),
                        (delta.x < 0.0, WheelDirection::Right),
                    ];
                    for (active, direction) in directions {
                        if active {
                            inputs.push(LocalInput::Wheel { pos, direction });
                        }
                    }
                }
            }
        });

        if !inputs.is_empty() {
            debug!("Collected {} input events", inputs.len());
        }
        (inputs, requests)
    }

    /// egui reports modifiers as state, the remote side wants key events.
    fn modifier_changes(&mut self, now: egui::Modifiers, out: &mut Vec<LocalInput>) {
        let before = self.modifiers;
        for (was, is, keysym) in [
            (before.shift, now.shift, XK_Shift_L),
            (before.ctrl, now.ctrl, XK_Control_L),
            (before.alt, now.alt, XK_Alt_L),
            (before.mac_cmd, now.mac_cmd, XK_Super_L),
        ] {
            if was != is {
                out.push(LocalInput::Key {
                    keysym,
                    down: is,
                    modifiers: map_modifiers(now),
                });
            }
        }
        self.modifiers = now;
    }
}

fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Left),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        egui::PointerButton::Secondary => Some(PointerButton::Right),
        _ => None,
    }
}

fn map_modifiers(m: egui::Modifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, m.shift);
    out.set(Modifiers::CONTROL, m.ctrl);
    out.set(Modifiers::ALT, m.alt);
    out.set(Modifiers::SUPER, m.mac_cmd);
    out
}

/// Keysym for `key`. Letters follow the shift state, so Shift+A sends `A`.
fn map_key(key: egui::Key, shift: bool) -> Option<u32> {
    use egui::Key;
    let keysym = match key {
        Key::ArrowLeft => Some(XK_Left),
        Key::ArrowRight => Some(XK_Right),
        Key::ArrowUp => Some(XK_Up),
        Key::ArrowDown => Some(XK_Down),
        Key::Enter => Some(XK_Return),
        _ => keysym_from_name(key.name()),
    }?;
    match char::from_u32(keysym) {
        Some(c) if shift && c.is_ascii_lowercase() => Some(c.to_ascii_uppercase() as u32),
        _ => Some(keysym),
    }
}

fn to_color32(c: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

/// [`Canvas`] over an egui painter. Local pixel (0, 0) sits at `origin`.
struct EguiCanvas<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
    texture: &'a mut Option<egui::TextureHandle>,
    texture_version: &'a mut Option<u64>,
}

impl EguiCanvas<'_> {
    fn pos(&self, p: Point) -> egui::Pos2 {
        self.origin + egui::vec2(p.x as f32, p.y as f32)
    }

    fn rect(&self, r: Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.pos(r.origin()),
            egui::vec2(r.width as f32, r.height as f32),
        )
    }

    fn font() -> egui::FontId {
        egui::FontId::monospace(LABEL_FONT_SIZE)
    }
}

impl Canvas for EguiCanvas<'_> {
    fn draw_frame(&mut self, frame: &FrameSnapshot) {
        let (w, h) = frame.image.dimensions();
        if *self.texture_version != Some(frame.version) || self.texture.is_none() {
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [w as usize, h as usize],
                frame.image.data(),
            );
            match self.texture.as_mut() {
                Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
                None => {
                    *self.texture = Some(self.painter.ctx().load_texture(
                        "remote-desktop",
                        image,
                        egui::TextureOptions::NEAREST,
                    ));
                }
            }
            *self.texture_version = Some(frame.version);
        }
        if let Some(texture) = self.texture.as_ref() {
            self.painter.image(
                texture.id(),
                self.rect(Rect::new(0, 0, w, h)),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        let r = self.rect(rect).shrink(0.5);
        self.painter
            .rect_stroke(r, 0.0, egui::Stroke::new(1.0, to_color32(color)));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.painter
            .rect_filled(self.rect(rect), 0.0, to_color32(color));
    }

    fn line(&mut self, from: Point, to: Point, color: Color) {
        let half = egui::vec2(0.5, 0.5);
        self.painter.line_segment(
            [self.pos(from) + half, self.pos(to) + half],
            egui::Stroke::new(1.0, to_color32(color)),
        );
    }

    fn text(&mut self, origin: Point, text: &str, color: Color) {
        self.painter.text(
            self.pos(origin),
            egui::Align2::LEFT_TOP,
            text,
            Self::font(),
            to_color32(color),
        );
    }

    fn text_size(&self, text: &str) -> (u32, u32) {
        let galley = self
            .painter
            .layout_no_wrap(text.to_string(), Self::font(), egui::Color32::WHITE);
        let size = galley.size();
        (size.x.ceil() as u32, size.y.ceil() as u32)
    }
}
