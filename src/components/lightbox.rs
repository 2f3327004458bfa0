use eframe::egui;
use egui::{Color32, Vec2};

use crate::images::{TextureCache, fit_rect};
use crate::input::{Swipe, SwipeTracker};

/// Candidate list for a lightbox session. Posters win, fanart logos are the
/// fallback, and the current main image is always present (first if added).
pub fn build_candidates(posters: &[String], fanart: &[String], current: &str) -> Vec<String> {
    let mut imgs: Vec<String> = if !posters.is_empty() {
        posters.to_vec()
    } else {
        fanart.to_vec()
    };
    if !imgs.iter().any(|u| u == current) {
        imgs.insert(0, current.to_string());
    }
    imgs
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightboxAction {
    /// Set the displayed image as the artist's poster.
    SaveCurrent,
    Close,
}

const THUMB_SIDE: f32 = 72.0;
/// Room around the large view for the controls row and the thumbnail rail.
const PANEL_CHROME: Vec2 = Vec2::new(24.0, 160.0);
const BACKDROP: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 200);
const FULL_UV: egui::Rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

// ============================================================================
// Lightbox — modal image browser
// ============================================================================

#[derive(Default)]
pub struct Lightbox {
    images: Vec<String>,
    index: usize,
    open: bool,
    scroll_thumb: bool,
    swipe: SwipeTracker,
}

impl Lightbox {
    /// Start a new session. Index starts at `prefer` when it is in the list.
    pub fn open_with(&mut self, images: Vec<String>, prefer: Option<&str>) {
        self.index = prefer
            .and_then(|p| images.iter().position(|u| u == p))
            .unwrap_or(0);
        self.images = images;
        self.open = true;
        self.scroll_thumb = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        self.images.get(self.index).map(String::as_str)
    }

    /// Jump to `i`, wrapping: below zero lands on the last image, past the
    /// end lands on the first.
    pub fn go_to(&mut self, i: isize) {
        let len = self.images.len();
        if len == 0 {
            return;
        }
        self.index = if i < 0 {
            len - 1
        } else if i as usize >= len {
            0
        } else {
            i as usize
        };
        self.scroll_thumb = true;
    }

    pub fn next(&mut self) {
        self.go_to(self.index as isize + 1);
    }

    pub fn prev(&mut self) {
        self.go_to(self.index as isize - 1);
    }

    pub fn apply_swipe(&mut self, swipe: Swipe) {
        match swipe {
            Swipe::Previous => self.prev(),
            Swipe::Next => self.next(),
        }
    }

    // ====================================================================
    // WIDGET: modal overlay
    // ====================================================================

    pub fn layer_id() -> egui::LayerId {
        egui::LayerId::new(egui::Order::Foreground, egui::Id::new("lightbox"))
    }

    /// Draw the overlay. It covers the whole screen, so nothing underneath
    /// receives pointer input while it is open; a click on the backdrop
    /// closes it.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        textures: &TextureCache,
        wanted: &mut Vec<String>,
    ) -> Option<LightboxAction> {
        if !self.open {
            return None;
        }
        let screen = ctx.screen_rect();
        let view_size = Vec2::new(screen.width() * 0.7, screen.height() * 0.6);
        let panel = egui::Rect::from_center_size(screen.center(), view_size + PANEL_CHROME);
        let mut action = None;
        let mut dismiss = false;

        egui::Area::new(Self::layer_id().id)
            .order(egui::Order::Foreground)
            .fixed_pos(screen.min)
            .movable(false)
            .show(ctx, |ui| {
                ui.painter().rect_filled(screen, 0.0, BACKDROP);
                ui.allocate_ui_at_rect(panel, |ui| {
                    egui::Frame::window(ui.style()).show(ui, |ui| {
                        action = self.contents(ui, view_size, textures, wanted);
                    });
                });
                // Interacted after the panel so its widgets keep their clicks.
                let backdrop = ui.interact(screen, Self::layer_id().id.with("backdrop"), egui::Sense::click());
                ui.allocate_rect(screen, egui::Sense::hover());
                if backdrop.clicked()
                    && backdrop.interact_pointer_pos().is_some_and(|p| !panel.contains(p))
                {
                    dismiss = true;
                }
            });

        if dismiss || action == Some(LightboxAction::Close) {
            self.close();
            return None;
        }
        action
    }

    fn contents(
        &mut self,
        ui: &mut egui::Ui,
        view_size: Vec2,
        textures: &TextureCache,
        wanted: &mut Vec<String>,
    ) -> Option<LightboxAction> {
        let mut action = None;

        // -- large view --
        let (rect, resp) = ui.allocate_exact_size(view_size, egui::Sense::click_and_drag());
        ui.painter().rect_filled(rect, 4.0, Color32::BLACK);
        if let Some(url) = self.current() {
            match textures.get(url) {
                Some(tex) => {
                    ui.painter()
                        .image(tex.id(), fit_rect(tex.size_vec2(), rect), FULL_UV, Color32::WHITE);
                }
                None => {
                    if !textures.is_failed(url) {
                        wanted.push(url.to_string());
                    }
                    ui.put(rect, egui::Spinner::new());
                }
            }
        }
        if let Some(swipe) = self.swipe.track(&resp) {
            self.apply_swipe(swipe);
        }

        // -- controls --
        ui.horizontal(|ui| {
            if ui.button("◀").clicked() {
                self.prev();
            }
            ui.label(format!("{} / {}", self.index + 1, self.images.len()));
            if ui.button("▶").clicked() {
                self.next();
            }
            ui.separator();
            if ui.button("Set as poster").clicked() {
                action = Some(LightboxAction::SaveCurrent);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("✕").on_hover_text("Close (Esc)").clicked() {
                    action = Some(LightboxAction::Close);
                }
            });
        });

        // -- thumbnail rail --
        let scroll = std::mem::take(&mut self.scroll_thumb);
        let mut jump = None;
        egui::ScrollArea::horizontal().show(ui, |ui| {
            ui.horizontal(|ui| {
                for (i, url) in self.images.iter().enumerate() {
                    let (r, resp) = ui.allocate_exact_size(Vec2::splat(THUMB_SIDE), egui::Sense::click());
                    ui.painter().rect_filled(r, 2.0, Color32::BLACK);
                    match textures.get(url) {
                        Some(tex) => {
                            ui.painter()
                                .image(tex.id(), fit_rect(tex.size_vec2(), r), FULL_UV, Color32::WHITE);
                        }
                        None if !textures.is_failed(url) => wanted.push(url.clone()),
                        None => {}
                    }
                    if i == self.index {
                        ui.painter().rect_stroke(
                            r,
                            2.0,
                            egui::Stroke::new(2.0, ui.visuals().selection.stroke.color),
                        );
                        if scroll {
                            resp.scroll_to_me(Some(egui::Align::Center));
                        }
                    }
                    if resp.clicked() {
                        jump = Some(i);
                    }
                }
            });
        });
        if let Some(i) = jump {
            self.go_to(i as isize);
        }
        action
    }
}
