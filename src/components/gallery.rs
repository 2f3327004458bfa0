use eframe::egui;
use egui::{Color32, Vec2};

use crate::images::TextureCache;
use crate::input::{Swipe, SwipeTracker};

const MAX_PAGE_SIZE: usize = 9;

/// Grid columns/rows for the fanart page at a given viewport width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    pub cols: usize,
    pub rows: usize,
}

impl GridShape {
    pub fn for_width(width: f32) -> Self {
        let (cols, rows) = if width >= 900.0 {
            (3, 3)
        } else if width >= 700.0 {
            (3, 2)
        } else if width >= 500.0 {
            (2, 2)
        } else {
            (1, 1)
        };
        Self { cols, rows }
    }

    pub fn page_size(self) -> usize {
        (self.cols * self.rows).min(MAX_PAGE_SIZE)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GalleryAction {
    /// A logo was clicked; carries its original (unproxied) URL.
    Choose(String),
}

// ============================================================================
// FanartGallery — paged candidate logos for the current artist
// ============================================================================

pub struct FanartGallery {
    logos: Vec<String>,
    /// 1-based.
    page: usize,
    swipe: SwipeTracker,
}

impl Default for FanartGallery {
    fn default() -> Self {
        Self {
            logos: Vec::new(),
            page: 1,
            swipe: SwipeTracker::default(),
        }
    }
}

impl FanartGallery {
    pub fn set_logos(&mut self, logos: Vec<String>) {
        self.logos = logos;
        self.page = 1;
    }

    pub fn clear(&mut self) {
        self.set_logos(Vec::new());
    }

    pub fn logos(&self) -> &[String] {
        &self.logos
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self, page_size: usize) -> usize {
        let size = page_size.max(1);
        self.logos.len().div_ceil(size).max(1)
    }

    /// Keep the page inside `[1, total_pages]` (the page size moves with the viewport).
    pub fn clamp_page(&mut self, page_size: usize) {
        self.page = self.page.clamp(1, self.total_pages(page_size));
    }

    pub fn page_items(&self, page_size: usize) -> &[String] {
        let size = page_size.max(1);
        let start = ((self.page - 1) * size).min(self.logos.len());
        let end = (start + size).min(self.logos.len());
        &self.logos[start..end]
    }

    pub fn can_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_next(&self, page_size: usize) -> bool {
        self.page < self.total_pages(page_size)
    }

    pub fn prev(&mut self) -> bool {
        if self.can_prev() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self, page_size: usize) -> bool {
        if self.can_next(page_size) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn apply_swipe(&mut self, swipe: Swipe, page_size: usize) -> bool {
        match swipe {
            Swipe::Previous => self.prev(),
            Swipe::Next => self.next(page_size),
        }
    }

    // ====================================================================
    // WIDGET: logo grid + pagination row
    // ====================================================================

    /// Draw the current page. URLs whose thumbnails are not cached yet are
    /// pushed onto `wanted`.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        viewport_width: f32,
        textures: &TextureCache,
        wanted: &mut Vec<String>,
    ) -> Option<GalleryAction> {
        let shape = GridShape::for_width(viewport_width);
        let page_size = shape.page_size();
        self.clamp_page(page_size);

        if self.logos.is_empty() {
            ui.label("No fanart logos for this artist.");
            return None;
        }

        let mut action = None;
        let spacing = 8.0;
        let cell_w = ((ui.available_width() - spacing * (shape.cols as f32 - 1.0))
            / shape.cols as f32)
            .max(48.0);
        let cell = Vec2::new(cell_w, cell_w * 0.5);

        let grid = ui.scope(|ui| {
            ui.spacing_mut().item_spacing = Vec2::splat(spacing);
            for row in self.page_items(page_size).chunks(shape.cols) {
                ui.horizontal(|ui| {
                    for url in row {
                        let (rect, resp) = ui.allocate_exact_size(cell, egui::Sense::click());
                        let painter = ui.painter();
                        painter.rect_filled(rect, 4.0, Color32::BLACK);
                        match textures.get(url) {
                            Some(tex) => {
                                let fitted = crate::images::fit_rect(tex.size_vec2(), rect.shrink(4.0));
                                painter.image(
                                    tex.id(),
                                    fitted,
                                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                                    Color32::WHITE,
                                );
                            }
                            None => {
                                if textures.is_failed(url) {
                                    painter.text(
                                        rect.center(),
                                        egui::Align2::CENTER_CENTER,
                                        "✖",
                                        egui::FontId::proportional(16.0),
                                        Color32::GRAY,
                                    );
                                } else {
                                    wanted.push(url.clone());
                                }
                            }
                        }
                        if resp.hovered() {
                            painter.rect_stroke(
                                rect,
                                4.0,
                                egui::Stroke::new(2.0, ui.visuals().selection.stroke.color),
                            );
                        }
                        if resp.clicked() {
                            action = Some(GalleryAction::Choose(url.clone()));
                        }
                    }
                });
            }
        });

        let drag = grid.response.interact(egui::Sense::drag());
        if let Some(swipe) = self.swipe.track(&drag) {
            self.apply_swipe(swipe, page_size);
        }

        // -- pagination: always prev / indicator / next in the same place --
        ui.horizontal(|ui| {
            let total = self.total_pages(page_size);
            if ui.add_enabled(self.can_prev(), egui::Button::new("<")).clicked() {
                self.prev();
            }
            ui.label(format!("Page {} of {}", self.page, total));
            if ui.add_enabled(self.can_next(page_size), egui::Button::new(">")).clicked() {
                self.next(page_size);
            }
        });

        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logos(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://assets.example/logo{i}.png")).collect()
    }

    #[test]
    fn grid_shape_follows_breakpoints() {
        assert_eq!(GridShape::for_width(1400.0).page_size(), 9);
        assert_eq!(GridShape::for_width(950.0).page_size(), 9);
        assert_eq!(GridShape::for_width(700.0).page_size(), 6);
        assert_eq!(GridShape::for_width(520.0).page_size(), 4);
        assert_eq!(GridShape::for_width(320.0).page_size(), 1);
    }

    #[test]
    fn twenty_logos_make_three_pages_of_nine() {
        let mut g = FanartGallery::default();
        g.set_logos(logos(20));
        assert_eq!(g.total_pages(9), 3);
        assert!(g.next(9));
        assert!(g.next(9));
        assert!(!g.next(9));
        assert_eq!(g.page(), 3);
        assert_eq!(g.page_items(9).len(), 2);
        assert_eq!(g.page_items(9)[0], "https://assets.example/logo18.png");
    }

    #[test]
    fn empty_gallery_still_has_one_page() {
        let g = FanartGallery::default();
        assert_eq!(g.total_pages(9), 1);
        assert!(g.page_items(9).is_empty());
        assert!(!g.can_prev());
        assert!(!g.can_next(9));
    }

    #[test]
    fn shrinking_page_size_keeps_page_in_range() {
        let mut g = FanartGallery::default();
        g.set_logos(logos(20));
        g.next(1);
        g.next(1);
        g.next(1);
        assert_eq!(g.page(), 4);
        g.clamp_page(9);
        assert_eq!(g.page(), 3);
    }

    #[test]
    fn new_logo_list_resets_to_first_page() {
        let mut g = FanartGallery::default();
        g.set_logos(logos(20));
        g.next(9);
        g.set_logos(logos(5));
        assert_eq!(g.page(), 1);
    }

    #[test]
    fn swipes_move_one_page() {
        let mut g = FanartGallery::default();
        g.set_logos(logos(20));
        assert!(!g.apply_swipe(Swipe::Previous, 9));
        assert!(g.apply_swipe(Swipe::Next, 9));
        assert_eq!(g.page(), 2);
        assert!(g.apply_swipe(Swipe::Previous, 9));
        assert_eq!(g.page(), 1);
    }
}
