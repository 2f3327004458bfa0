use eframe::egui;
use egui::{Color32, Stroke, Vec2};

// ============================================================================
// Palette — the fixed swatch set shared by both pickers
// ============================================================================

pub const PALETTE: [Color32; 12] = [
    Color32::from_rgb(0xFF, 0xFF, 0xFF),
    Color32::from_rgb(0x9E, 0x9E, 0x9E),
    Color32::from_rgb(0x18, 0xFF, 0xFF),
    Color32::from_rgb(0x64, 0xFF, 0xDA),
    Color32::from_rgb(0xFF, 0xD7, 0x40),
    Color32::from_rgb(0xFF, 0xAB, 0x40),
    Color32::from_rgb(0xFF, 0x6E, 0x40),
    Color32::from_rgb(0xB2, 0xFF, 0x59),
    Color32::from_rgb(0xEE, 0xFF, 0x41),
    Color32::from_rgb(0x29, 0x79, 0xFF),
    Color32::from_rgb(0xD5, 0x00, 0xF9),
    Color32::from_rgb(0xF5, 0x00, 0x57),
];

const SWATCH_SIZE: f32 = 22.0;

/// Upper-case `#RRGGBB`, the form the backend expects.
pub fn to_hex(c: Color32) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r(), c.g(), c.b())
}

/// Parse `#RGB` / `#RRGGBB` (the leading `#` is optional).
pub fn parse_hex(s: &str) -> Option<Color32> {
    let h = s.trim().trim_start_matches('#');
    let expanded: String = match h.len() {
        3 => h.chars().flat_map(|c| [c, c]).collect(),
        6 => h.to_string(),
        _ => return None,
    };
    let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
    let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
    let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
    Some(Color32::from_rgb(r, g, b))
}

pub fn is_white(c: Color32) -> bool {
    c.r() == 255 && c.g() == 255 && c.b() == 255
}

// ============================================================================
// ColorPicker — one swatch grid over the palette
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickerMode {
    /// Exactly one swatch is active at all times.
    AlwaysOne,
    /// Clicking the active swatch deselects it.
    Toggle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickerChange {
    Selected(Color32),
    Cleared,
    Unchanged,
}

#[derive(Clone, Debug)]
pub struct ColorPicker {
    mode: PickerMode,
    active: Option<usize>,
}

impl ColorPicker {
    /// Text colour picker: white selected by default.
    pub fn text_color() -> Self {
        Self {
            mode: PickerMode::AlwaysOne,
            active: Some(0),
        }
    }

    /// Image tint picker: nothing selected by default.
    pub fn image_tint() -> Self {
        Self {
            mode: PickerMode::Toggle,
            active: None,
        }
    }

    pub fn mode(&self) -> PickerMode {
        self.mode
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn is_active(&self, idx: usize) -> bool {
        self.active == Some(idx)
    }

    pub fn color(&self) -> Option<Color32> {
        self.active.map(|i| PALETTE[i])
    }

    pub fn click(&mut self, idx: usize) -> PickerChange {
        if idx >= PALETTE.len() {
            return PickerChange::Unchanged;
        }
        match self.mode {
            PickerMode::AlwaysOne => {
                self.active = Some(idx);
                PickerChange::Selected(PALETTE[idx])
            }
            PickerMode::Toggle => {
                if self.active == Some(idx) {
                    self.active = None;
                    PickerChange::Cleared
                } else {
                    self.active = Some(idx);
                    PickerChange::Selected(PALETTE[idx])
                }
            }
        }
    }

    /// Drop the selection. The always-one picker keeps its swatch.
    pub fn clear(&mut self) {
        if self.mode == PickerMode::Toggle {
            self.active = None;
        }
    }

    // ====================================================================
    // WIDGET: swatch grid
    // ====================================================================

    pub fn show(&mut self, ui: &mut egui::Ui) -> PickerChange {
        let mut change = PickerChange::Unchanged;
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing = Vec2::splat(4.0);
            for (idx, color) in PALETTE.iter().enumerate() {
                let (rect, resp) =
                    ui.allocate_exact_size(Vec2::splat(SWATCH_SIZE), egui::Sense::click());
                if ui.is_rect_visible(rect) {
                    let p = ui.painter();
                    p.rect_filled(rect, 3.0, *color);
                    let border = if self.is_active(idx) {
                        Stroke::new(2.0, ui.visuals().selection.stroke.color)
                    } else {
                        Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color)
                    };
                    p.rect_stroke(rect, 3.0, border);
                }
                if resp.on_hover_text(to_hex(*color)).clicked() {
                    change = self.click(idx);
                }
            }
        });
        change
    }
}
