use eframe::egui;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggle(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
        }
    }

    /// Anything other than `light` keeps the dark default.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "light" => ThemeMode::Light,
            _ => ThemeMode::Dark,
        }
    }

    /// Button caption: offers the mode you would switch to.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            ThemeMode::Dark => "☀ Light",
            ThemeMode::Light => "🌙 Dark",
        }
    }

    pub fn visuals(&self) -> egui::Visuals {
        let mut v = match self {
            ThemeMode::Dark => egui::Visuals::dark(),
            ThemeMode::Light => egui::Visuals::light(),
        };
        v.window_rounding = egui::Rounding::same(8.0);
        v
    }

    pub fn apply(&self, ctx: &egui::Context) {
        ctx.set_visuals(self.visuals());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_and_parse_defaults_to_dark() {
        assert_eq!(ThemeMode::Dark.toggle(), ThemeMode::Light);
        assert_eq!(ThemeMode::Light.toggle().toggle(), ThemeMode::Light);
        assert_eq!(ThemeMode::parse("light"), ThemeMode::Light);
        assert_eq!(ThemeMode::parse("purple"), ThemeMode::Dark);
        assert_eq!(ThemeMode::parse(ThemeMode::Light.as_str()), ThemeMode::Light);
    }

    #[test]
    fn visuals_follow_mode() {
        assert!(ThemeMode::Dark.visuals().dark_mode);
        assert!(!ThemeMode::Light.visuals().dark_mode);
    }
}
