// ============================================================================
// EDITOR SESSION — everything the editor knows about the artist being worked on
// ============================================================================

use crate::api::{ApiError, SaveRequest, TextLogoRequest, proxy_image_url};
use crate::components::colors::{ColorPicker, is_white, to_hex};
use crate::compositor::PreviewInputs;
use crate::ops::text::{TextCase, layout_rows};
use crate::ops::transform::TransformOptions;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 3.0;
pub const MIN_CONTRAST: f32 = 0.0;
pub const MAX_CONTRAST: f32 = 3.0;
pub const MAX_ROWS: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentArtist {
    pub key: String,
    pub name: String,
}

/// Which control panel sits under the preview. At most one is open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditorSection {
    #[default]
    Fanart,
    TextGenerator,
}

impl EditorSection {
    pub fn label(&self) -> &'static str {
        match self {
            EditorSection::Fanart => "Fanart logos",
            EditorSection::TextGenerator => "Text logo",
        }
    }
}

/// Where the logo in the preview came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogoSource {
    /// Original fanart URL; displayed through the server's image proxy.
    Fanart(String),
    /// `data:` URI of a local file.
    Upload(String),
    /// `data:` URI of a server-rendered text logo.
    Generated(String),
}

impl LogoSource {
    /// Value sent as `url` when saving.
    pub fn save_url(&self) -> &str {
        match self {
            LogoSource::Fanart(u) | LogoSource::Upload(u) | LogoSource::Generated(u) => u,
        }
    }

    /// URL the preview image is fetched from.
    pub fn display_url(&self, base: &str) -> Result<String, ApiError> {
        match self {
            LogoSource::Fanart(u) => proxy_image_url(base, u),
            LogoSource::Upload(u) | LogoSource::Generated(u) => Ok(u.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextParams {
    pub font: String,
    pub rows: u32,
    pub case: TextCase,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: "Roboto".to_string(),
            rows: 1,
            case: TextCase::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSettings {
    pub zoom: f32,
    pub contrast: f32,
    pub invert: bool,
    pub monochrome: bool,
    /// Let the server fit the logo to its default box; zoom is ignored.
    pub apply_default_size: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            contrast: 1.0,
            invert: false,
            monochrome: false,
            apply_default_size: true,
        }
    }
}

// ============================================================================
// EditorSession
// ============================================================================

pub struct EditorSession {
    pub current: Option<CurrentArtist>,
    pub text: TextParams,
    pub text_color: ColorPicker,
    pub tint: ColorPicker,
    pub selected_logo: Option<LogoSource>,
    pub filters: FilterSettings,
    pub section: Option<EditorSection>,
    /// Cache-buster for the main artist image.
    pub poster_nonce: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self {
            current: None,
            text: TextParams::default(),
            text_color: ColorPicker::text_color(),
            tint: ColorPicker::image_tint(),
            selected_logo: None,
            filters: FilterSettings::default(),
            section: None,
            poster_nonce: 0,
        }
    }
}

impl EditorSession {
    pub fn current_key(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.key.as_str())
    }

    /// Switch to another artist. The fanart panel opens, and any logo picked
    /// for the previous artist is dropped.
    pub fn load_artist(&mut self, key: &str, name: &str) {
        self.current = Some(CurrentArtist {
            key: key.to_string(),
            name: name.to_string(),
        });
        self.selected_logo = None;
        self.section = Some(EditorSection::Fanart);
        self.reset_filters();
        self.bump_poster();
    }

    pub fn bump_poster(&mut self) {
        self.poster_nonce = self.poster_nonce.wrapping_add(1);
    }

    /// Open `section` and close the other, or close it if it is already open.
    pub fn toggle_section(&mut self, section: EditorSection) {
        self.section = if self.section == Some(section) {
            None
        } else {
            Some(section)
        };
    }

    pub fn is_section_open(&self, section: EditorSection) -> bool {
        self.section == Some(section)
    }

    // -- filters --------------------------------------------------------------

    pub fn reset_filters(&mut self) {
        self.filters = FilterSettings::default();
        self.tint.clear();
    }

    pub fn choose_logo(&mut self, source: LogoSource) {
        self.selected_logo = Some(source);
        self.reset_filters();
    }

    pub fn toggle_invert(&mut self) {
        self.filters.invert = !self.filters.invert;
    }

    pub fn toggle_monochrome(&mut self) {
        self.filters.monochrome = !self.filters.monochrome;
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.filters.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn set_contrast(&mut self, contrast: f32) {
        self.filters.contrast = contrast.clamp(MIN_CONTRAST, MAX_CONTRAST);
    }

    pub fn preview_inputs(&self) -> PreviewInputs {
        PreviewInputs {
            zoom: self.filters.zoom,
            contrast: self.filters.contrast,
            invert: self.filters.invert,
            monochrome: self.filters.monochrome,
            tint: self.tint.color(),
            apply_default_size: self.filters.apply_default_size,
        }
    }

    pub fn transform_options(&self) -> TransformOptions {
        let tint = self.tint.color();
        TransformOptions {
            apply_default_size: self.filters.apply_default_size,
            invert: self.filters.invert,
            make_white: tint.is_some_and(is_white),
            contrast: self.filters.contrast,
            zoom: self.filters.zoom,
            monochrome: self.filters.monochrome,
            tint,
        }
    }

    // -- text generator -------------------------------------------------------

    pub fn set_font(&mut self, font: &str) {
        self.text.font = font.to_string();
    }

    pub fn set_rows(&mut self, rows: u32) {
        self.text.rows = rows.clamp(1, MAX_ROWS);
    }

    pub fn set_case(&mut self, case: TextCase) {
        self.text.case = case;
    }

    /// Lines the server is expected to draw for the current artist name.
    pub fn predicted_lines(&self) -> Vec<String> {
        match &self.current {
            Some(c) => layout_rows(&c.name, self.text.rows, self.text.case),
            None => Vec::new(),
        }
    }

    // -- payloads -------------------------------------------------------------

    /// Body for `/preview_text` and `/save_custom`; `None` without an artist.
    pub fn text_request(&self) -> Option<TextLogoRequest> {
        let current = self.current.as_ref()?;
        Some(TextLogoRequest {
            rating_key: current.key.clone(),
            font: self.text.font.clone(),
            rows: self.text.rows,
            color: self.text_color.color().map(to_hex).unwrap_or_else(|| "#FFFFFF".to_string()),
            case: self.text.case,
        })
    }

    /// Body for `/save`; `None` when no artist is loaded or no logo is chosen.
    pub fn save_request(&self) -> Option<SaveRequest> {
        let current = self.current.as_ref()?;
        let logo = self.selected_logo.as_ref()?;
        let opts = self.transform_options();
        Some(SaveRequest {
            rating_key: current.key.clone(),
            url: logo.save_url().to_string(),
            apply_default_size: opts.apply_default_size,
            invert: opts.invert,
            contrast: opts.contrast,
            zoom: opts.zoom,
            monochrome: opts.monochrome,
            tint: opts.tint.map(to_hex),
            make_white: opts.make_white,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::colors::PickerChange;

    fn loaded() -> EditorSession {
        let mut s = EditorSession::default();
        s.load_artist("42", "The Black Keys");
        s
    }

    #[test]
    fn defaults_match_a_fresh_editor() {
        let s = EditorSession::default();
        assert_eq!(s.text.font, "Roboto");
        assert_eq!(s.text.rows, 1);
        assert_eq!(s.text_color.active_index(), Some(0));
        assert_eq!(s.tint.active_index(), None);
        assert_eq!(s.filters, FilterSettings::default());
        assert!(s.save_request().is_none());
        assert!(s.text_request().is_none());
    }

    #[test]
    fn reset_filters_clears_toggles_and_tint() {
        let mut s = loaded();
        s.toggle_invert();
        s.toggle_monochrome();
        s.set_zoom(2.0);
        s.filters.apply_default_size = false;
        assert!(matches!(s.tint.click(4), PickerChange::Selected(_)));
        s.reset_filters();
        assert_eq!(s.filters, FilterSettings::default());
        assert_eq!(s.tint.color(), None);
        // text colour survives
        assert_eq!(s.text_color.active_index(), Some(0));
    }

    #[test]
    fn save_request_reflects_filters() {
        let mut s = loaded();
        s.choose_logo(LogoSource::Fanart("https://fanart/x.png".into()));
        s.toggle_invert();
        s.tint.click(0);
        let req = s.save_request().unwrap();
        assert_eq!(req.rating_key, "42");
        assert_eq!(req.url, "https://fanart/x.png");
        assert!(req.invert);
        assert_eq!(req.tint.as_deref(), Some("#FFFFFF"));
        assert!(req.make_white);

        s.tint.click(9);
        let req = s.save_request().unwrap();
        assert_eq!(req.tint.as_deref(), Some("#2979FF"));
        assert!(!req.make_white);
    }

    #[test]
    fn choosing_a_logo_resets_filters() {
        let mut s = loaded();
        s.toggle_monochrome();
        s.choose_logo(LogoSource::Upload("data:image/png;base64,AAAA".into()));
        assert!(!s.filters.monochrome);
        assert_eq!(
            s.save_request().unwrap().url,
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn loading_another_artist_drops_the_chosen_logo() {
        let mut s = loaded();
        s.choose_logo(LogoSource::Fanart("u".into()));
        let nonce = s.poster_nonce;
        s.load_artist("7", "Muse");
        assert!(s.selected_logo.is_none());
        assert_eq!(s.current_key(), Some("7"));
        assert_ne!(s.poster_nonce, nonce);
        assert!(s.is_section_open(EditorSection::Fanart));
    }

    #[test]
    fn sections_are_exclusive() {
        let mut s = loaded();
        s.toggle_section(EditorSection::TextGenerator);
        assert!(s.is_section_open(EditorSection::TextGenerator));
        assert!(!s.is_section_open(EditorSection::Fanart));
        s.toggle_section(EditorSection::TextGenerator);
        assert_eq!(s.section, None);
    }

    #[test]
    fn text_request_uses_params() {
        let mut s = loaded();
        s.set_font("Anton");
        s.set_rows(9);
        s.set_case(TextCase::Upper);
        s.text_color.click(2);
        let req = s.text_request().unwrap();
        assert_eq!(req.font, "Anton");
        assert_eq!(req.rows, MAX_ROWS);
        assert_eq!(req.color, "#18FFFF");
        assert_eq!(req.case, TextCase::Upper);
        assert_eq!(s.predicted_lines(), vec!["THE", "BLACK", "KEYS"]);
    }

    #[test]
    fn fanart_is_displayed_through_proxy() {
        let src = LogoSource::Fanart("https://f/a.png".into());
        assert!(src.display_url("http://s").unwrap().starts_with("http://s/proxy_image?url="));
        let up = LogoSource::Generated("data:image/jpeg;base64,AA".into());
        assert_eq!(up.display_url("http://s").unwrap(), "data:image/jpeg;base64,AA");
    }
}
