use std::path::{Path, PathBuf};

use crate::paths::{self, DirKind};
use crate::theme::ThemeMode;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const SERVER_ENV_VAR: &str = "ARTISTLOGO_SERVER";
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const SETTINGS_FILE: &str = "artistlogo_settings.cfg";

/// Fonts the server ships by default.
pub const DEFAULT_FONTS: [&str; 18] = [
    "Roboto",
    "Open Sans",
    "Lato",
    "Montserrat",
    "Oswald",
    "Raleway",
    "Merriweather",
    "Pacifico",
    "Dancing Script",
    "Bebas Neue",
    "Anton",
    "Lobster",
    "Comfortaa",
    "Cinzel",
    "Fauna One",
    "Orbitron",
    "Press Start 2P",
    "Special Elite",
];

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Base URL of the artist-logo backend
    pub server_url: String,
    pub theme_mode: ThemeMode,
    /// Fonts offered by the text generator
    pub fonts: Vec<String>,
    /// Quality for headless JPEG output (1–100)
    pub jpeg_quality: u8,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            theme_mode: ThemeMode::Dark,
            fonts: DEFAULT_FONTS.iter().map(|f| f.to_string()).collect(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl AppSettings {
    /// `<config dir>/ArtistLogo/artistlogo_settings.cfg`
    pub fn settings_path() -> Option<PathBuf> {
        paths::app_dir(DirKind::Config).map(|d| d.join(SETTINGS_FILE))
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "server_url={}\n\
             theme_mode={}\n\
             fonts={}\n\
             jpeg_quality={}\n",
            self.server_url,
            self.theme_mode.as_str(),
            self.fonts.join(","),
            self.jpeg_quality,
        )
    }

    /// Parse `key=value` lines. Unknown keys are ignored and malformed values
    /// keep their defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "server_url" => {
                    if !val.is_empty() {
                        s.server_url = val.trim_end_matches('/').to_string();
                    }
                }
                "theme_mode" => s.theme_mode = ThemeMode::parse(val),
                "fonts" => {
                    let fonts: Vec<String> = val
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect();
                    if !fonts.is_empty() {
                        s.fonts = fonts;
                    }
                }
                "jpeg_quality" => {
                    if let Ok(q) = val.parse::<u8>()
                        && (1..=100).contains(&q)
                    {
                        s.jpeg_quality = q;
                    }
                }
                _ => {}
            }
        }
        s
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }

    /// Write the file, creating its directory first.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt),
    /// then apply the environment override.
    pub fn load() -> Self {
        let mut s = match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        };
        s.apply_env_override(std::env::var(SERVER_ENV_VAR).ok());
        s
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            crate::log_warn!("Failed to save settings to {}: {}", path.display(), e);
        }
    }

    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|v| v.trim().trim_end_matches('/').to_string())
            && !url.is_empty()
        {
            self.server_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artistlogo_settings.cfg");
        let s = AppSettings {
            server_url: "http://plex.lan:8080".to_string(),
            theme_mode: ThemeMode::Light,
            fonts: vec!["Anton".to_string(), "Open Sans".to_string()],
            jpeg_quality: 80,
        };
        s.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path), s);
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ArtistLogo").join(SETTINGS_FILE);
        AppSettings::default().save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = AppSettings::load_from(&dir.path().join("nope.cfg"));
        assert_eq!(s, AppSettings::default());
        assert_eq!(s.fonts.len(), 18);
        assert_eq!(s.fonts[0], "Roboto");
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let s = AppSettings::from_config_str(
            "jpeg_quality=250\nfonts= , \nmystery=1\nnot a pair\nserver_url=http://x:1/\n",
        );
        assert_eq!(s.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(s.fonts.len(), DEFAULT_FONTS.len());
        assert_eq!(s.server_url, "http://x:1");
    }

    #[test]
    fn env_override_wins_when_set() {
        let mut s = AppSettings::default();
        s.apply_env_override(None);
        assert_eq!(s.server_url, DEFAULT_SERVER_URL);
        s.apply_env_override(Some("  ".to_string()));
        assert_eq!(s.server_url, DEFAULT_SERVER_URL);
        s.apply_env_override(Some("https://logos.example/".to_string()));
        assert_eq!(s.server_url, "https://logos.example");
    }
}
