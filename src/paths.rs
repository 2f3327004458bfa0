//! Per-user directories for the settings file and the session log.
//!
//! Windows keeps both under `%APPDATA%\ArtistLogo`, macOS under
//! `~/Library/Application Support/ArtistLogo`. Elsewhere the XDG variables
//! decide, with `~/.config` and `~/.local/share` as fallbacks.

use std::path::PathBuf;

pub const APP_DIR: &str = "ArtistLogo";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirKind {
    Config,
    Data,
}

impl DirKind {
    fn xdg_var(self) -> &'static str {
        match self {
            DirKind::Config => "XDG_CONFIG_HOME",
            DirKind::Data => "XDG_DATA_HOME",
        }
    }

    fn home_relative(self) -> &'static str {
        match self {
            DirKind::Config => ".config",
            DirKind::Data => ".local/share",
        }
    }
}

/// App directory of `kind` from the process environment. `None` when no
/// home-like variable is set.
pub fn app_dir(kind: DirKind) -> Option<PathBuf> {
    resolve(kind, |name| std::env::var(name).ok())
}

fn resolve(kind: DirKind, env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let var = |name: &str| env(name).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
    let base = if cfg!(windows) {
        var("APPDATA").or_else(|| var("USERPROFILE"))
    } else if cfg!(target_os = "macos") {
        var("HOME").map(|h| h.join("Library").join("Application Support"))
    } else {
        var(kind.xdg_var()).or_else(|| var("HOME").map(|h| h.join(kind.home_relative())))
    };
    base.map(|b| b.join(APP_DIR))
}
