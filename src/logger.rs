//! Session log in the per-user data directory (`ArtistLogo/artistlogo.log`).
//!
//! `init` truncates the file, so it only holds the latest run of either the
//! GUI or the headless renderer. The `log_info!` / `log_warn!` / `log_err!`
//! macros do nothing until then, which keeps unit tests silent.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::paths::{self, DirKind};

pub const LOG_FILE: &str = "artistlogo.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        })
    }
}

struct Sink {
    path: PathBuf,
    file: Mutex<File>,
}

impl Sink {
    fn create(path: PathBuf) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// I/O errors are swallowed; a full disk must not take the app down.
    fn line(&self, level: Level, msg: fmt::Arguments<'_>) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "[{}] [{}] {}", clock(unix_secs()), level, msg);
        }
    }
}

static SINK: OnceLock<Sink> = OnceLock::new();

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

pub fn write(level: Level, msg: fmt::Arguments<'_>) {
    if let Some(sink) = SINK.get() {
        sink.line(level, msg);
    }
}

/// Where this session logs, once `init` has succeeded.
pub fn log_path() -> Option<&'static Path> {
    SINK.get().map(|s| s.path.as_path())
}

/// Open the session log and mirror panics into it. Later calls are no-ops.
/// A log that cannot be created is reported on stderr and skipped.
pub fn init(mode: &str) {
    if SINK.get().is_some() {
        return;
    }
    let Some(path) = paths::app_dir(DirKind::Data).map(|d| d.join(LOG_FILE)) else {
        eprintln!("[logger] no data directory; logging disabled");
        return;
    };
    match Sink::create(path) {
        Ok(sink) => {
            let _ = SINK.set(sink);
        }
        Err(e) => {
            eprintln!("[logger] could not open log file: {}", e);
            return;
        }
    }
    log_info!("ArtistLogo {} session, unix time {}", mode, unix_secs());

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(Level::Panic, format_args!("{}", info));
        prev(info);
    }));
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// `HH:MM:SS` (UTC) of a unix timestamp.
fn clock(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600 % 24, secs / 60 % 60, secs % 60)
}
