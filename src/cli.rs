// ============================================================================
// ArtistLogo CLI — headless render of the save-time logo transform
// ============================================================================
//
// Usage examples:
//   artistlogo --input logo.png --output logo.jpg
//   artistlogo -i logo.png -o out.jpg --tint "#2979FF" --contrast 1.4
//   artistlogo -i "logos/*.png" --output-dir rendered/ --native-size --zoom 1.5
//
// No GUI is opened and the backend is never contacted. Each input goes
// through the same pipeline the server applies on save and is written as a
// 1000×1000 JPEG.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::codecs::jpeg::JpegEncoder;

use crate::components::colors::{is_white, parse_hex};
use crate::ops::transform::{TransformError, TransformOptions, apply_transforms};
use crate::session::{MAX_CONTRAST, MAX_ZOOM, MIN_CONTRAST, MIN_ZOOM};
use crate::settings::AppSettings;
use crate::{log_err, log_info, log_warn};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// ArtistLogo headless renderer.
#[derive(Parser, Debug)]
#[command(
    name = "artistlogo",
    about = "Render artist logos offline exactly as the server would save them",
    long_about = "Crop, filter and fit logo images onto a 1000x1000 black canvas and\n\
                  write them as JPEG, without opening the GUI or contacting the server.\n\n\
                  Example:\n  \
                  artistlogo --input logo.png --output logo.jpg --tint \"#FFFFFF\"\n  \
                  artistlogo -i \"logos/*.png\" --output-dir out/ --monochrome"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "logos/*.webp").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch rendering; files keep their stem and get `.jpg`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Keep the cropped logo's own size (scaled by --zoom) instead of fitting it to 800px.
    #[arg(long)]
    pub native_size: bool,

    /// Zoom factor used with --native-size.
    #[arg(long, default_value_t = 1.0, value_name = "Z")]
    pub zoom: f32,

    /// Contrast factor (1.0 = unchanged).
    #[arg(long, default_value_t = 1.0, value_name = "C")]
    pub contrast: f32,

    #[arg(long)]
    pub invert: bool,

    #[arg(long)]
    pub monochrome: bool,

    /// Tint colour as `#RRGGBB`. White turns the logo solid white.
    #[arg(long, value_name = "HEX")]
    pub tint: Option<String>,

    /// JPEG quality (1–100). Defaults to the `jpeg_quality` setting.
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }

    /// Transform options described by the flags.
    pub fn transform_options(&self) -> Result<TransformOptions, RenderError> {
        let tint = match self.tint.as_deref() {
            Some(hex) => Some(parse_hex(hex).ok_or_else(|| RenderError::BadTint(hex.to_string()))?),
            None => None,
        };
        Ok(TransformOptions {
            apply_default_size: !self.native_size,
            invert: self.invert,
            make_white: tint.is_some_and(is_white),
            contrast: self.contrast.clamp(MIN_CONTRAST, MAX_CONTRAST),
            zoom: self.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            monochrome: self.monochrome,
            tint,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid tint '{0}' (expected #RRGGBB)")]
    BadTint(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let opts = match args.transform_options() {
        Ok(o) => o,
        Err(e) => {
            log_err!("{}", e);
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let quality = args
        .quality
        .unwrap_or_else(|| AppSettings::load().jpeg_quality)
        .clamp(1, 100);

    let inputs = resolve_inputs(&args.input);
    log_info!("Rendering {} file(s) at quality {}: {:?}", inputs.len(), quality, opts);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch rendering.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match render_one(input_path, &output_path, &opts, quality) {
            Ok(()) => {
                log_info!(
                    "{} -> {} in {:?}",
                    input_path.display(),
                    output_path.display(),
                    file_start.elapsed()
                );
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{} failed: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file pipeline
// ============================================================================

pub fn render_one(
    input: &Path,
    output: &Path,
    opts: &TransformOptions,
    quality: u8,
) -> Result<(), RenderError> {
    let src = image::open(input)?;
    let rendered = apply_transforms(&src, opts)?;

    let mut writer = BufWriter::new(File::create(output)?);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode(
        rendered.as_raw(),
        rendered.width(),
        rendered.height(),
        image::ColorType::Rgb8,
    )?;
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    log_warn!("Pattern '{}' matched nothing", pattern);
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                log_warn!("Invalid glob '{}': {}", pattern, e);
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// `--output` wins; otherwise `<dir>/<stem>.jpg`, where `dir` is
/// `--output-dir` or the input's own directory. Writing next to a `.jpg`
/// input appends `_logo` to the stem.
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.jpg", stem)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.jpg", stem));
    if candidate == input {
        Some(parent.join(format!("{}_logo.jpg", stem)))
    } else {
        Some(candidate)
    }
}
