// ============================================================================
// SAVE-TIME TRANSFORM — the pipeline the backend runs on `/save`
// ============================================================================
//
// Used by headless mode to render locally exactly what a save would persist:
//   crop to alpha bbox → make white → monochrome → invert → contrast
//   → fit on a 1000×1000 black canvas → tint multiply-blend.
// ============================================================================

use eframe::egui::Color32;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage, imageops};
use rayon::prelude::*;
use thiserror::Error;

pub const CANVAS_SIDE: u32 = 1000;
/// Share of the canvas the logo fills with default sizing.
const DEFAULT_FILL: f32 = 0.8;
const TINT_BLEND: f32 = 0.6;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no visible pixels")]
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformOptions {
    pub apply_default_size: bool,
    pub invert: bool,
    pub make_white: bool,
    pub contrast: f32,
    pub zoom: f32,
    pub monochrome: bool,
    pub tint: Option<Color32>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            apply_default_size: true,
            invert: false,
            make_white: false,
            contrast: 1.0,
            zoom: 1.0,
            monochrome: false,
            tint: None,
        }
    }
}

pub fn apply_transforms(src: &DynamicImage, opts: &TransformOptions) -> Result<RgbImage, TransformError> {
    let mut img = crop_to_alpha(src.to_rgba8());
    if img.width() == 0 || img.height() == 0 {
        return Err(TransformError::Empty);
    }

    if opts.make_white {
        map_rgb(&mut img, |_, _, _| (255, 255, 255));
    }
    if opts.monochrome {
        map_rgb(&mut img, |r, g, b| {
            let l = pil_luma(r, g, b);
            (l, l, l)
        });
    }
    if opts.invert {
        map_rgb(&mut img, |r, g, b| (255 - r, 255 - g, 255 - b));
    }
    if (opts.contrast - 1.0).abs() > f32::EPSILON {
        enhance_contrast(&mut img, opts.contrast);
    }

    let (w, h) = target_size(img.width(), img.height(), opts);
    if (w, h) != img.dimensions() {
        img = imageops::resize(&img, w, h, imageops::FilterType::Lanczos3);
    }

    let mut canvas = RgbImage::new(CANVAS_SIDE, CANVAS_SIDE);
    let ox = (CANVAS_SIDE.saturating_sub(img.width())) / 2;
    let oy = (CANVAS_SIDE.saturating_sub(img.height())) / 2;
    for (x, y, px) in img.enumerate_pixels() {
        let (cx, cy) = (ox + x, oy + y);
        if cx >= CANVAS_SIDE || cy >= CANVAS_SIDE {
            continue;
        }
        let a = px[3] as f32 / 255.0;
        canvas.put_pixel(
            cx,
            cy,
            Rgb([
                (px[0] as f32 * a).round() as u8,
                (px[1] as f32 * a).round() as u8,
                (px[2] as f32 * a).round() as u8,
            ]),
        );
    }

    if let Some(tint) = opts.tint {
        tint_multiply(&mut canvas, tint);
    }
    Ok(canvas)
}

/// Output size before pasting. Default sizing fits the logo into 80% of the
/// canvas and ignores zoom; otherwise zoom applies and the result is only
/// shrunk if it would overflow. A non-empty logo never shrinks below 1×1.
pub fn target_size(w: u32, h: u32, opts: &TransformOptions) -> (u32, u32) {
    if w == 0 || h == 0 {
        return (0, 0);
    }
    let (tw, th) = scaled_size(w, h, opts);
    (tw.max(1), th.max(1))
}

fn scaled_size(w: u32, h: u32, opts: &TransformOptions) -> (u32, u32) {
    let side = CANVAS_SIDE as f32;
    if opts.apply_default_size {
        let target = (side * DEFAULT_FILL).floor();
        let ratio = (target / w as f32).min(target / h as f32);
        ((w as f32 * ratio) as u32, (h as f32 * ratio) as u32)
    } else {
        let zw = (w as f32 * opts.zoom) as u32;
        let zh = (h as f32 * opts.zoom) as u32;
        if zw > CANVAS_SIDE || zh > CANVAS_SIDE {
            let ratio = (side / zw as f32).min(side / zh as f32);
            ((zw as f32 * ratio) as u32, (zh as f32 * ratio) as u32)
        } else {
            (zw, zh)
        }
    }
}

fn crop_to_alpha(img: RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0u32, 0u32);
    let mut any = false;
    for (x, y, px) in img.enumerate_pixels() {
        if px[3] > 0 {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if !any {
        return RgbaImage::new(0, 0);
    }
    imageops::crop_imm(&img, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
}

fn map_rgb<F>(img: &mut RgbaImage, f: F)
where
    F: Fn(u8, u8, u8) -> (u8, u8, u8) + Sync,
{
    img.par_chunks_mut(4).for_each(|px| {
        let (r, g, b) = f(px[0], px[1], px[2]);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    });
}

/// ITU-R 601-2 luma, integer form.
fn pil_luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Blend every channel away from (or towards) the mean grey level.
fn enhance_contrast(img: &mut RgbaImage, factor: f32) {
    let count = (img.width() as u64 * img.height() as u64).max(1);
    let sum: u64 = img
        .pixels()
        .map(|p| pil_luma(p[0], p[1], p[2]) as u64)
        .sum();
    let mean = (sum as f32 / count as f32 + 0.5).floor();
    map_rgb(img, |r, g, b| {
        let f = |v: u8| (mean + (v as f32 - mean) * factor).round().clamp(0.0, 255.0) as u8;
        (f(r), f(g), f(b))
    });
}

fn tint_multiply(canvas: &mut RgbImage, tint: Color32) {
    let t = [tint.r() as f32, tint.g() as f32, tint.b() as f32];
    canvas.par_chunks_mut(3).for_each(|px| {
        for c in 0..3 {
            let v = px[c] as f32;
            let multiplied = v * t[c] / 255.0;
            px[c] = (v * (1.0 - TINT_BLEND) + multiplied * TINT_BLEND)
                .round()
                .clamp(0.0, 255.0) as u8;
        }
    });
}
