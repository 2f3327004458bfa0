// ============================================================================
// IMAGES — decoding, data: URIs and the egui texture cache
// ============================================================================

use base64::{Engine as _, engine::general_purpose::STANDARD};
use eframe::egui;
use image::RgbaImage;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

/// Previews larger than this on either side are downscaled after decode;
/// the saved output is rendered server-side from the original URL.
pub const MAX_PREVIEW_SIDE: u32 = 1024;

pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let (w, h) = (img.width(), img.height());
    let img = if w > MAX_PREVIEW_SIDE || h > MAX_PREVIEW_SIDE {
        img.resize(
            MAX_PREVIEW_SIDE,
            MAX_PREVIEW_SIDE,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };
    Ok(img.into_rgba8())
}

/// `data:{mime};base64,{payload}`
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a base64 data URI into its MIME type and decoded payload.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

/// URL fit for a log line: data URIs collapse to their MIME type and size.
pub fn short_url(url: &str) -> Cow<'_, str> {
    match url.strip_prefix("data:") {
        Some(rest) => {
            let mime = rest.split([';', ',']).next().unwrap_or_default();
            Cow::Owned(format!("data:{mime} ({} bytes)", url.len()))
        }
        None => Cow::Borrowed(url),
    }
}

/// MIME type guessed from a file extension, for uploads.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

pub fn to_color_image(img: &RgbaImage) -> egui::ColorImage {
    egui::ColorImage::from_rgba_unmultiplied(
        [img.width() as usize, img.height() as usize],
        img.as_raw(),
    )
}

/// Largest rect with `size`'s aspect ratio centred inside `bounds`.
pub fn fit_rect(size: egui::Vec2, bounds: egui::Rect) -> egui::Rect {
    if size.x <= 0.0 || size.y <= 0.0 {
        return egui::Rect::from_center_size(bounds.center(), egui::Vec2::ZERO);
    }
    let scale = (bounds.width() / size.x).min(bounds.height() / size.y);
    egui::Rect::from_center_size(bounds.center(), size * scale)
}

// ============================================================================
// TextureCache — thumbnails keyed by original URL
// ============================================================================
//
// Results only land in slots that `claim` handed out. `clear` drops every
// slot, so a fetch still in flight for a cleared URL is discarded on arrival.

enum Slot {
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

#[derive(Default)]
pub struct TextureCache {
    slots: HashMap<String, Slot>,
}

impl TextureCache {
    pub fn get(&self, url: &str) -> Option<&egui::TextureHandle> {
        match self.slots.get(url) {
            Some(Slot::Ready(tex)) => Some(tex),
            _ => None,
        }
    }

    pub fn is_failed(&self, url: &str) -> bool {
        matches!(self.slots.get(url), Some(Slot::Failed))
    }

    /// Returns `true` the first time a URL is requested; the caller fetches it.
    pub fn claim(&mut self, url: &str) -> bool {
        if self.slots.contains_key(url) {
            return false;
        }
        self.slots.insert(url.to_string(), Slot::Loading);
        true
    }

    /// Upload the decoded thumbnail. Returns `false` (and uploads nothing)
    /// when `url` is no longer pending.
    pub fn insert(&mut self, ctx: &egui::Context, url: &str, img: &RgbaImage) -> bool {
        let Some(slot) = self.slots.get_mut(url) else { return false };
        if !matches!(slot, Slot::Loading) {
            return false;
        }
        let tex = ctx.load_texture(
            format!("thumb:{url}"),
            to_color_image(img),
            egui::TextureOptions::LINEAR,
        );
        *slot = Slot::Ready(tex);
        true
    }

    pub fn mark_failed(&mut self, url: &str) -> bool {
        match self.slots.get_mut(url) {
            Some(slot @ Slot::Loading) => {
                *slot = Slot::Failed;
                true
            }
            _ => false,
        }
    }

    /// Drop every texture and pending claim.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_round_trips_payload() {
        let uri = encode_data_uri("image/png", &[1, 2, 3, 250]);
        assert!(uri.starts_with("data:image/png;base64,"));
        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![1, 2, 3, 250]);
    }

    #[test]
    fn non_base64_data_uri_is_rejected() {
        assert!(decode_data_uri("data:text/plain,hello").is_none());
        assert!(decode_data_uri("https://example.com/a.png").is_none());
    }

    #[test]
    fn decode_downscales_oversized_images() {
        let big = RgbaImage::from_pixel(2048, 512, image::Rgba([10, 20, 30, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(big)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();
        let out = decode_rgba(&png).unwrap();
        assert_eq!(out.width(), MAX_PREVIEW_SIDE);
        assert_eq!(out.height(), 256);
    }

    #[test]
    fn fit_rect_preserves_aspect() {
        let bounds = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(200.0, 100.0));
        let r = fit_rect(egui::vec2(50.0, 50.0), bounds);
        assert_eq!(r.size(), egui::vec2(100.0, 100.0));
        assert_eq!(r.center(), bounds.center());
    }

    #[test]
    fn mime_guess_uses_extension() {
        assert_eq!(mime_for_path(Path::new("logo.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn short_url_hides_data_payload() {
        let uri = encode_data_uri("image/png", &[7; 3000]);
        let short = short_url(&uri);
        assert_eq!(short, format!("data:image/png ({} bytes)", uri.len()));
        assert_eq!(short_url("https://a/b.png"), "https://a/b.png");
    }

    #[test]
    fn cleared_cache_ignores_late_results() {
        let ctx = egui::Context::default();
        let img = RgbaImage::new(2, 2);
        let mut cache = TextureCache::default();
        assert!(cache.claim("a"));
        assert!(cache.claim("b"));
        assert!(cache.insert(&ctx, "a", &img));
        assert!(cache.get("a").is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.insert(&ctx, "b", &img));
        assert!(!cache.mark_failed("b"));
        assert!(!cache.insert(&ctx, "never-claimed", &img));
        assert!(cache.is_empty());
    }

    #[test]
    fn claim_only_once_per_url() {
        let mut cache = TextureCache::default();
        assert!(cache.claim("u"));
        assert!(!cache.claim("u"));
        cache.mark_failed("u");
        assert!(cache.is_failed("u"));
        assert!(!cache.claim("u"));
    }
}
