// ============================================================================
// PREVIEW COMPOSITOR — state → filter chain + tint overlay
// ============================================================================
//
// `compose()` is pure: it turns the editor's filter state and the current
// image layout into a `PreviewStyle`. The pixel side (`apply_filter_chain`,
// `silhouette`) realises that style on the CPU, parallelised via rayon.
//
// The tint overlay is clipped to the logo's alpha silhouette. Its geometry is
// only known once the image has decoded, so composing with a tint before that
// arms a one-shot load listener (`image_loaded`).
// ============================================================================

use eframe::egui;
use egui::{Color32, Rect, Vec2};
use image::RgbaImage;
use rayon::prelude::*;
use std::fmt;

use crate::components::colors::is_white;

/// Padding around the preview when the server's default sizing is on.
pub const DEFAULT_SIZE_PADDING: f32 = 22.0;
const MASKED_OPACITY: f32 = 0.9;
const UNMASKED_OPACITY: f32 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewInputs {
    pub zoom: f32,
    pub contrast: f32,
    pub invert: bool,
    pub monochrome: bool,
    pub tint: Option<Color32>,
    pub apply_default_size: bool,
}

impl Default for PreviewInputs {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            contrast: 1.0,
            invert: false,
            monochrome: false,
            tint: None,
            apply_default_size: true,
        }
    }
}

// -- filter chain ---------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterStep {
    Contrast(f32),
    Brightness(f32),
    /// Percent; 100 is identity.
    Saturate(f32),
    Invert,
    Grayscale,
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contrast(c) => write!(f, "contrast({c})"),
            Self::Brightness(b) => write!(f, "brightness({b})"),
            Self::Saturate(p) => write!(f, "saturate({p}%)"),
            Self::Invert => f.write_str("invert(1)"),
            Self::Grayscale => f.write_str("grayscale(1)"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterChain(pub Vec<FilterStep>);

impl FilterChain {
    /// `contrast(c) [invert(1)] [grayscale(1)]`
    pub fn standard(contrast: f32, invert: bool, monochrome: bool) -> Self {
        let mut steps = vec![FilterStep::Contrast(contrast)];
        if invert {
            steps.push(FilterStep::Invert);
        }
        if monochrome {
            steps.push(FilterStep::Grayscale);
        }
        Self(steps)
    }

    /// Renders any source as solid white, keeping its alpha.
    pub fn solid_white() -> Self {
        Self(vec![
            FilterStep::Brightness(0.0),
            FilterStep::Saturate(100.0),
            FilterStep::Invert,
        ])
    }

    pub fn steps(&self) -> &[FilterStep] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().all(|s| match s {
            FilterStep::Contrast(c) => (*c - 1.0).abs() < f32::EPSILON,
            FilterStep::Brightness(b) => (*b - 1.0).abs() < f32::EPSILON,
            FilterStep::Saturate(p) => (*p - 100.0).abs() < f32::EPSILON,
            FilterStep::Invert | FilterStep::Grayscale => false,
        })
    }

    /// Apply the chain to one pixel, channels in 0..=1.
    pub fn apply_rgb(&self, mut rgb: [f32; 3]) -> [f32; 3] {
        for step in &self.0 {
            match *step {
                FilterStep::Contrast(c) => {
                    for v in &mut rgb {
                        *v = ((*v - 0.5) * c + 0.5).clamp(0.0, 1.0);
                    }
                }
                FilterStep::Brightness(b) => {
                    for v in &mut rgb {
                        *v = (*v * b).clamp(0.0, 1.0);
                    }
                }
                FilterStep::Saturate(p) => {
                    let s = p / 100.0;
                    let l = luma(rgb);
                    for v in &mut rgb {
                        *v = (l + (*v - l) * s).clamp(0.0, 1.0);
                    }
                }
                FilterStep::Invert => {
                    for v in &mut rgb {
                        *v = 1.0 - *v;
                    }
                }
                FilterStep::Grayscale => {
                    let l = luma(rgb);
                    rgb = [l, l, l];
                }
            }
        }
        rgb
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

fn luma(rgb: [f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}

// -- overlay ----------------------------------------------------------------

/// Where the mask sits inside the preview container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskGeometry {
    pub offset: Vec2,
    pub size: Vec2,
}

impl MaskGeometry {
    pub fn between(container: Rect, image: Rect) -> Self {
        Self {
            offset: Vec2::new(
                (image.min.x - container.min.x).max(0.0),
                (image.min.y - container.min.y).max(0.0),
            ),
            size: Vec2::new(image.width().max(0.0), image.height().max(0.0)),
        }
    }

    pub fn rect_in(&self, container: Rect) -> Rect {
        Rect::from_min_size(container.min + self.offset, self.size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Overlay {
    Hidden,
    /// Tint chosen but the image has not decoded yet.
    AwaitingImage { color: Color32 },
    /// Tint clipped to the image's alpha.
    Masked {
        color: Color32,
        opacity: f32,
        mask: MaskGeometry,
    },
    /// No image to clip against: a screen-blended wash over the container.
    Unmasked { color: Color32, opacity: f32 },
}

/// Where the preview image currently is in its decode lifecycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageLayout {
    Absent,
    Decoding,
    Ready { container: Rect, image: Rect },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreviewStyle {
    pub filter: FilterChain,
    pub scale: f32,
    pub padding: f32,
    pub overlay: Overlay,
}

pub fn compose(inputs: &PreviewInputs, layout: &ImageLayout) -> PreviewStyle {
    let padding = if inputs.apply_default_size {
        DEFAULT_SIZE_PADDING
    } else {
        0.0
    };
    let standard = || FilterChain::standard(inputs.contrast, inputs.invert, inputs.monochrome);

    let (filter, overlay) = match inputs.tint {
        None => (standard(), Overlay::Hidden),
        Some(c) if is_white(c) => (FilterChain::solid_white(), Overlay::Hidden),
        Some(color) => {
            let overlay = match *layout {
                ImageLayout::Ready { container, image } => Overlay::Masked {
                    color,
                    opacity: MASKED_OPACITY,
                    mask: MaskGeometry::between(container, image),
                },
                ImageLayout::Decoding => Overlay::AwaitingImage { color },
                ImageLayout::Absent => Overlay::Unmasked {
                    color,
                    opacity: UNMASKED_OPACITY,
                },
            };
            (standard(), overlay)
        }
    };

    PreviewStyle {
        filter,
        scale: inputs.zoom,
        padding,
        overlay,
    }
}

// ============================================================================
// Compositor — holds the last style and the deferred mask listener
// ============================================================================

#[derive(Default)]
pub struct Compositor {
    style: Option<PreviewStyle>,
    load_listener: bool,
}

impl Compositor {
    pub fn update(&mut self, inputs: &PreviewInputs, layout: &ImageLayout) -> &PreviewStyle {
        let style = compose(inputs, layout);
        if matches!(style.overlay, Overlay::AwaitingImage { .. }) {
            self.load_listener = true;
        }
        self.style.insert(style)
    }

    pub fn style(&self) -> Option<&PreviewStyle> {
        self.style.as_ref()
    }

    pub fn is_waiting_for_image(&self) -> bool {
        self.load_listener
    }

    /// Fire the deferred mask computation once. Returns the recomputed style
    /// only if a listener was armed.
    pub fn image_loaded(
        &mut self,
        inputs: &PreviewInputs,
        layout: &ImageLayout,
    ) -> Option<&PreviewStyle> {
        if !std::mem::take(&mut self.load_listener) {
            return None;
        }
        Some(self.update(inputs, layout))
    }
}

// ============================================================================
// Pixel realisation
// ============================================================================

/// Apply a filter chain to every pixel. Alpha is preserved.
pub fn apply_filter_chain(src: &RgbaImage, chain: &FilterChain) -> RgbaImage {
    if chain.is_identity() {
        return src.clone();
    }
    let (w, h) = src.dimensions();
    let stride = w as usize * 4;
    let src_raw = src.as_raw();
    let mut dst_raw = vec![0u8; src_raw.len()];
    if stride == 0 {
        return src.clone();
    }

    dst_raw
        .par_chunks_mut(stride)
        .zip(src_raw.par_chunks(stride))
        .for_each(|(row_out, row_in)| {
            for (out, px) in row_out.chunks_exact_mut(4).zip(row_in.chunks_exact(4)) {
                let rgb = chain.apply_rgb([
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ]);
                out[0] = (rgb[0] * 255.0).round() as u8;
                out[1] = (rgb[1] * 255.0).round() as u8;
                out[2] = (rgb[2] * 255.0).round() as u8;
                out[3] = px[3];
            }
        });

    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| src.clone())
}

/// Solid `color` shaped like `src`'s alpha, scaled by `opacity`.
pub fn silhouette(src: &RgbaImage, color: Color32, opacity: f32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let mut out = RgbaImage::new(w, h);
    out.par_chunks_mut(4)
        .zip(src.as_raw().par_chunks(4))
        .for_each(|(o, px)| {
            o[0] = color.r();
            o[1] = color.g();
            o[2] = color.b();
            o[3] = (px[3] as f32 * opacity).round() as u8;
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn ready() -> ImageLayout {
        ImageLayout::Ready {
            container: Rect::from_min_size(pos2(10.0, 20.0), egui::vec2(400.0, 400.0)),
            image: Rect::from_min_size(pos2(60.0, 120.0), egui::vec2(300.0, 150.0)),
        }
    }

    #[test]
    fn no_tint_builds_standard_chain_and_hides_overlay() {
        let inputs = PreviewInputs {
            contrast: 1.4,
            invert: true,
            monochrome: true,
            ..Default::default()
        };
        let style = compose(&inputs, &ready());
        assert_eq!(style.filter.to_string(), "contrast(1.4) invert(1) grayscale(1)");
        assert_eq!(style.overlay, Overlay::Hidden);
    }

    #[test]
    fn white_tint_forces_solid_white_regardless_of_toggles() {
        for (invert, monochrome, contrast) in [(false, false, 1.0), (true, true, 2.5)] {
            let inputs = PreviewInputs {
                tint: Some(Color32::WHITE),
                invert,
                monochrome,
                contrast,
                ..Default::default()
            };
            let style = compose(&inputs, &ImageLayout::Decoding);
            assert_eq!(style.filter.to_string(), "brightness(0) saturate(100%) invert(1)");
            assert_eq!(style.overlay, Overlay::Hidden);
        }
    }

    #[test]
    fn colored_tint_masks_to_image_geometry() {
        let tint = Color32::from_rgb(0x18, 0xFF, 0xFF);
        let inputs = PreviewInputs {
            tint: Some(tint),
            ..Default::default()
        };
        let style = compose(&inputs, &ready());
        match style.overlay {
            Overlay::Masked { color, opacity, mask } => {
                assert_eq!(color, tint);
                assert_eq!(opacity, 0.9);
                assert_eq!(mask.offset, egui::vec2(50.0, 100.0));
                assert_eq!(mask.size, egui::vec2(300.0, 150.0));
            }
            other => panic!("expected masked overlay, got {other:?}"),
        }
        assert_eq!(style.filter.to_string(), "contrast(1)");
    }

    #[test]
    fn mask_offset_never_negative() {
        let container = Rect::from_min_size(pos2(0.0, 0.0), egui::vec2(100.0, 100.0));
        let zoomed = Rect::from_min_size(pos2(-50.0, -20.0), egui::vec2(200.0, 140.0));
        let mask = MaskGeometry::between(container, zoomed);
        assert_eq!(mask.offset, egui::vec2(0.0, 0.0));
    }

    #[test]
    fn missing_image_falls_back_to_unmasked_wash() {
        let inputs = PreviewInputs {
            tint: Some(Color32::from_rgb(0xF5, 0x00, 0x57)),
            ..Default::default()
        };
        let style = compose(&inputs, &ImageLayout::Absent);
        assert!(matches!(style.overlay, Overlay::Unmasked { opacity, .. } if opacity == 0.6));
    }

    #[test]
    fn padding_follows_default_size_flag() {
        let mut inputs = PreviewInputs::default();
        assert_eq!(compose(&inputs, &ImageLayout::Absent).padding, DEFAULT_SIZE_PADDING);
        inputs.apply_default_size = false;
        inputs.zoom = 1.7;
        let style = compose(&inputs, &ImageLayout::Absent);
        assert_eq!(style.padding, 0.0);
        assert_eq!(style.scale, 1.7);
    }

    #[test]
    fn load_listener_fires_once() {
        let inputs = PreviewInputs {
            tint: Some(Color32::from_rgb(0xFF, 0xD7, 0x40)),
            ..Default::default()
        };
        let mut comp = Compositor::default();
        let style = comp.update(&inputs, &ImageLayout::Decoding);
        assert!(matches!(style.overlay, Overlay::AwaitingImage { .. }));
        assert!(comp.is_waiting_for_image());

        let fired = comp.image_loaded(&inputs, &ready()).cloned();
        assert!(matches!(fired.map(|s| s.overlay), Some(Overlay::Masked { .. })));
        assert!(comp.image_loaded(&inputs, &ready()).is_none());
    }

    #[test]
    fn untinted_update_does_not_arm_listener() {
        let mut comp = Compositor::default();
        comp.update(&PreviewInputs::default(), &ImageLayout::Decoding);
        assert!(!comp.is_waiting_for_image());
        assert!(comp.image_loaded(&PreviewInputs::default(), &ready()).is_none());
    }

    #[test]
    fn solid_white_chain_whitens_pixels_and_keeps_alpha() {
        let src = RgbaImage::from_pixel(2, 2, image::Rgba([12, 200, 90, 77]));
        let out = apply_filter_chain(&src, &FilterChain::solid_white());
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 77]));
    }

    #[test]
    fn invert_and_grayscale_apply_in_order() {
        let src = RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        let out = apply_filter_chain(&src, &FilterChain::standard(1.0, true, true));
        let p = out.get_pixel(0, 0).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        // luma of cyan (0, 1, 1) = 0.7874
        assert_eq!(p[0], 201);
    }

    #[test]
    fn silhouette_scales_source_alpha() {
        let mut src = RgbaImage::new(2, 1);
        src.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        src.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        let out = silhouette(&src, Color32::from_rgb(1, 2, 3), 0.5);
        assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3, 128]);
        assert_eq!(out.get_pixel(1, 0).0[3], 0);
    }
}
