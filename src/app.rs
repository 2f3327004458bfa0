use eframe::egui;
use egui::{Color32, Rect, RichText, Vec2};
use image::RgbaImage;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::{ApiError, BackendClient, proxy_image_url};
use crate::components::artists::{ArtistList, ArtistStatus, SidebarAction};
use crate::components::colors::PickerChange;
use crate::components::gallery::{FanartGallery, GalleryAction};
use crate::components::lightbox::{Lightbox, LightboxAction, build_candidates};
use crate::compositor::{
    Compositor, FilterChain, ImageLayout, Overlay, PreviewInputs, apply_filter_chain, compose,
    silhouette,
};
use crate::images::{
    TextureCache, encode_data_uri, fit_rect, mime_for_path, short_url, to_color_image,
};
use crate::input::{KeyAction, collect_key_actions};
use crate::jobs::{ApiEvent, Dispatcher, RequestKind};
use crate::notifications::Toasts;
use crate::ops::text::TextCase;
use crate::session::{
    EditorSection, EditorSession, LogoSource, MAX_CONTRAST, MAX_ROWS, MAX_ZOOM, MIN_CONTRAST,
    MIN_ZOOM,
};
use crate::settings::AppSettings;
use crate::theme::ThemeMode;
use crate::{log_err, log_info, log_warn};

const MAIN_IMAGE_SIZE: f32 = 220.0;
const PREVIEW_HEIGHT: f32 = 260.0;
const FULL_UV: Rect = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

// ============================================================================
// PREVIEW IMAGE — decoded logo plus the textures derived from it
// ============================================================================

struct PreviewImage {
    url: String,
    source: RgbaImage,
    filtered: Option<(FilterChain, egui::TextureHandle)>,
    tint_mask: Option<((Color32, f32), egui::TextureHandle)>,
}

impl PreviewImage {
    fn new(url: String, source: RgbaImage) -> Self {
        Self {
            url,
            source,
            filtered: None,
            tint_mask: None,
        }
    }

    fn size(&self) -> Vec2 {
        Vec2::new(self.source.width() as f32, self.source.height() as f32)
    }

    /// Texture for `chain`, re-filtered only when the chain changes.
    fn filtered(&mut self, ctx: &egui::Context, chain: &FilterChain) -> egui::TextureId {
        let stale = !matches!(&self.filtered, Some((c, _)) if c == chain);
        if stale {
            let pixels = apply_filter_chain(&self.source, chain);
            let tex = ctx.load_texture(
                "preview",
                to_color_image(&pixels),
                egui::TextureOptions::LINEAR,
            );
            self.filtered = Some((chain.clone(), tex));
        }
        match &self.filtered {
            Some((_, tex)) => tex.id(),
            None => egui::TextureId::default(),
        }
    }

    fn tint_mask(&mut self, ctx: &egui::Context, color: Color32, opacity: f32) -> egui::TextureId {
        let key = (color, opacity);
        let stale = !matches!(&self.tint_mask, Some((k, _)) if *k == key);
        if stale {
            let pixels = silhouette(&self.source, color, opacity);
            let tex = ctx.load_texture(
                "preview-tint",
                to_color_image(&pixels),
                egui::TextureOptions::LINEAR,
            );
            self.tint_mask = Some((key, tex));
        }
        match &self.tint_mask {
            Some((_, tex)) => tex.id(),
            None => egui::TextureId::default(),
        }
    }
}

enum PreviewState {
    Empty,
    Loading,
    Ready(PreviewImage),
    Failed(String),
}

/// Image rect inside the preview container for the given filter state.
fn preview_layout(container: Rect, image_size: Vec2, inputs: &PreviewInputs) -> ImageLayout {
    let base = compose(inputs, &ImageLayout::Absent);
    let fitted = fit_rect(image_size, container.shrink(base.padding));
    ImageLayout::Ready {
        container,
        image: Rect::from_center_size(fitted.center(), fitted.size() * base.scale),
    }
}

// ============================================================================
// APP
// ============================================================================

pub struct ArtistLogoApp {
    settings: AppSettings,
    theme: ThemeMode,
    jobs: Option<Dispatcher>,
    artists: ArtistList,
    artists_loading: bool,
    connection_error: Option<String>,
    session: EditorSession,
    gallery: FanartGallery,
    /// Image-search link for the current artist, when the server offers one.
    search_url: Option<String>,
    lightbox: Lightbox,
    /// Main image URL the lightbox will open on once posters arrive.
    lightbox_pending: Option<String>,
    textures: TextureCache,
    compositor: Compositor,
    preview: PreviewState,
    preview_container: Option<Rect>,
    toasts: Toasts,
}

impl ArtistLogoApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        settings.theme_mode.apply(&cc.egui_ctx);

        let (jobs, connection_error) = match BackendClient::new(&settings.server_url) {
            Ok(client) => {
                log_info!("Backend: {}", client.base_url());
                (Some(Dispatcher::new(client, Some(cc.egui_ctx.clone()))), None)
            }
            Err(e) => {
                log_err!("Backend client unavailable: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let mut app = Self::with_parts(settings, jobs);
        app.connection_error = connection_error;
        app.reload_artists();
        app
    }

    fn with_parts(settings: AppSettings, jobs: Option<Dispatcher>) -> Self {
        let mut session = EditorSession::default();
        // Seed the cache-buster so a restart never reuses a cached poster.
        session.poster_nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            theme: settings.theme_mode,
            settings,
            jobs,
            artists: ArtistList::default(),
            artists_loading: false,
            connection_error: None,
            session,
            gallery: FanartGallery::default(),
            search_url: None,
            lightbox: Lightbox::default(),
            lightbox_pending: None,
            textures: TextureCache::default(),
            compositor: Compositor::default(),
            preview: PreviewState::Empty,
            preview_container: None,
            toasts: Toasts::default(),
        }
    }

    fn base_url(&self) -> &str {
        match &self.jobs {
            Some(j) => j.client().base_url(),
            None => &self.settings.server_url,
        }
    }

    /// Where to fetch `url` from: server URLs and data URIs directly,
    /// everything else through the server's image proxy.
    fn fetch_url_for(&self, url: &str) -> String {
        let base = self.base_url();
        if url.starts_with("data:") || url.starts_with(base) {
            return url.to_string();
        }
        proxy_image_url(base, url).unwrap_or_else(|_| url.to_string())
    }

    fn main_image_url(&self) -> Option<String> {
        let key = self.session.current_key()?;
        let jobs = self.jobs.as_ref()?;
        Some(jobs.client().poster_url(key, self.session.poster_nonce))
    }

    // ====================================================================
    // ACTIONS
    // ====================================================================

    fn reload_artists(&mut self) {
        if let Some(jobs) = self.jobs.as_mut() {
            self.artists_loading = true;
            jobs.load_artists();
        }
    }

    fn load_artist(&mut self, key: &str, name: &str) {
        log_info!("Load artist {} ({})", name, key);
        self.session.load_artist(key, name);
        self.gallery.clear();
        self.search_url = None;
        self.preview = PreviewState::Empty;
        self.lightbox.close();
        self.lightbox_pending = None;
        self.textures.clear();
        self.artists.request_scroll_to_current();
        if let Some(jobs) = self.jobs.as_mut() {
            jobs.invalidate(RequestKind::PreviewImage);
            jobs.invalidate(RequestKind::TextPreview);
            jobs.invalidate(RequestKind::Posters);
            jobs.load_options(key);
        }
    }

    fn navigate_artist(&mut self, delta: isize) {
        let target = self
            .artists
            .navigate(self.session.current_key(), delta)
            .map(|a| (a.key.clone(), a.name.clone()));
        if let Some((key, name)) = target {
            self.load_artist(&key, &name);
        }
    }

    fn select_logo(&mut self, source: LogoSource) {
        let display = match source.display_url(self.base_url()) {
            Ok(url) => url,
            Err(e) => {
                self.toasts.error(format!("Cannot load image: {}", e.user_message()));
                return;
            }
        };
        self.session.choose_logo(source);
        if let Some(jobs) = self.jobs.as_mut() {
            self.preview = PreviewState::Loading;
            // A text preview still in flight would replace this choice.
            jobs.invalidate(RequestKind::TextPreview);
            jobs.load_preview_image(display);
        }
    }

    fn upload_logo(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg", "webp", "gif", "bmp"])
            .pick_file()
        else {
            return;
        };
        match std::fs::read(&path) {
            Ok(bytes) => {
                log_info!("Upload {} ({} bytes)", path.display(), bytes.len());
                let uri = encode_data_uri(mime_for_path(&path), &bytes);
                self.select_logo(LogoSource::Upload(uri));
            }
            Err(e) => {
                log_err!("Failed to read {}: {}", path.display(), e);
                self.toasts.error(format!("Could not read {}", path.display()));
            }
        }
    }

    fn request_text_preview(&mut self) {
        let Some(req) = self.session.text_request() else { return };
        if let Some(jobs) = self.jobs.as_mut() {
            jobs.preview_text(req);
        }
    }

    fn save(&mut self) {
        if self.session.current.is_none() {
            return;
        }
        let Some(req) = self.session.save_request() else {
            self.toasts.error("Select a logo first!");
            return;
        };
        if let Some(jobs) = self.jobs.as_mut() {
            jobs.save(req);
        }
    }

    fn save_custom(&mut self) {
        let Some(req) = self.session.text_request() else { return };
        if let Some(jobs) = self.jobs.as_mut() {
            jobs.save_custom(req);
        }
    }

    fn open_lightbox(&mut self, current_url: String) {
        let Some(key) = self.session.current_key().map(str::to_string) else { return };
        if let Some(jobs) = self.jobs.as_mut() {
            self.lightbox_pending = Some(current_url);
            jobs.load_posters(&key);
        }
    }

    fn save_from_lightbox(&mut self) {
        let Some(url) = self.lightbox.current().map(str::to_string) else {
            self.toasts.error("No image to save");
            return;
        };
        let Some(key) = self.session.current_key().map(str::to_string) else { return };
        if let Some(jobs) = self.jobs.as_mut() {
            jobs.set_poster(&key, &url);
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.theme = self.theme.toggle();
        self.theme.apply(ctx);
        self.settings.theme_mode = self.theme;
        self.settings.save();
    }

    fn handle_sidebar(&mut self, action: SidebarAction) {
        match action {
            SidebarAction::Load { key, name } => self.load_artist(&key, &name),
            SidebarAction::ToggleStatus(key) => {
                if let Some(jobs) = self.jobs.as_mut() {
                    jobs.toggle_status(&key);
                }
            }
            SidebarAction::BulkApplyFanart => {
                let keys = self.artists.selected_keys();
                if let Some(jobs) = self.jobs.as_mut() {
                    jobs.bulk_apply_fanart(keys);
                }
            }
            SidebarAction::BulkToggleStatus => {
                let keys = self.artists.selected_keys();
                if let Some(jobs) = self.jobs.as_mut() {
                    jobs.bulk_toggle_status(keys);
                }
            }
        }
    }

    fn handle_key(&mut self, action: KeyAction) {
        match action {
            KeyAction::LightboxPrev => self.lightbox.prev(),
            KeyAction::LightboxNext => self.lightbox.next(),
            KeyAction::LightboxClose => self.lightbox.close(),
            KeyAction::NavigateArtist(delta) => self.navigate_artist(delta),
        }
    }

    fn is_current(&self, key: &str) -> bool {
        self.session.current_key() == Some(key)
    }

    // ====================================================================
    // EVENTS — results from background jobs
    // ====================================================================

    fn process_events(&mut self, ctx: &egui::Context) {
        let Some(jobs) = self.jobs.as_mut() else { return };
        for ev in jobs.drain() {
            self.handle_event(ctx, ev);
        }
    }

    fn handle_event(&mut self, ctx: &egui::Context, ev: ApiEvent) {
        match ev {
            ApiEvent::ArtistsLoaded(result) => {
                self.artists_loading = false;
                match result {
                    Ok(items) => {
                        log_info!("Loaded {} artists", items.len());
                        self.connection_error = None;
                        self.artists = ArtistList::new(items);
                    }
                    Err(e) => {
                        log_err!("Artist list failed: {}", e);
                        self.toasts.error("Could not load the artist list");
                        self.connection_error = Some(e.to_string());
                    }
                }
            }
            ApiEvent::Options { key, result, .. } => {
                if !self.is_current(&key) {
                    return;
                }
                match result {
                    Ok(opts) => {
                        self.gallery.set_logos(opts.logos);
                        self.search_url = opts.google_url;
                    }
                    Err(e) => {
                        log_warn!("Options for {} failed: {}", key, e);
                        self.gallery.clear();
                        self.toasts.error(format!("Failed to load fanart: {}", e.user_message()));
                    }
                }
            }
            ApiEvent::TextPreview { result, .. } => match result {
                Ok((logo, img)) => {
                    self.session.choose_logo(LogoSource::Generated(logo.data_uri.clone()));
                    if let Some(jobs) = self.jobs.as_mut() {
                        jobs.invalidate(RequestKind::PreviewImage);
                    }
                    self.set_preview_ready(PreviewImage::new(logo.data_uri, img));
                }
                Err(e) => {
                    log_warn!("Text preview failed: {}", e);
                    self.toasts.error(format!("Preview failed: {}", e.user_message()));
                }
            },
            ApiEvent::PreviewImage { url, result, .. } => match result {
                Ok(img) => self.set_preview_ready(PreviewImage::new(url, img)),
                Err(e) => {
                    log_warn!("Preview image {} failed: {}", short_url(&url), e);
                    self.preview = PreviewState::Failed(e.user_message());
                }
            },
            ApiEvent::Thumbnail { url, result } => {
                let stored = match result {
                    Ok(img) => self.textures.insert(ctx, &url, &img),
                    Err(e) => {
                        log_warn!("Thumbnail {} failed: {}", short_url(&url), e);
                        self.textures.mark_failed(&url)
                    }
                };
                if !stored {
                    log_info!("Discarded thumbnail {}", short_url(&url));
                }
            }
            ApiEvent::Posters { key, result, .. } => {
                let Some(current) = self.lightbox_pending.take() else { return };
                if !self.is_current(&key) {
                    return;
                }
                let images = match result {
                    Ok(posters) => build_candidates(&posters, self.gallery.logos(), &current),
                    Err(e) => {
                        log_warn!("Posters for {} failed: {}", key, e);
                        vec![current.clone()]
                    }
                };
                self.lightbox.open_with(images, Some(&current));
            }
            ApiEvent::Saved { key, result } => match result {
                Ok(()) => {
                    self.toasts.success("Saved to Plex!");
                    self.status_changed(&key, ArtistStatus::Done);
                }
                Err(e) => self.toasts.error(format!("Save failed: {}", e.user_message())),
            },
            ApiEvent::CustomSaved { key, result } => match result {
                Ok(()) => {
                    self.toasts.success("Custom text logo saved!");
                    self.status_changed(&key, ArtistStatus::Custom);
                }
                Err(e) => self.toasts.error(format!("Save failed: {}", e.user_message())),
            },
            ApiEvent::StatusToggled { key, result } => match result {
                Ok(status) => {
                    self.artists.set_status(&key, status);
                    self.toasts.success("Status updated!");
                }
                Err(e) => self.toasts.error(format!("Status update failed: {}", e.user_message())),
            },
            ApiEvent::BulkApplied { keys, result } => match result {
                Ok(count) => {
                    for key in &keys {
                        self.artists.set_status(key, ArtistStatus::Done);
                    }
                    self.toasts.success(format!("Successfully updated {count} artists."));
                }
                Err(e) => {
                    log_err!("Bulk apply failed: {}", e);
                    self.toasts.error("An error occurred during bulk update.");
                }
            },
            ApiEvent::BulkToggled(result) => match result {
                Ok(updated) => {
                    for (key, status) in &updated {
                        self.artists.set_status(key, *status);
                    }
                    self.toasts
                        .success(format!("Successfully updated {} artists.", updated.len()));
                }
                Err(e) => {
                    log_err!("Bulk toggle failed: {}", e);
                    self.toasts.error("An error occurred during bulk update.");
                }
            },
            ApiEvent::PosterSet { key, result } => match result {
                Ok(()) => {
                    self.toasts.success("Poster set in Plex");
                    if self.is_current(&key) {
                        self.session.bump_poster();
                    }
                    self.lightbox.close();
                }
                Err(ApiError::Rejected(msg)) => {
                    self.toasts.error(format!("Failed to set poster: {msg}"));
                }
                Err(e) => {
                    log_err!("set_poster failed: {}", e);
                    self.toasts.error("Error setting poster");
                }
            },
        }
    }

    /// Status dot update after a save; also refreshes the main image.
    fn status_changed(&mut self, key: &str, status: ArtistStatus) {
        self.artists.set_status(key, status);
        if self.is_current(key) {
            self.session.bump_poster();
        }
    }

    /// A new tint (or none) makes the cached mask texture useless.
    fn apply_tint_change(&mut self, change: PickerChange) {
        match change {
            PickerChange::Unchanged => return,
            PickerChange::Selected(c) => log_info!("Tint {:?}", c),
            PickerChange::Cleared => log_info!("Tint cleared"),
        }
        if let PreviewState::Ready(img) = &mut self.preview {
            img.tint_mask = None;
        }
    }

    fn set_preview_ready(&mut self, img: PreviewImage) {
        let inputs = self.session.preview_inputs();
        // Mask geometry waits on the decoded size; resolve it now if a tint
        // was chosen while the image was still loading.
        if self.compositor.is_waiting_for_image()
            && let Some(container) = self.preview_container
        {
            let layout = preview_layout(container, img.size(), &inputs);
            if self.compositor.image_loaded(&inputs, &layout).is_some() {
                log_info!("Tint mask resolved for {}", short_url(&img.url));
            }
        }
        self.preview = PreviewState::Ready(img);
    }

    // ====================================================================
    // UI
    // ====================================================================

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("ArtistLogo");
                ui.separator();
                ui.label(RichText::new(self.base_url()).weak());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button(self.theme.toggle_label()).clicked() {
                        self.toggle_theme(ctx);
                    }
                    if ui
                        .add_enabled(!self.artists_loading, egui::Button::new("⟳ Reload"))
                        .clicked()
                    {
                        self.reload_artists();
                    }
                    if self.jobs.as_ref().is_some_and(Dispatcher::is_busy) {
                        ui.spinner();
                    }
                });
            });
        });
    }

    fn show_sidebar(&mut self, ctx: &egui::Context) {
        let mut actions = Vec::new();
        egui::SidePanel::left("artists")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                if let Some(err) = &self.connection_error {
                    ui.colored_label(ui.visuals().error_fg_color, err.as_str());
                }
                if self.artists_loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading artists…");
                    });
                    return;
                }
                actions = self.artists.show(ui, self.session.current_key());
            });
        for action in actions {
            self.handle_sidebar(action);
        }
    }

    fn show_editor(&mut self, ctx: &egui::Context, wanted: &mut Vec<String>) {
        let viewport_width = ctx.screen_rect().width();
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(current) = self.session.current.clone() else {
                ui.centered_and_justified(|ui| {
                    ui.label("Select an artist from the list");
                });
                return;
            };
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading(current.name.as_str());
                ui.add_space(6.0);

                ui.horizontal_top(|ui| {
                    self.show_main_image(ui, wanted);
                    ui.vertical(|ui| self.show_preview(ui));
                });
                ui.add_space(6.0);
                self.show_filter_controls(ui);
                ui.separator();

                ui.horizontal(|ui| {
                    for section in [EditorSection::Fanart, EditorSection::TextGenerator] {
                        if ui
                            .selectable_label(self.session.is_section_open(section), section.label())
                            .clicked()
                        {
                            self.session.toggle_section(section);
                        }
                    }
                });
                ui.add_space(4.0);

                match self.session.section {
                    Some(EditorSection::Fanart) => {
                        if let Some(url) = &self.search_url {
                            ui.hyperlink_to("Search the web for a logo", url);
                        }
                        if let Some(GalleryAction::Choose(url)) =
                            self.gallery.show(ui, viewport_width, &self.textures, wanted)
                        {
                            self.select_logo(LogoSource::Fanart(url));
                        }
                    }
                    Some(EditorSection::TextGenerator) => self.show_text_generator(ui),
                    None => {}
                }
            });
        });
    }

    fn show_main_image(&mut self, ui: &mut egui::Ui, wanted: &mut Vec<String>) {
        let (rect, resp) =
            ui.allocate_exact_size(Vec2::splat(MAIN_IMAGE_SIZE), egui::Sense::click());
        ui.painter().rect_filled(rect, 6.0, Color32::BLACK);
        let Some(url) = self.main_image_url() else { return };
        match self.textures.get(&url) {
            Some(tex) => {
                ui.painter()
                    .image(tex.id(), fit_rect(tex.size_vec2(), rect), FULL_UV, Color32::WHITE);
                let resp = resp.on_hover_text("Browse artwork");
                if resp.clicked() {
                    self.open_lightbox(url);
                }
            }
            None if self.textures.is_failed(&url) => {
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No poster",
                    egui::FontId::proportional(14.0),
                    Color32::GRAY,
                );
            }
            None => {
                wanted.push(url);
                ui.put(rect, egui::Spinner::new());
            }
        }
    }

    fn show_preview(&mut self, ui: &mut egui::Ui) {
        let size = Vec2::new(ui.available_width().clamp(200.0, 520.0), PREVIEW_HEIGHT);
        let (container, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        self.preview_container = Some(container);
        ui.painter().rect_filled(container, 6.0, Color32::from_gray(24));

        let inputs = self.session.preview_inputs();
        let layout = match &self.preview {
            PreviewState::Ready(img) => preview_layout(container, img.size(), &inputs),
            PreviewState::Loading => ImageLayout::Decoding,
            PreviewState::Empty | PreviewState::Failed(_) => ImageLayout::Absent,
        };
        let style = self.compositor.update(&inputs, &layout).clone();
        let painter = ui.painter_at(container);
        let ctx = ui.ctx().clone();

        match &mut self.preview {
            PreviewState::Ready(img) => {
                if let ImageLayout::Ready { image, .. } = layout {
                    let tex = img.filtered(&ctx, &style.filter);
                    painter.image(tex, image, FULL_UV, Color32::WHITE);
                }
            }
            PreviewState::Loading => {
                ui.put(container, egui::Spinner::new());
            }
            PreviewState::Failed(msg) => {
                painter.text(
                    container.center(),
                    egui::Align2::CENTER_CENTER,
                    format!("Failed to load image: {msg}"),
                    egui::FontId::proportional(13.0),
                    ui.visuals().error_fg_color,
                );
            }
            PreviewState::Empty => {
                painter.text(
                    container.center(),
                    egui::Align2::CENTER_CENTER,
                    "Pick a logo, upload one, or generate text",
                    egui::FontId::proportional(13.0),
                    Color32::GRAY,
                );
            }
        }

        match style.overlay {
            Overlay::Hidden | Overlay::AwaitingImage { .. } => {}
            Overlay::Masked {
                color,
                opacity,
                mask,
            } => {
                if let PreviewState::Ready(img) = &mut self.preview {
                    let tex = img.tint_mask(&ctx, color, opacity);
                    painter.image(tex, mask.rect_in(container), FULL_UV, Color32::WHITE);
                }
            }
            Overlay::Unmasked { color, opacity } => {
                let wash = Color32::from_rgba_unmultiplied(
                    color.r(),
                    color.g(),
                    color.b(),
                    (opacity * 255.0).round() as u8,
                );
                painter.rect_filled(container, 6.0, wash);
            }
        }

        if !style.filter.is_identity() {
            ui.label(RichText::new(style.filter.to_string()).small().weak());
        }
    }

    fn show_filter_controls(&mut self, ui: &mut egui::Ui) {
        let mut filters = self.session.filters;
        ui.horizontal_wrapped(|ui| {
            ui.label("Zoom");
            ui.add_enabled(
                !filters.apply_default_size,
                egui::Slider::new(&mut filters.zoom, MIN_ZOOM..=MAX_ZOOM).step_by(0.05),
            );
            ui.label("Contrast");
            ui.add(egui::Slider::new(&mut filters.contrast, MIN_CONTRAST..=MAX_CONTRAST).step_by(0.05));
            if ui.selectable_label(filters.invert, "Invert").clicked() {
                filters.invert = !filters.invert;
            }
            if ui.selectable_label(filters.monochrome, "Monochrome").clicked() {
                filters.monochrome = !filters.monochrome;
            }
            ui.checkbox(&mut filters.apply_default_size, "Apply default size");
        });
        self.session.filters = filters;
        self.session.set_zoom(filters.zoom);
        self.session.set_contrast(filters.contrast);

        let tint = ui
            .horizontal(|ui| {
                ui.label("Tint");
                self.session.tint.show(ui)
            })
            .inner;
        self.apply_tint_change(tint);

        ui.horizontal(|ui| {
            if ui.button("Reset filters").clicked() {
                self.session.reset_filters();
            }
            if ui.button("Upload…").clicked() {
                self.upload_logo();
            }
            let save = egui::Button::new(RichText::new("Save").strong());
            if ui.add(save).clicked() {
                self.save();
            }
        });
    }

    fn show_text_generator(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;

        ui.label("Font");
        let fonts = self.settings.fonts.clone();
        ui.horizontal_wrapped(|ui| {
            for font in &fonts {
                if ui.selectable_label(self.session.text.font == *font, font.as_str()).clicked() {
                    self.session.set_font(font);
                    changed = true;
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Rows");
            for rows in 1..=MAX_ROWS {
                if ui
                    .selectable_label(self.session.text.rows == rows, rows.to_string())
                    .clicked()
                {
                    self.session.set_rows(rows);
                    changed = true;
                }
            }
            ui.separator();
            ui.label("Case");
            for case in TextCase::all() {
                if ui
                    .selectable_label(self.session.text.case == *case, case.label())
                    .clicked()
                {
                    self.session.set_case(*case);
                    changed = true;
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Colour");
            if let PickerChange::Selected(_) = self.session.text_color.show(ui) {
                changed = true;
            }
        });

        let lines = self.session.predicted_lines();
        if !lines.is_empty() {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                for line in &lines {
                    ui.monospace(line.as_str());
                }
            });
        }

        ui.horizontal(|ui| {
            if ui.button("Preview").clicked() {
                changed = true;
            }
            if ui.button(RichText::new("Save text logo").strong()).clicked() {
                self.save_custom();
            }
        });

        if changed {
            self.request_text_preview();
        }
    }

    /// Start fetches for thumbnails requested during this frame.
    fn fetch_wanted(&mut self, wanted: Vec<String>) {
        for url in wanted {
            if !self.textures.claim(&url) {
                continue;
            }
            let fetch = self.fetch_url_for(&url);
            if let Some(jobs) = self.jobs.as_mut() {
                jobs.load_thumbnail(url, fetch);
            }
        }
    }
}

impl eframe::App for ArtistLogoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll background results ---
        self.process_events(ctx);

        // --- Keyboard ---
        for action in collect_key_actions(ctx, self.lightbox.is_open()) {
            self.handle_key(action);
        }

        let title = match &self.session.current {
            Some(c) => format!("ArtistLogo - {}", c.name),
            None => "ArtistLogo".to_string(),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));

        let mut wanted = Vec::new();
        self.show_top_bar(ctx);
        self.show_sidebar(ctx);
        self.show_editor(ctx, &mut wanted);

        if let Some(LightboxAction::SaveCurrent) = self.lightbox.show(ctx, &self.textures, &mut wanted) {
            self.save_from_lightbox();
        }
        self.toasts.show(ctx);

        self.fetch_wanted(wanted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GeneratedLogo;
    use crate::components::artists::ArtistItem;

    const FANART: &str = "https://fanart.example/queen.png";

    /// App wired to a dispatcher whose server never answers.
    fn offline_app() -> ArtistLogoApp {
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let mut app = ArtistLogoApp::with_parts(AppSettings::default(), Some(Dispatcher::new(client, None)));
        app.artists = ArtistList::new(
            ["7", "8", "9"]
                .iter()
                .map(|k| ArtistItem::new(*k, format!("Artist {k}"), ArtistStatus::None))
                .collect(),
        );
        app.session.load_artist("7", "Artist 7");
        app
    }

    fn jobs(app: &mut ArtistLogoApp) -> &mut Dispatcher {
        app.jobs.as_mut().unwrap()
    }

    fn last_toast(app: &ArtistLogoApp) -> &str {
        app.toasts.items().last().map(|t| t.message.as_str()).unwrap_or_default()
    }

    fn status(app: &ArtistLogoApp, key: &str) -> ArtistStatus {
        app.artists.get(key).unwrap().status
    }

    #[test]
    fn late_text_preview_does_not_replace_chosen_logo() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        // font click: a text preview goes out
        let pending = jobs(&mut app).issue(RequestKind::TextPreview);
        // logo click before it returns
        app.select_logo(LogoSource::Fanart(FANART.to_string()));

        let generated = GeneratedLogo {
            data_uri: encode_data_uri("image/jpeg", &[1, 2, 3]),
            bytes: vec![1, 2, 3],
        };
        jobs(&mut app).deliver(ApiEvent::TextPreview {
            token: pending,
            result: Ok((generated, RgbaImage::new(1, 1))),
        });
        app.process_events(&ctx);

        assert_eq!(app.session.selected_logo, Some(LogoSource::Fanart(FANART.to_string())));
        assert!(!matches!(app.preview, PreviewState::Ready(_)));
    }

    #[test]
    fn rejected_poster_keeps_lightbox_open() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        app.lightbox.open_with(vec!["a".to_string(), "b".to_string()], Some("b"));
        let nonce = app.session.poster_nonce;

        app.handle_event(
            &ctx,
            ApiEvent::PosterSet {
                key: "7".to_string(),
                result: Err(ApiError::Rejected("Plex said no".to_string())),
            },
        );
        assert!(app.lightbox.is_open());
        assert_eq!(app.session.poster_nonce, nonce);
        assert_eq!(last_toast(&app), "Failed to set poster: Plex said no");

        let before = app.main_image_url();
        app.handle_event(
            &ctx,
            ApiEvent::PosterSet {
                key: "7".to_string(),
                result: Ok(()),
            },
        );
        assert!(!app.lightbox.is_open());
        assert_eq!(app.session.poster_nonce, nonce.wrapping_add(1));
        assert_ne!(app.main_image_url(), before);
        assert_eq!(last_toast(&app), "Poster set in Plex");
    }

    #[test]
    fn failed_poster_list_shows_current_image_only() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        app.gallery.set_logos(vec![FANART.to_string()]);
        let current = app.main_image_url().unwrap();
        app.lightbox_pending = Some(current.clone());
        let token = jobs(&mut app).issue(RequestKind::Posters);

        app.handle_event(
            &ctx,
            ApiEvent::Posters {
                token,
                key: "7".to_string(),
                result: Err(ApiError::Status(502)),
            },
        );
        assert!(app.lightbox.is_open());
        assert_eq!(app.lightbox.images(), &[current]);
        assert!(app.lightbox_pending.is_none());
    }

    #[test]
    fn posters_for_another_artist_are_ignored() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        app.lightbox_pending = Some("poster".to_string());
        let token = jobs(&mut app).issue(RequestKind::Posters);
        app.handle_event(
            &ctx,
            ApiEvent::Posters {
                token,
                key: "8".to_string(),
                result: Ok(vec!["p1".to_string()]),
            },
        );
        assert!(!app.lightbox.is_open());
    }

    #[test]
    fn bulk_apply_marks_every_posted_key_done() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        app.handle_event(
            &ctx,
            ApiEvent::BulkApplied {
                keys: vec!["7".to_string(), "9".to_string()],
                result: Ok(2),
            },
        );
        assert_eq!(status(&app, "7"), ArtistStatus::Done);
        assert_eq!(status(&app, "8"), ArtistStatus::None);
        assert_eq!(status(&app, "9"), ArtistStatus::Done);
        assert_eq!(last_toast(&app), "Successfully updated 2 artists.");

        app.handle_event(
            &ctx,
            ApiEvent::BulkApplied {
                keys: vec!["8".to_string()],
                result: Err(ApiError::Status(500)),
            },
        );
        assert_eq!(status(&app, "8"), ArtistStatus::None);
        assert_eq!(last_toast(&app), "An error occurred during bulk update.");
    }

    #[test]
    fn bulk_toggle_applies_returned_statuses() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        app.artists.set_status("8", ArtistStatus::Done);
        app.handle_event(
            &ctx,
            ApiEvent::BulkToggled(Ok(vec![
                ("7".to_string(), ArtistStatus::Done),
                ("8".to_string(), ArtistStatus::None),
            ])),
        );
        assert_eq!(status(&app, "7"), ArtistStatus::Done);
        assert_eq!(status(&app, "8"), ArtistStatus::None);
        assert_eq!(status(&app, "9"), ArtistStatus::None);
    }

    #[test]
    fn failed_save_leaves_state_alone() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        let nonce = app.session.poster_nonce;
        app.handle_event(
            &ctx,
            ApiEvent::Saved {
                key: "7".to_string(),
                result: Err(ApiError::Rejected("Rating key missing".to_string())),
            },
        );
        assert_eq!(status(&app, "7"), ArtistStatus::None);
        assert_eq!(app.session.poster_nonce, nonce);
        assert_eq!(last_toast(&app), "Save failed: Rating key missing");

        app.handle_event(
            &ctx,
            ApiEvent::Saved {
                key: "7".to_string(),
                result: Ok(()),
            },
        );
        assert_eq!(status(&app, "7"), ArtistStatus::Done);
        assert_eq!(app.session.poster_nonce, nonce.wrapping_add(1));
    }

    #[test]
    fn thumbnail_cache_stays_bounded_across_artists() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        let img = RgbaImage::new(2, 2);
        let mut previous: Option<String> = None;
        for key in ["7", "8", "9", "7"] {
            app.load_artist(key, "Artist");
            for n in 0..4 {
                assert!(app.textures.claim(&format!("https://img/{key}/{n}")));
            }
            // the last artist's thumbnail lands after the switch
            if let Some(prev) = previous.take() {
                app.handle_event(
                    &ctx,
                    ApiEvent::Thumbnail {
                        url: prev,
                        result: Ok(img.clone()),
                    },
                );
            }
            let url = format!("https://img/{key}/0");
            app.handle_event(
                &ctx,
                ApiEvent::Thumbnail {
                    url: url.clone(),
                    result: Ok(img.clone()),
                },
            );
            assert!(app.textures.get(&url).is_some());
            assert_eq!(app.textures.len(), 4);
            previous = Some(format!("https://img/{key}/3"));
        }
    }

    #[test]
    fn tint_change_drops_cached_mask() {
        let ctx = egui::Context::default();
        let mut app = offline_app();
        let mut img = PreviewImage::new(FANART.to_string(), RgbaImage::new(4, 4));
        img.tint_mask(&ctx, Color32::RED, 0.5);
        app.preview = PreviewState::Ready(img);

        app.apply_tint_change(PickerChange::Unchanged);
        assert!(matches!(&app.preview, PreviewState::Ready(i) if i.tint_mask.is_some()));

        let change = app.session.tint.click(2);
        assert!(matches!(change, PickerChange::Selected(_)));
        app.apply_tint_change(change);
        assert!(matches!(&app.preview, PreviewState::Ready(i) if i.tint_mask.is_none()));
    }
}
