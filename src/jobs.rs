// ============================================================================
// JOBS — background backend calls delivered over a channel
// ============================================================================
//
// Each call runs on its own thread with a clone of the shared client and
// sends one `ApiEvent` back; `update()` drains them at the start of a frame.
// Operations that supersede each other (loading artist options, the text
// preview, the preview image, lightbox posters) carry a `RequestToken`.
// Issuing a newer token of the same kind makes older results stale, and
// `drain` drops them on arrival.
// ============================================================================

use eframe::egui;
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::mpsc;

use crate::api::{ApiError, ArtistOptions, BackendClient, GeneratedLogo, SaveRequest, TextLogoRequest};
use crate::components::artists::{ArtistItem, ArtistStatus};
use crate::images::decode_rgba;
use crate::{log_info, log_warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    ArtistOptions,
    TextPreview,
    PreviewImage,
    Posters,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestToken {
    kind: RequestKind,
    generation: u64,
}

impl RequestToken {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// Latest generation issued per kind.
#[derive(Default, Debug)]
pub struct RequestTokens {
    latest: HashMap<RequestKind, u64>,
}

impl RequestTokens {
    /// New token for `kind`; every earlier token of that kind goes stale.
    pub fn issue(&mut self, kind: RequestKind) -> RequestToken {
        let generation = self.latest.entry(kind).or_insert(0);
        *generation = generation.wrapping_add(1);
        RequestToken {
            kind,
            generation: *generation,
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.get(&token.kind) == Some(&token.generation)
    }

    /// Stale every outstanding request of `kind` without starting a new one.
    pub fn invalidate(&mut self, kind: RequestKind) {
        self.issue(kind);
    }
}

/// Result of one background call.
pub enum ApiEvent {
    ArtistsLoaded(Result<Vec<ArtistItem>, ApiError>),
    Options {
        token: RequestToken,
        key: String,
        result: Result<ArtistOptions, ApiError>,
    },
    TextPreview {
        token: RequestToken,
        result: Result<(GeneratedLogo, RgbaImage), ApiError>,
    },
    PreviewImage {
        token: RequestToken,
        url: String,
        result: Result<RgbaImage, ApiError>,
    },
    Thumbnail {
        url: String,
        result: Result<RgbaImage, ApiError>,
    },
    Posters {
        token: RequestToken,
        key: String,
        result: Result<Vec<String>, ApiError>,
    },
    Saved {
        key: String,
        result: Result<(), ApiError>,
    },
    CustomSaved {
        key: String,
        result: Result<(), ApiError>,
    },
    StatusToggled {
        key: String,
        result: Result<ArtistStatus, ApiError>,
    },
    BulkApplied {
        keys: Vec<String>,
        result: Result<usize, ApiError>,
    },
    BulkToggled(Result<Vec<(String, ArtistStatus)>, ApiError>),
    PosterSet {
        key: String,
        result: Result<(), ApiError>,
    },
}

impl ApiEvent {
    pub fn token(&self) -> Option<RequestToken> {
        match self {
            ApiEvent::Options { token, .. }
            | ApiEvent::TextPreview { token, .. }
            | ApiEvent::PreviewImage { token, .. }
            | ApiEvent::Posters { token, .. } => Some(*token),
            _ => None,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

pub struct Dispatcher {
    client: BackendClient,
    sender: mpsc::Sender<ApiEvent>,
    receiver: mpsc::Receiver<ApiEvent>,
    tokens: RequestTokens,
    /// Woken after every delivery so results show without user input.
    ctx: Option<egui::Context>,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new(client: BackendClient, ctx: Option<egui::Context>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            client,
            sender,
            receiver,
            tokens: RequestTokens::default(),
            ctx,
            in_flight: 0,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn issue(&mut self, kind: RequestKind) -> RequestToken {
        self.tokens.issue(kind)
    }

    pub fn invalidate(&mut self, kind: RequestKind) {
        self.tokens.invalidate(kind);
    }

    /// Queue `ev` as if a worker had finished.
    #[cfg(test)]
    pub(crate) fn deliver(&self, ev: ApiEvent) {
        let _ = self.sender.send(ev);
    }

    /// Everything delivered since the last frame, minus superseded results.
    pub fn drain(&mut self) -> Vec<ApiEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.receiver.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if let Some(token) = ev.token()
                && !self.tokens.is_current(token)
            {
                log_info!("Dropped stale {:?} response", token.kind());
                continue;
            }
            out.push(ev);
        }
        out
    }

    fn spawn<F>(&mut self, label: &str, job: F)
    where
        F: FnOnce(&BackendClient) -> ApiEvent + Send + 'static,
    {
        let client = self.client.clone();
        let sender = self.sender.clone();
        let ctx = self.ctx.clone();
        self.in_flight += 1;
        log_info!("Dispatch {}", label);
        let spawned = std::thread::Builder::new()
            .name(format!("api-{label}"))
            .spawn(move || {
                let ev = job(&client);
                let _ = sender.send(ev);
                if let Some(ctx) = ctx {
                    ctx.request_repaint();
                }
            });
        if let Err(e) = spawned {
            self.in_flight -= 1;
            crate::log_err!("Failed to spawn {} worker: {}", label, e);
        }
    }

    /// Fetch bytes on a worker thread, then decode on the rayon pool.
    fn spawn_image<F>(&mut self, label: &str, fetch_url: String, wrap: F)
    where
        F: FnOnce(Result<RgbaImage, ApiError>) -> ApiEvent + Send + 'static,
    {
        let client = self.client.clone();
        let sender = self.sender.clone();
        let ctx = self.ctx.clone();
        self.in_flight += 1;
        let deliver = move |ev: ApiEvent| {
            let _ = sender.send(ev);
            if let Some(ctx) = ctx {
                ctx.request_repaint();
            }
        };
        let spawned = std::thread::Builder::new()
            .name(format!("api-{label}"))
            .spawn(move || match client.fetch_image(&fetch_url) {
                Ok(bytes) => rayon::spawn(move || {
                    let decoded = decode_rgba(&bytes).map_err(ApiError::from);
                    deliver(wrap(decoded));
                }),
                Err(e) => deliver(wrap(Err(e))),
            });
        if let Err(e) = spawned {
            self.in_flight -= 1;
            crate::log_err!("Failed to spawn {} worker: {}", label, e);
        }
    }

    // -- operations ---------------------------------------------------------

    pub fn load_artists(&mut self) {
        self.spawn("artists", |c| ApiEvent::ArtistsLoaded(c.fetch_artists()));
    }

    pub fn load_options(&mut self, key: &str) {
        let token = self.issue(RequestKind::ArtistOptions);
        let key = key.to_string();
        self.spawn("options", move |c| {
            let result = c.get_options(&key);
            ApiEvent::Options { token, key, result }
        });
    }

    pub fn preview_text(&mut self, req: TextLogoRequest) {
        let token = self.issue(RequestKind::TextPreview);
        self.spawn("preview_text", move |c| {
            let result = c.preview_text(&req).and_then(|logo| {
                let img = decode_rgba(&logo.bytes)?;
                Ok((logo, img))
            });
            ApiEvent::TextPreview { token, result }
        });
    }

    /// Load the image shown in the preview pane. Supersedes earlier loads.
    pub fn load_preview_image(&mut self, url: String) {
        let token = self.issue(RequestKind::PreviewImage);
        log_info!("Dispatch preview_image");
        let fetch_url = url.clone();
        self.spawn_image("preview_image", fetch_url, move |result| ApiEvent::PreviewImage {
            token,
            url,
            result,
        });
    }

    /// Thumbnail cached under `key`, fetched from `fetch_url` (usually the
    /// server's image proxy for the same picture).
    pub fn load_thumbnail(&mut self, key: String, fetch_url: String) {
        self.spawn_image("thumbnail", fetch_url, move |result| ApiEvent::Thumbnail {
            url: key,
            result,
        });
    }

    pub fn load_posters(&mut self, key: &str) {
        let token = self.issue(RequestKind::Posters);
        let key = key.to_string();
        self.spawn("posters", move |c| {
            let result = c.get_posters(&key);
            ApiEvent::Posters { token, key, result }
        });
    }

    pub fn save(&mut self, req: SaveRequest) {
        self.spawn("save", move |c| {
            let result = c.save(&req);
            ApiEvent::Saved {
                key: req.rating_key,
                result,
            }
        });
    }

    pub fn save_custom(&mut self, req: TextLogoRequest) {
        self.spawn("save_custom", move |c| {
            let result = c.save_custom(&req);
            ApiEvent::CustomSaved {
                key: req.rating_key,
                result,
            }
        });
    }

    pub fn toggle_status(&mut self, key: &str) {
        let key = key.to_string();
        self.spawn("toggle_status", move |c| {
            let result = c.toggle_status(&key);
            ApiEvent::StatusToggled { key, result }
        });
    }

    pub fn bulk_apply_fanart(&mut self, keys: Vec<String>) {
        if keys.is_empty() {
            log_warn!("bulk_apply_fanart with no keys");
            return;
        }
        self.spawn("bulk_apply_fanart", move |c| {
            let result = c.bulk_apply_fanart(&keys);
            ApiEvent::BulkApplied { keys, result }
        });
    }

    pub fn bulk_toggle_status(&mut self, keys: Vec<String>) {
        if keys.is_empty() {
            log_warn!("bulk_toggle_status with no keys");
            return;
        }
        self.spawn("bulk_toggle_status", move |c| {
            ApiEvent::BulkToggled(c.bulk_toggle_status(&keys))
        });
    }

    pub fn set_poster(&mut self, key: &str, url: &str) {
        let key = key.to_string();
        let url = url.to_string();
        self.spawn("set_poster", move |c| {
            let result = c.set_poster(&key, &url);
            ApiEvent::PosterSet { key, result }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_token_makes_older_stale() {
        let mut tokens = RequestTokens::default();
        let a = tokens.issue(RequestKind::TextPreview);
        assert!(tokens.is_current(a));
        let b = tokens.issue(RequestKind::TextPreview);
        assert!(!tokens.is_current(a));
        assert!(tokens.is_current(b));
    }

    #[test]
    fn kinds_are_independent() {
        let mut tokens = RequestTokens::default();
        let opts = tokens.issue(RequestKind::ArtistOptions);
        let _ = tokens.issue(RequestKind::Posters);
        assert!(tokens.is_current(opts));
        tokens.invalidate(RequestKind::ArtistOptions);
        assert!(!tokens.is_current(opts));
    }

    #[test]
    fn drain_drops_superseded_results() {
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let mut d = Dispatcher::new(client, None);
        let old = d.issue(RequestKind::ArtistOptions);
        let new = d.issue(RequestKind::ArtistOptions);
        for (token, key) in [(old, "1"), (new, "2")] {
            d.deliver(ApiEvent::Options {
                token,
                key: key.to_string(),
                result: Ok(ArtistOptions::default()),
            });
        }
        d.deliver(ApiEvent::Saved {
            key: "1".to_string(),
            result: Ok(()),
        });

        let events = d.drain();
        assert_eq!(events.len(), 2);
        match &events[0] {
            ApiEvent::Options { key, .. } => assert_eq!(key, "2"),
            _ => panic!("expected options"),
        }
        assert!(matches!(events[1], ApiEvent::Saved { .. }));
        assert!(d.drain().is_empty());
    }
}
