// ============================================================================
// BACKEND CLIENT — typed blocking calls against the artist-logo server
// ============================================================================
//
// Every call reads the body as text first, so a non-2xx reply carrying
// `{status, message}` surfaces its message instead of a bare status code.
// The client is cheap to clone (reqwest shares the connection pool) and is
// handed to background threads by `jobs::Dispatcher`.
// ============================================================================

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::components::artists::{ArtistItem, ArtistStatus};
use crate::ops::text::TextCase;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Rejected(String),
    #[error("invalid image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Message shown to the user; server rejections are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

// -- request payloads -----------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextLogoRequest {
    pub rating_key: String,
    pub font: String,
    pub rows: u32,
    pub color: String,
    pub case: TextCase,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SaveRequest {
    pub rating_key: String,
    pub url: String,
    pub apply_default_size: bool,
    pub invert: bool,
    pub contrast: f32,
    pub zoom: f32,
    pub monochrome: bool,
    pub tint: Option<String>,
    pub make_white: bool,
}

#[derive(Serialize)]
struct ArtistKeys<'a> {
    artist_keys: &'a [String],
}

#[derive(Serialize)]
struct SetPosterRequest<'a> {
    rating_key: &'a str,
    url: &'a str,
}

// -- replies --------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ArtistOptions {
    #[serde(default)]
    pub logos: Vec<String>,
    /// Image-search link for finding a logo by hand.
    #[serde(default)]
    pub google_url: Option<String>,
}

#[derive(Deserialize)]
struct PostersReply {
    #[serde(default)]
    posters: Vec<String>,
}

#[derive(Deserialize)]
struct PreviewTextReply {
    image: String,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    new_status: Option<String>,
    #[serde(default)]
    updated_count: Option<usize>,
    #[serde(default)]
    updated_artists: Vec<UpdatedArtist>,
}

impl StatusReply {
    fn into_success(self) -> Result<Self, ApiError> {
        if self.status == "success" {
            Ok(self)
        } else {
            Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "unknown".to_string()),
            ))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UpdatedArtist {
    pub key: String,
    pub new_status: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Server-rendered text logo: the data URI for display plus the raw JPEG.
#[derive(Clone, Debug)]
pub struct GeneratedLogo {
    pub data_uri: String,
    pub bytes: Vec<u8>,
}

// ============================================================================
// BackendClient
// ============================================================================

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::blocking::Client,
    base: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ArtistLogo/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `/proxy_image?url=…` with the target percent-encoded.
    pub fn proxy_image_url(&self, target: &str) -> Result<String, ApiError> {
        proxy_image_url(&self.base, target)
    }

    /// Main artist image, cache-busted by `nonce`.
    pub fn poster_url(&self, key: &str, nonce: u64) -> String {
        poster_url(&self.base, key, nonce)
    }

    // -- plumbing ---------------------------------------------------------

    fn read_json<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> Result<T, ApiError> {
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.http.get(self.url(path)).send()?;
        Self::read_json(resp)
    }

    fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self.http.post(self.url(path)).json(body).send()?;
        Self::read_json(resp)
    }

    fn post_status<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<StatusReply, ApiError> {
        self.post_json::<B, StatusReply>(path, body)?.into_success()
    }

    // -- endpoints --------------------------------------------------------

    /// Artist list, scraped from the server-rendered index page.
    pub fn fetch_artists(&self) -> Result<Vec<ArtistItem>, ApiError> {
        let resp = self.http.get(self.url("/")).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(scrape_artists(&body))
    }

    pub fn get_options(&self, key: &str) -> Result<ArtistOptions, ApiError> {
        self.get_json(&format!("/get_options/{key}"))
    }

    pub fn get_posters(&self, key: &str) -> Result<Vec<String>, ApiError> {
        let reply: PostersReply = self.get_json(&format!("/get_posters/{key}"))?;
        Ok(reply.posters)
    }

    pub fn preview_text(&self, req: &TextLogoRequest) -> Result<GeneratedLogo, ApiError> {
        let reply: PreviewTextReply = self.post_json("/preview_text", req)?;
        let bytes = STANDARD.decode(reply.image.trim())?;
        Ok(GeneratedLogo {
            data_uri: format!("data:image/jpeg;base64,{}", reply.image.trim()),
            bytes,
        })
    }

    pub fn save_custom(&self, req: &TextLogoRequest) -> Result<(), ApiError> {
        self.post_status("/save_custom", req).map(|_| ())
    }

    pub fn save(&self, req: &SaveRequest) -> Result<(), ApiError> {
        self.post_status("/save", req).map(|_| ())
    }

    pub fn toggle_status(&self, key: &str) -> Result<ArtistStatus, ApiError> {
        let resp = self.http.post(self.url(&format!("/toggle_status/{key}"))).send()?;
        let reply = Self::read_json::<StatusReply>(resp)?.into_success()?;
        Ok(reply
            .new_status
            .as_deref()
            .map(ArtistStatus::parse)
            .unwrap_or_default())
    }

    /// Returns the number of artists the server actually updated.
    pub fn bulk_apply_fanart(&self, keys: &[String]) -> Result<usize, ApiError> {
        let reply = self.post_status("/bulk_apply_fanart", &ArtistKeys { artist_keys: keys })?;
        Ok(reply.updated_count.unwrap_or(0))
    }

    pub fn bulk_toggle_status(&self, keys: &[String]) -> Result<Vec<(String, ArtistStatus)>, ApiError> {
        let reply = self.post_status("/bulk_toggle_status", &ArtistKeys { artist_keys: keys })?;
        Ok(reply
            .updated_artists
            .into_iter()
            .map(|a| {
                let status = ArtistStatus::parse(&a.new_status);
                (a.key, status)
            })
            .collect())
    }

    pub fn set_poster(&self, key: &str, url: &str) -> Result<(), ApiError> {
        self.post_status("/set_poster", &SetPosterRequest { rating_key: key, url })
            .map(|_| ())
    }

    /// Raw bytes of an image. `data:` URIs are decoded locally.
    pub fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        if url.starts_with("data:") {
            return crate::images::decode_data_uri(url)
                .map(|(_, bytes)| bytes)
                .ok_or_else(|| ApiError::InvalidUrl("malformed data URI".to_string()));
        }
        let resp = self.http.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(resp.bytes()?.to_vec())
    }
}

fn error_from_body(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { message }) => {
            ApiError::Rejected(message.unwrap_or_else(|| "unknown".to_string()))
        }
        Err(_) => ApiError::Status(status),
    }
}

pub fn proxy_image_url(base: &str, target: &str) -> Result<String, ApiError> {
    let url = Url::parse_with_params(&format!("{base}/proxy_image"), &[("url", target)])
        .map_err(|e| ApiError::InvalidUrl(format!("{target}: {e}")))?;
    Ok(url.to_string())
}

pub fn poster_url(base: &str, key: &str, nonce: u64) -> String {
    format!("{base}/plex_proxy/{key}?t={nonce}")
}

// ============================================================================
// Index scraping
// ============================================================================

/// Collect every element whose id is `item-{key}` along with its
/// `data-name` and `data-status` attributes, in document order.
pub fn scrape_artists(html: &str) -> Vec<ArtistItem> {
    let mut out = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = tag_end(after) else { break };
        let tag = &after[..end];
        rest = &after[end + 1..];

        let Some(id) = attr(tag, "id") else { continue };
        let Some(key) = id.strip_prefix("item-") else { continue };
        if key.is_empty() {
            continue;
        }
        let name = attr(tag, "data-name").unwrap_or_else(|| key.to_string());
        let status = attr(tag, "data-status")
            .map(|s| ArtistStatus::parse(&s))
            .unwrap_or_default();
        out.push(ArtistItem::new(key, name, status));
    }
    out
}

/// Index of the closing `>` of a tag, skipping over quoted attribute values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Value of attribute `name` inside a tag body, entity-decoded.
fn attr(tag: &str, name: &str) -> Option<String> {
    let bytes = tag.as_bytes();
    let mut search = 0;
    while let Some(pos) = tag[search..].find(name) {
        let at = search + pos;
        search = at + name.len();
        let boundary_ok = at == 0 || bytes[at - 1].is_ascii_whitespace();
        if !boundary_ok {
            continue;
        }
        let tail = tag[at + name.len()..].trim_start();
        let Some(tail) = tail.strip_prefix('=') else { continue };
        let tail = tail.trim_start();
        let value = match tail.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let inner = &tail[1..];
                &inner[..inner.find(q)?]
            }
            Some(_) => tail
                .split(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                .next()
                .unwrap_or(""),
            None => return None,
        };
        return Some(decode_entities(value));
    }
    None
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
        <ul id="artist-list">
          <li class="artist-item" id="item-101" data-name="AC/DC" data-status="done"
              onclick="loadArtist('101', 'AC/DC')">
            <span class="status-dot status-done"></span> AC/DC
          </li>
          <li class="artist-item" id="item-202" data-name="Simon &amp; Garfunkel" data-status="custom">
            Simon &amp; Garfunkel
          </li>
          <li class='artist-item' id='item-303' data-name='Guns N&#39; Roses' data-status=''>x</li>
          <div id="items-header" data-name="not an artist"></div>
        </ul>"#;

    #[test]
    fn scrapes_items_in_document_order() {
        let items = scrape_artists(INDEX);
        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["101", "202", "303"]);
        assert_eq!(items[0].name, "AC/DC");
        assert_eq!(items[0].status, ArtistStatus::Done);
        assert_eq!(items[1].name, "Simon & Garfunkel");
        assert_eq!(items[1].status, ArtistStatus::Custom);
        assert_eq!(items[2].name, "Guns N' Roses");
        assert_eq!(items[2].status, ArtistStatus::None);
        assert!(items.iter().all(|i| !i.selected));
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let html = r#"<li id="item-9" data-name="a > b" data-status="done">"#;
        let items = scrape_artists(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "a > b");
    }

    #[test]
    fn attribute_lookup_respects_word_boundary() {
        assert_eq!(attr(r#"li data-id="x" id="item-1""#, "id").as_deref(), Some("item-1"));
        assert_eq!(attr(r#"li data-status=done"#, "data-status").as_deref(), Some("done"));
        assert_eq!(attr("li", "id"), None);
    }

    #[test]
    fn proxy_url_encodes_target() {
        let url = proxy_image_url("http://srv:5000", "https://a.b/c d.png?x=1&y=2").unwrap();
        assert!(url.starts_with("http://srv:5000/proxy_image?url="));
        assert!(!url.contains("&y=2"));
        assert!(url.contains("https%3A%2F%2Fa.b%2Fc"));
    }

    #[test]
    fn poster_url_carries_nonce() {
        assert_eq!(poster_url("http://s", "42", 7), "http://s/plex_proxy/42?t=7");
    }

    #[test]
    fn error_body_message_is_surfaced() {
        match error_from_body(404, r#"{"status":"error","message":"artist not found"}"#) {
            ApiError::Rejected(m) => assert_eq!(m, "artist not found"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(error_from_body(502, "<html>bad gateway</html>"), ApiError::Status(502)));
        match error_from_body(500, r#"{"status":"error"}"#) {
            ApiError::Rejected(m) => assert_eq!(m, "unknown"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_success_status_is_rejected() {
        let reply: StatusReply =
            serde_json::from_str(r#"{"status":"error","message":"nope"}"#).unwrap();
        assert_eq!(reply.into_success().unwrap_err().user_message(), "nope");
        let ok: StatusReply = serde_json::from_str(
            r#"{"status":"success","updated_count":2,"updated_artists":[{"key":"1","new_status":"custom"}]}"#,
        )
        .unwrap();
        let ok = ok.into_success().unwrap();
        assert_eq!(ok.updated_count, Some(2));
        assert_eq!(ok.updated_artists[0].new_status, "custom");
    }

    #[test]
    fn payloads_serialise_with_wire_names() {
        let save = SaveRequest {
            rating_key: "7".into(),
            url: "https://x/y.png".into(),
            apply_default_size: true,
            invert: false,
            contrast: 1.5,
            zoom: 1.0,
            monochrome: true,
            tint: None,
            make_white: false,
        };
        let v: serde_json::Value = serde_json::to_value(&save).unwrap();
        assert_eq!(v["tint"], serde_json::Value::Null);
        assert_eq!(v["contrast"], 1.5);
        assert_eq!(v["rating_key"], "7");

        let text = TextLogoRequest {
            rating_key: "7".into(),
            font: "Anton".into(),
            rows: 2,
            color: "#FFFFFF".into(),
            case: TextCase::Lower,
        };
        let v: serde_json::Value = serde_json::to_value(&text).unwrap();
        assert_eq!(v["case"], "lower");
        assert_eq!(v["rows"], 2);
    }

    #[test]
    fn client_rejects_bad_base_url() {
        assert!(matches!(BackendClient::new("not a url"), Err(ApiError::InvalidUrl(_))));
        let c = BackendClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(c.base_url(), "http://127.0.0.1:5000");
    }
}
