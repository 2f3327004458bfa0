//! ArtistLogo: desktop client for the artist-logo backend, plus a headless
//! renderer for the save-time logo transform.

#[macro_use]
pub mod logger;

pub mod api;
pub mod app;
pub mod cli;
pub mod components;
pub mod compositor;
pub mod images;
pub mod input;
pub mod jobs;
pub mod notifications;
pub mod ops;
pub mod paths;
pub mod session;
pub mod settings;
pub mod theme;
