pub mod artists;
pub mod colors;
pub mod gallery;
pub mod lightbox;
