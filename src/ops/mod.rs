pub mod text;
pub mod transform;
