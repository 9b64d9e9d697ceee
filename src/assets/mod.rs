//! Decoded images and shaped text.

/// Raster decode, resampling and background cover.
pub mod decode;
/// Caption fonts and Parley text shaping.
pub mod store;
