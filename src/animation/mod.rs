//! Time to visual-state mapping.

/// Easing curves.
pub mod ease;
/// Phase layout and per-element state sampling.
pub mod timeline;
