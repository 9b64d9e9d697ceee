//! Render and orchestrator configuration.
//!
//! A [`render::RenderConfig`] is an immutable value handed to each job; there is no process-wide
//! state.

/// Job pool limits and directories.
pub mod orchestrator;
/// Render configuration types and JSON loading.
pub mod render;
