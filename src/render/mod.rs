//! Frame composition and the multi-frame render pipeline.

/// CPU compositor (`vello_cpu`) that draws one frame of a prepared scene.
pub mod compositor;
/// Rendered frame buffers.
pub mod frame;
/// Parallel render-to-writer pipeline.
pub mod pipeline;
/// Per-job scene preparation.
pub mod scene;
