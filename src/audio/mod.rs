//! Narration PCM handling.

/// In-memory PCM clips, fitting and raw export.
pub mod clip;
/// Decoding audio files through `ffmpeg`.
pub mod decode;
