//! Encoding sinks.
//!
//! Writers consume rendered frames in presentation order; the job wraps them in a
//! [`timed::TimeBoxedWriter`] and commits the result through [`commit::PartialOutput`].

/// Atomic output commit.
pub mod commit;
/// `ffmpeg`-based codec (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Time-boxed writer wrapper.
pub mod timed;
/// Codec and writer traits plus the in-memory codec.
pub mod writer;
