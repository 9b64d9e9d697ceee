//! wyr renders "would you rather" short-form videos.
//!
//! A [`VideoRequest`] (two images, two captions, optional percentages and narration) becomes a
//! vertical H.264/AAC MP4. The public API is job-oriented:
//!
//! - Start an [`Orchestrator`] with a [`Codec`] and, optionally, a [`SpeechSynthesizer`]
//! - [`Orchestrator::submit`] a request and keep the [`JobHandle`]
//! - [`Orchestrator::poll`] or [`Orchestrator::wait`] for the [`JobStatus`]
//!
//! Frames are composited on the CPU with `vello_cpu`, in parallel on a `rayon` pool, and streamed
//! in presentation order into the codec.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Time to visual-state mapping.
pub mod animation;
/// Image decoding and caption text shaping.
pub mod assets;
/// Narration PCM handling.
pub mod audio;
/// Render and orchestrator configuration.
pub mod config;
/// Encoding sinks.
pub mod encode;
/// Job lifecycle and orchestration.
pub mod job;
/// Slot layout.
pub mod layout;
/// Spoken narration.
pub mod narration;
/// Frame composition and the render pipeline.
pub mod render;
/// Request boundary types.
pub mod request;
/// Vote percentages.
pub mod results;

pub use crate::foundation::core::{
    Affine, Canvas, Fps, FrameIndex, Point, Rect, Size, Vec2,
};
pub use crate::foundation::error::{ErrorKind, WyrError, WyrResult};

pub use crate::audio::clip::AudioClip;
pub use crate::config::orchestrator::OrchestratorConfig;
pub use crate::config::render::RenderConfig;
pub use crate::encode::ffmpeg::FfmpegCodec;
pub use crate::encode::writer::{Codec, InMemoryCodec, SinkConfig, VideoWriter, WriterAbort};
pub use crate::job::orchestrator::Orchestrator;
pub use crate::job::render_job::build_scene;
pub use crate::job::status::{JobFailure, JobHandle, JobId, JobState, JobStatus};
pub use crate::layout::resolver::Slot;
pub use crate::narration::command::CommandSynthesizer;
pub use crate::narration::synth::{SpeechSynthesizer, narration_line};
pub use crate::render::compositor::CompositorWorker;
pub use crate::render::frame::Frame;
pub use crate::render::scene::PreparedScene;
pub use crate::request::model::{
    ImageSource, NarrationSpec, OptionInput, PercentageSpec, VideoRequest,
};
pub use crate::results::percentages::Percentages;
