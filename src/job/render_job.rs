use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use crate::assets::store::{FontAsset, resolve_caption_font};
use crate::audio::clip::AudioClip;
use crate::config::render::RenderConfig;
use crate::encode::commit::PartialOutput;
use crate::encode::timed::TimeBoxedWriter;
use crate::encode::writer::{Codec, SinkConfig, VideoWriter};
use crate::foundation::error::{WyrError, WyrResult};
use crate::job::status::{JobState, Stage};
use crate::layout::resolver::{ResolvedLayout, resolve_layout};
use crate::narration::synth::Narrator;
use crate::render::pipeline::{RenderControl, render_to_writer};
use crate::render::scene::{PreparedScene, SceneInputs};
use crate::request::model::VideoRequest;
use crate::results::percentages::{self, Percentages};

/// Receives state transitions and frame progress from a running job.
pub(crate) trait StatusSink: Sync {
    fn stage(&self, state: JobState, stage: Stage);
    fn frames(&self, done: u64, total: u64);
}

/// Collaborators and limits for one job run.
pub(crate) struct JobEnv<'a> {
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) narrator: Option<&'a Narrator>,
    pub(crate) codec_call_timeout: Duration,
    pub(crate) deadline: Option<Instant>,
    pub(crate) cancel: &'a AtomicBool,
    pub(crate) work_dir: &'a Path,
    pub(crate) output: &'a Path,
}

/// Decode images, resolve percentages and the caption font, and prepare the scene.
///
/// `narration_secs` stretches the timeline to fit spoken audio.
pub fn build_scene(
    request: &VideoRequest,
    cfg: &RenderConfig,
    narration_secs: Option<f64>,
) -> WyrResult<PreparedScene> {
    prepare_scene(resolve_parts(request, cfg)?, request, cfg, narration_secs)
}

struct SceneParts {
    layout: ResolvedLayout,
    percentages: Option<Percentages>,
    font: Option<FontAsset>,
}

fn resolve_parts(request: &VideoRequest, cfg: &RenderConfig) -> WyrResult<SceneParts> {
    let layout = resolve_layout(&request.upper.image, &request.lower.image, cfg)?;
    let percentages = request
        .percentages
        .map(|spec| percentages::resolve(spec, cfg.auto_percent_range))
        .transpose()?;
    let font = resolve_caption_font(&cfg.caption)?;
    Ok(SceneParts {
        layout,
        percentages,
        font,
    })
}

fn prepare_scene(
    parts: SceneParts,
    request: &VideoRequest,
    cfg: &RenderConfig,
    narration_secs: Option<f64>,
) -> WyrResult<PreparedScene> {
    PreparedScene::prepare(SceneInputs {
        cfg,
        layout: parts.layout,
        captions: [&request.upper.caption, &request.lower.caption],
        percentages: parts.percentages,
        narration_secs,
        font: parts.font.as_ref(),
    })
}

/// Run one job to a committed output file.
#[tracing::instrument(skip_all, fields(output = %env.output.display()))]
pub(crate) fn run(
    request: &VideoRequest,
    cfg: &RenderConfig,
    env: &JobEnv<'_>,
    sink: &dyn StatusSink,
) -> WyrResult<PathBuf> {
    let no_frames = |_: u64, _: u64| {};
    let gate = RenderControl {
        cancel: env.cancel,
        deadline: env.deadline,
        on_frame: &no_frames,
    };

    sink.stage(JobState::Validating, Stage::Initializing);
    gate.check()?;

    sink.stage(JobState::Validating, Stage::ProcessingImages);
    let parts = resolve_parts(request, cfg)?;
    gate.check()?;

    let narration = match &request.narration {
        Some(spec) if spec.enabled => {
            sink.stage(JobState::Validating, Stage::Narration);
            let captions = [request.upper.caption.as_str(), request.lower.caption.as_str()];
            match env.narrator {
                Some(n) => n.narrate(spec, captions, env.deadline)?,
                None if spec.required => {
                    return Err(WyrError::synthesis("no speech synthesizer configured"));
                }
                None => {
                    tracing::warn!("narration requested but no synthesizer configured");
                    None
                }
            }
        }
        _ => None,
    };
    gate.check()?;

    let narration_secs = narration.as_ref().map(AudioClip::duration_secs);
    let scene = Arc::new(prepare_scene(parts, request, cfg, narration_secs)?);
    tracing::info!(
        frames = scene.frame_count,
        secs = scene.timeline.phases.total,
        narrated = narration.is_some(),
        "scene prepared"
    );

    sink.stage(JobState::Rendering, Stage::StartRendering);
    let partial = PartialOutput::new(env.output)?;
    let encoded = env.work_dir.join("encoded.mp4");
    let mut writer = Box::new(TimeBoxedWriter::open(
        env.codec.clone(),
        &encoded,
        SinkConfig {
            width: scene.canvas.width,
            height: scene.canvas.height,
            fps: scene.fps,
        },
        env.work_dir,
        env.codec_call_timeout,
        env.deadline,
    )?);

    let on_frame = |done: u64, total: u64| sink.frames(done, total);
    let control = RenderControl {
        cancel: env.cancel,
        deadline: env.deadline,
        on_frame: &on_frame,
    };
    render_to_writer(&scene, &cfg.threading, &control, writer.as_mut())?;
    control.check()?;

    sink.stage(JobState::Encoding, Stage::Finalizing);
    if let Some(clip) = &narration {
        let fitted = clip.fit_to_video(cfg.narration.lead_in_secs, scene.frame_count, scene.fps);
        writer.attach_audio(&fitted)?;
    }
    let written = writer.finalize()?;
    partial.commit(&written)
}

#[cfg(test)]
#[path = "../../tests/unit/job/render_job.rs"]
mod tests;
