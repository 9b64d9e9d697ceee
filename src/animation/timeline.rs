use crate::animation::ease::{Ease, span_progress};
use crate::config::render::RenderConfig;
use crate::foundation::core::{Canvas, Fps, Rect, Vec2};
use crate::foundation::math::lerp;
use crate::layout::resolver::Slot;

/// Half-open time interval `[start, end)` in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PhaseSpan {
    /// Inclusive start.
    pub start: f64,
    /// Exclusive end.
    pub end: f64,
}

impl PhaseSpan {
    fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Span length.
    pub fn duration(self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` falls inside the span.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Ordered, non-overlapping phases covering `[0, total)`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct TimelinePhases {
    /// Total video duration.
    pub total: f64,
    /// Images fly in.
    pub entrance: PhaseSpan,
    /// Everything at rest. Absorbs all duration extension.
    pub hold: PhaseSpan,
    /// Results overlay, when percentages are shown.
    pub results: Option<PhaseSpan>,
    /// Images fly out.
    pub exit: PhaseSpan,
}

impl TimelinePhases {
    /// Lay out phases for a job.
    ///
    /// `narration_secs` is the length of a successfully synthesized narration clip.
    pub fn resolve(cfg: &RenderConfig, has_results: bool, narration_secs: Option<f64>) -> Self {
        let entrance = cfg.animation_duration_secs;
        let exit = cfg.animation_duration_secs;
        let results = if has_results {
            cfg.results_duration_secs
        } else {
            0.0
        };

        let mut total = cfg.base_duration_secs.max(entrance + exit + results);
        if let Some(n) = narration_secs.filter(|n| n.is_finite() && *n > 0.0) {
            total = total.max(n + cfg.narration.padding_secs());
        }

        let exit_start = total - exit;
        let hold_end = exit_start - results;
        Self {
            total,
            entrance: PhaseSpan::new(0.0, entrance),
            hold: PhaseSpan::new(entrance, hold_end.max(entrance)),
            results: has_results.then(|| PhaseSpan::new(hold_end, exit_start)),
            exit: PhaseSpan::new(exit_start, total),
        }
    }

    /// Number of frames, `round(total * fps)`.
    pub fn frame_count(&self, fps: Fps) -> u64 {
        fps.secs_to_frames_round(self.total)
    }
}

/// Visual state of an image relative to its resting placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementState {
    /// Translation from the resting placement, in pixels.
    pub offset: Vec2,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Uniform scale about the placement center.
    pub scale: f64,
    /// Rotation about the placement center, in radians.
    pub rotation: f64,
}

impl ElementState {
    /// Fully visible, at rest.
    pub const REST: ElementState = ElementState {
        offset: Vec2::ZERO,
        opacity: 1.0,
        scale: 1.0,
        rotation: 0.0,
    };
}

/// Results overlay state while the results phase is active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResultsState {
    /// Bar fill fraction of each bar's target length.
    pub bar_progress: f64,
    /// Label opacity.
    pub label_opacity: f64,
}

/// Pure time-to-state mapping for one job.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    /// Resolved phases.
    pub phases: TimelinePhases,
    canvas: Canvas,
    fade_secs: f64,
    caption_start: f64,
    scale_from: f64,
    rotation_from: f64,
}

impl Timeline {
    /// Build the timeline for a job.
    pub fn new(cfg: &RenderConfig, has_results: bool, narration_secs: Option<f64>) -> Self {
        let phases = TimelinePhases::resolve(cfg, has_results, narration_secs);
        let fade_secs = cfg.animation_duration_secs;
        let hold_end = phases.hold.end;
        let caption_start = cfg
            .caption_start_secs
            .min((hold_end - fade_secs).max(phases.entrance.end));
        Self {
            phases,
            canvas: cfg.canvas,
            fade_secs,
            caption_start,
            scale_from: cfg.entrance_scale_from,
            rotation_from: cfg.entrance_rotation_deg.to_radians(),
        }
    }

    /// Time sampled by frame `i`.
    pub fn frame_time(fps: Fps, i: u64) -> f64 {
        fps.frames_to_secs(i)
    }

    /// Image state at `t` for an image resting at `placement`.
    ///
    /// The upper image travels to just above the canvas, the lower to just below it.
    pub fn image_state(&self, slot: Slot, placement: Rect, t: f64) -> ElementState {
        let travel = match slot {
            Slot::Upper => -placement.max_y(),
            Slot::Lower => f64::from(self.canvas.height) - placement.min_y(),
        };
        let away = self.away_amount(t);
        if away <= 0.0 {
            return ElementState::REST;
        }
        ElementState {
            offset: Vec2::new(0.0, travel * away),
            opacity: 1.0 - away,
            scale: lerp(1.0, self.scale_from, away),
            rotation: lerp(0.0, self.rotation_from, away),
        }
    }

    /// 1 when fully off-canvas, 0 when at rest.
    fn away_amount(&self, t: f64) -> f64 {
        let p = &self.phases;
        if t < p.entrance.end {
            1.0 - Ease::OutCubic.apply(span_progress(t, p.entrance.start, p.entrance.duration()))
        } else if t >= p.exit.start {
            Ease::InCubic.apply(span_progress(t, p.exit.start, p.exit.duration()))
        } else {
            0.0
        }
    }

    /// Caption opacity at `t`.
    pub fn caption_opacity(&self, t: f64) -> f64 {
        let fade_in = Ease::Linear.apply(span_progress(t, self.caption_start, self.fade_secs));
        let p = &self.phases;
        let fade_out = if t >= p.exit.start {
            Ease::InCubic.apply(span_progress(t, p.exit.start, p.exit.duration()))
        } else {
            0.0
        };
        fade_in * (1.0 - fade_out)
    }

    /// Results overlay state, `None` outside the results phase.
    pub fn results_state(&self, t: f64) -> Option<ResultsState> {
        let span = self.phases.results?;
        if !span.contains(t) {
            return None;
        }
        let p = span_progress(t, span.start, span.duration());
        Some(ResultsState {
            bar_progress: Ease::OutCubic.apply(p),
            label_opacity: Ease::Linear.apply(p),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/timeline.rs"]
mod tests;
