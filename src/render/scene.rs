use std::sync::Arc;

use crate::animation::timeline::Timeline;
use crate::assets::decode::{PreparedImage, cover_canvas, decode_rgba};
use crate::assets::store::{FontAsset, ShapedText, TextLayoutEngine};
use crate::config::render::{Background, RenderConfig};
use crate::foundation::core::{Canvas, Fps, Point, Rect};
use crate::foundation::error::{WyrError, WyrResult};
use crate::layout::resolver::{ResolvedLayout, Slot};
use crate::results::percentages::{BarGeometry, Percentages, bar_geometry};

/// Background layer source.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Plate {
    Solid([u8; 4]),
    Image(PreparedImage),
}

/// Shaped text positioned on the canvas.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TextBlock {
    pub(crate) shaped: ShapedText,
    pub(crate) origin: Point,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TextStyle {
    pub(crate) fill: [u8; 4],
    pub(crate) stroke: [u8; 4],
    pub(crate) stroke_width: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResultsLayer {
    pub(crate) percentages: Percentages,
    pub(crate) panel: [u8; 4],
    pub(crate) track: [u8; 4],
    pub(crate) bars: [[u8; 4]; 2],
    pub(crate) geometry: [BarGeometry; 2],
    pub(crate) labels: Option<[TextBlock; 2]>,
}

/// Everything a compositor needs to draw any frame of one job.
///
/// Built once per job and shared read-only between render workers.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedScene {
    /// Output canvas.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Frames in the video.
    pub frame_count: u64,
    /// Time-to-state mapping.
    pub timeline: Timeline,
    pub(crate) plate: Plate,
    pub(crate) layout: ResolvedLayout,
    pub(crate) font: Option<Arc<Vec<u8>>>,
    pub(crate) text_style: TextStyle,
    pub(crate) captions: Option<[TextBlock; 2]>,
    pub(crate) results: Option<ResultsLayer>,
}

/// Inputs for [`PreparedScene::prepare`].
pub struct SceneInputs<'a> {
    /// Render configuration.
    pub cfg: &'a RenderConfig,
    /// Resolved image placement.
    pub layout: ResolvedLayout,
    /// Upper and lower caption text.
    pub captions: [&'a str; 2],
    /// Results overlay values, if shown.
    pub percentages: Option<Percentages>,
    /// Duration of synthesized narration, if any.
    pub narration_secs: Option<f64>,
    /// Caption font; `None` renders without text.
    pub font: Option<&'a FontAsset>,
}

impl PreparedScene {
    /// Shape text, load the background and fix the timeline.
    #[tracing::instrument(skip_all)]
    pub fn prepare(inputs: SceneInputs<'_>) -> WyrResult<Self> {
        let SceneInputs {
            cfg,
            layout,
            captions,
            percentages,
            narration_secs,
            font,
        } = inputs;
        let s = cfg.px_scale();
        let timeline = Timeline::new(cfg, percentages.is_some(), narration_secs);
        let frame_count = timeline.phases.frame_count(cfg.fps);

        let plate = match &cfg.background {
            Background::Color { rgba } => Plate::Solid(*rgba),
            Background::Image { path } => {
                let bytes = std::fs::read(path).map_err(|e| {
                    WyrError::validation(format!(
                        "failed to read background '{}': {e}",
                        path.display()
                    ))
                })?;
                Plate::Image(cover_canvas(&decode_rgba(&bytes)?, cfg.canvas))
            }
        };

        let mut engine = TextLayoutEngine::new();
        let caption_size = (f64::from(cfg.caption.font_size_px) * s) as f32;
        let captions = match font {
            Some(font) => {
                let mut shape = |slot: Slot| -> WyrResult<TextBlock> {
                    let anchor = layout.slot(slot).caption;
                    let shaped = engine.shape_centered(
                        captions[slot.index()],
                        &font.bytes,
                        caption_size,
                        anchor.width as f32,
                    )?;
                    Ok(TextBlock {
                        shaped,
                        origin: Point::new(anchor.x, anchor.top),
                    })
                };
                Some([shape(Slot::Upper)?, shape(Slot::Lower)?])
            }
            None => None,
        };

        let results = match percentages {
            Some(p) => {
                let geometry = [
                    bar_geometry(cfg, p, Slot::Upper),
                    bar_geometry(cfg, p, Slot::Lower),
                ];
                let labels = match font {
                    Some(font) => {
                        let size = (f64::from(cfg.results.label_font_size_px) * s) as f32;
                        let mut label = |slot: Slot| -> WyrResult<TextBlock> {
                            let g = geometry[slot.index()];
                            let shaped = engine.shape_centered(
                                &p.label(slot),
                                &font.bytes,
                                size,
                                g.track.width() as f32,
                            )?;
                            let top = g.label_bottom - f64::from(shaped.height);
                            Ok(TextBlock {
                                shaped,
                                origin: Point::new(g.track.x0, top),
                            })
                        };
                        Some([label(Slot::Upper)?, label(Slot::Lower)?])
                    }
                    None => None,
                };
                Some(ResultsLayer {
                    percentages: p,
                    panel: cfg.results.panel_rgba,
                    track: cfg.results.track_rgba,
                    bars: cfg.results.bar_rgba,
                    geometry,
                    labels,
                })
            }
            None => None,
        };

        tracing::debug!(
            frame_count,
            total_secs = timeline.phases.total,
            has_text = font.is_some(),
            has_results = results.is_some(),
            "prepared scene"
        );
        Ok(Self {
            canvas: cfg.canvas,
            fps: cfg.fps,
            frame_count,
            timeline,
            plate,
            layout,
            font: font.map(|f| f.bytes.clone()),
            text_style: TextStyle {
                fill: cfg.caption.fill_rgba,
                stroke: cfg.caption.stroke_rgba,
                stroke_width: f64::from(cfg.caption.stroke_width_px) * s,
            },
            captions,
            results,
        })
    }

    /// Placement of one option image at rest.
    pub fn placement(&self, slot: Slot) -> Rect {
        self.layout.slot(slot).placement
    }

    /// Whether caption and label text will be drawn.
    pub fn has_text(&self) -> bool {
        self.font.is_some()
    }

    /// Results overlay values, if shown.
    pub fn percentages(&self) -> Option<Percentages> {
        self.results.as_ref().map(|r| r.percentages)
    }
}
