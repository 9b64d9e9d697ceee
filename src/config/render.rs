use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{WyrError, WyrResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Width, in pixels, that all pixel-valued style settings are authored against.
///
/// Lengths are scaled by `canvas.width / REFERENCE_WIDTH_PX` so the same config renders the same
/// picture at any 9:16 resolution.
pub const REFERENCE_WIDTH_PX: f64 = 1080.0;

/// Immutable render configuration passed into a job at creation.
///
/// Every field has a default matching the production short format (1080x1920 at 30 fps, 10 s),
/// so JSON files only need the keys they override.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Output canvas (must be 9:16).
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Video length without narration.
    pub base_duration_secs: f64,
    /// Length of the entrance and exit animations.
    pub animation_duration_secs: f64,
    /// Length of the results phase when percentages are shown.
    pub results_duration_secs: f64,
    /// Time at which captions start fading in.
    pub caption_start_secs: f64,
    /// Scale images start their entrance at.
    pub entrance_scale_from: f64,
    /// Rotation (degrees) images start their entrance at.
    pub entrance_rotation_deg: f64,
    /// Maximum image width/height, in reference pixels.
    pub max_image_dimension: u32,
    /// Inset of each image slot from the canvas edges and center line, in reference pixels.
    pub slot_margin_px: f64,
    /// Caption text styling.
    pub caption: CaptionStyle,
    /// Results overlay styling.
    pub results: ResultsStyle,
    /// Background plate.
    pub background: Background,
    /// Narration placement inside the audio track.
    pub narration: NarrationTiming,
    /// Inclusive range for auto-generated first percentages.
    pub auto_percent_range: [u8; 2],
    /// Frame-level parallelism controls.
    pub threading: RenderThreading,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::PORTRAIT_1080,
            fps: Fps { num: 30, den: 1 },
            base_duration_secs: 10.0,
            animation_duration_secs: 0.3,
            results_duration_secs: 1.0,
            caption_start_secs: 1.0,
            entrance_scale_from: 0.8,
            entrance_rotation_deg: 90.0,
            max_image_dimension: 500,
            slot_margin_px: 40.0,
            caption: CaptionStyle::default(),
            results: ResultsStyle::default(),
            background: Background::default(),
            narration: NarrationTiming::default(),
            auto_percent_range: [1, 99],
            threading: RenderThreading::default(),
        }
    }
}

/// Caption text styling. Pixel values are reference pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionStyle {
    /// Font file. `None` searches well-known system locations for a bold sans font.
    pub font_path: Option<PathBuf>,
    /// Font size.
    pub font_size_px: f32,
    /// Fill color (straight RGBA8).
    pub fill_rgba: [u8; 4],
    /// Outline color (straight RGBA8).
    pub stroke_rgba: [u8; 4],
    /// Outline width.
    pub stroke_width_px: f32,
    /// Top of the upper/lower caption block relative to the canvas center line.
    pub offsets_px: [f64; 2],
    /// Horizontal padding kept free on both sides when wrapping.
    pub side_padding_px: f64,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size_px: 100.0,
            fill_rgba: [255, 255, 255, 255],
            stroke_rgba: [0, 0, 0, 255],
            stroke_width_px: 4.0,
            offsets_px: [-200.0, 40.0],
            side_padding_px: 40.0,
        }
    }
}

/// Results overlay styling. Pixel values are reference pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResultsStyle {
    /// Dimming panel drawn over the whole canvas (straight RGBA8).
    pub panel_rgba: [u8; 4],
    /// Bar colors for the upper and lower option.
    pub bar_rgba: [[u8; 4]; 2],
    /// Unfilled bar track color.
    pub track_rgba: [u8; 4],
    /// Bar thickness.
    pub bar_height_px: f64,
    /// Width of a 100% bar as a fraction of the canvas width.
    pub bar_max_width_frac: f64,
    /// Percentage label font size.
    pub label_font_size_px: f32,
}

impl Default for ResultsStyle {
    fn default() -> Self {
        Self {
            panel_rgba: [0, 0, 0, 150],
            bar_rgba: [[229, 57, 53, 255], [30, 136, 229, 255]],
            track_rgba: [255, 255, 255, 64],
            bar_height_px: 72.0,
            bar_max_width_frac: 0.8,
            label_font_size_px: 120.0,
        }
    }
}

/// Background plate drawn under everything else.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Background {
    /// Solid straight-alpha RGBA8 color.
    Color {
        /// Fill color.
        rgba: [u8; 4],
    },
    /// Image file scaled to cover the canvas.
    Image {
        /// Image path.
        path: PathBuf,
    },
}

impl Default for Background {
    fn default() -> Self {
        Self::Color {
            rgba: [24, 24, 32, 255],
        }
    }
}

/// Narration placement and PCM format.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NarrationTiming {
    /// Silence before the narration starts.
    pub lead_in_secs: f64,
    /// Silence kept after the narration ends.
    pub lead_out_secs: f64,
    /// Mixing/encoding sample rate.
    pub sample_rate: u32,
    /// Mixing/encoding channel count.
    pub channels: u16,
}

impl NarrationTiming {
    /// Total padding added around the narration when extending the video.
    pub fn padding_secs(&self) -> f64 {
        self.lead_in_secs + self.lead_out_secs
    }
}

impl Default for NarrationTiming {
    fn default() -> Self {
        Self {
            lead_in_secs: 0.5,
            lead_out_secs: 0.5,
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// Threading and chunking controls for multi-frame rendering.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderThreading {
    /// Render frames on a rayon pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
    /// Frames scheduled per parallel batch.
    pub chunk_size: usize,
    /// Bounded channel capacity between render workers and the encoder thread.
    pub channel_capacity: usize,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            chunk_size: 32,
            channel_capacity: 8,
        }
    }
}

impl RenderConfig {
    /// Parse a config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> WyrResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| WyrError::serde(format!("parse render config JSON: {e}")))
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> WyrResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            WyrError::validation(format!("open render config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Multiplier from reference pixels to canvas pixels.
    pub fn px_scale(&self) -> f64 {
        f64::from(self.canvas.width) / REFERENCE_WIDTH_PX
    }

    /// Check internal consistency.
    pub fn validate(&self) -> WyrResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps.num, self.fps.den)?;

        let secs = [
            ("base_duration_secs", self.base_duration_secs),
            ("animation_duration_secs", self.animation_duration_secs),
            ("results_duration_secs", self.results_duration_secs),
            ("caption_start_secs", self.caption_start_secs),
            ("narration.lead_in_secs", self.narration.lead_in_secs),
            ("narration.lead_out_secs", self.narration.lead_out_secs),
        ];
        for (name, v) in secs {
            if !v.is_finite() || v < 0.0 {
                return Err(WyrError::validation(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if self.base_duration_secs <= 0.0 {
            return Err(WyrError::validation("base_duration_secs must be > 0"));
        }
        if !(self.entrance_scale_from.is_finite() && self.entrance_scale_from > 0.0) {
            return Err(WyrError::validation("entrance_scale_from must be > 0"));
        }
        if !self.entrance_rotation_deg.is_finite() {
            return Err(WyrError::validation("entrance_rotation_deg must be finite"));
        }
        if self.max_image_dimension == 0 {
            return Err(WyrError::validation("max_image_dimension must be > 0"));
        }
        if !(self.slot_margin_px.is_finite() && self.slot_margin_px >= 0.0) {
            return Err(WyrError::validation("slot_margin_px must be >= 0"));
        }
        if !(self.caption.font_size_px.is_finite() && self.caption.font_size_px > 0.0) {
            return Err(WyrError::validation("caption.font_size_px must be > 0"));
        }
        if !(self.caption.stroke_width_px.is_finite() && self.caption.stroke_width_px >= 0.0) {
            return Err(WyrError::validation("caption.stroke_width_px must be >= 0"));
        }
        if !(self.results.label_font_size_px.is_finite() && self.results.label_font_size_px > 0.0)
        {
            return Err(WyrError::validation("results.label_font_size_px must be > 0"));
        }
        if !(self.results.bar_max_width_frac > 0.0 && self.results.bar_max_width_frac <= 1.0) {
            return Err(WyrError::validation(
                "results.bar_max_width_frac must be in (0, 1]",
            ));
        }
        let [lo, hi] = self.auto_percent_range;
        if lo < 1 || hi > 99 || lo > hi {
            return Err(WyrError::validation(format!(
                "auto_percent_range must satisfy 1 <= lo <= hi <= 99, got [{lo}, {hi}]"
            )));
        }
        if self.narration.sample_rate == 0 || self.narration.channels == 0 {
            return Err(WyrError::validation(
                "narration sample_rate/channels must be non-zero",
            ));
        }
        if let Some(0) = self.threading.threads {
            return Err(WyrError::validation(
                "threading.threads must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/render.rs"]
mod tests;
