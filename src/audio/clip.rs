use std::path::Path;
use std::sync::Arc;

use crate::foundation::core::Fps;
use crate::foundation::error::{WyrError, WyrResult};

/// Interleaved `f32` PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioClip {
    sample_rate: u32,
    channels: u16,
    samples: Arc<[f32]>,
}

impl AudioClip {
    /// Wrap interleaved samples.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> WyrResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(WyrError::validation(
                "audio sample_rate and channels must be non-zero",
            ));
        }
        if !samples.len().is_multiple_of(usize::from(channels)) {
            return Err(WyrError::validation(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples: samples.into(),
        })
    }

    /// Silent clip of `frames` sample frames.
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> WyrResult<Self> {
        Self::new(
            sample_rate,
            channels,
            vec![0.0; frames * usize::from(channels)],
        )
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// `true` when the clip holds no sound at all.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Place the clip on the video timeline.
    ///
    /// Prepends `lead_in_secs` of silence, then pads with silence or trims so the result lasts
    /// exactly `video_frames / fps` seconds, rounded to the nearest sample frame.
    pub fn fit_to_video(&self, lead_in_secs: f64, video_frames: u64, fps: Fps) -> Self {
        let ch = usize::from(self.channels);
        let sr = u128::from(self.sample_rate);
        let target_frames = ((u128::from(video_frames) * u128::from(fps.den) * sr
            + u128::from(fps.num) / 2)
            / u128::from(fps.num)) as usize;
        let lead_frames = (lead_in_secs.max(0.0) * f64::from(self.sample_rate)).round() as usize;

        let mut out = Vec::with_capacity(target_frames * ch);
        out.resize(lead_frames.min(target_frames) * ch, 0.0);
        let room = target_frames * ch - out.len();
        out.extend_from_slice(&self.samples[..self.samples.len().min(room)]);
        out.resize(target_frames * ch, 0.0);

        Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: out.into(),
        }
    }

    /// Write raw little-endian `f32` interleaved PCM.
    ///
    /// The parent directory must already exist.
    pub fn write_f32le(&self, out_path: &Path) -> WyrResult<()> {
        let mut bytes = Vec::<u8>::with_capacity(self.samples.len() * 4);
        for &sample in self.samples.iter() {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(out_path, bytes).map_err(|e| {
            WyrError::encode(format!(
                "failed to write audio file '{}': {e}",
                out_path.display()
            ))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/clip.rs"]
mod tests;
