use std::path::Path;

use anyhow::{Context, anyhow};

use crate::audio::clip::AudioClip;
use crate::foundation::error::WyrResult;

/// Decode any audio file `ffmpeg` understands into interleaved `f32` PCM.
///
/// The stream is resampled to `sample_rate` and remixed to `channels`. A file without an audio
/// stream decodes to an empty clip.
pub fn decode_audio_file(path: &Path, sample_rate: u32, channels: u16) -> WyrResult<AudioClip> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .context("failed to run ffmpeg for audio decode")?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return AudioClip::new(sample_rate, channels, Vec::new());
        }
        return Err(anyhow!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )
        .into());
    }

    AudioClip::new(sample_rate, channels, f32le_to_samples(&out.stdout)?)
}

fn f32le_to_samples(bytes: &[u8]) -> WyrResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(anyhow!("decoded audio byte length is not aligned to f32 samples").into());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/audio/decode.rs"]
mod tests;
