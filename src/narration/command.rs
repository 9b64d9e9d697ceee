use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::audio::decode::decode_audio_file;
use crate::audio::clip::AudioClip;
use crate::foundation::error::{WyrError, WyrResult};
use crate::narration::synth::SpeechSynthesizer;

const POLL: Duration = Duration::from_millis(10);

/// TTS engine driven by an external program.
///
/// Arguments may contain the placeholders `{text}`, `{out}` and `{voice}`. The program must write
/// an audio file to `{out}`; it is decoded through `ffmpeg` to interleaved `f32` PCM. A program
/// still running after `timeout` is killed.
#[derive(Clone, Debug)]
pub struct CommandSynthesizer {
    /// Executable name or path.
    pub program: PathBuf,
    /// Argument template.
    pub args: Vec<String>,
    /// Voice substituted when the request names none.
    pub default_voice: String,
    /// Extension of the file the program writes.
    pub output_extension: String,
    /// Decoded sample rate.
    pub sample_rate: u32,
    /// Decoded channel count.
    pub channels: u16,
    /// Limit on one program run.
    pub timeout: Duration,
}

impl CommandSynthesizer {
    /// Build a synthesizer from a program and argument template (48 kHz stereo output).
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            default_voice: "en".to_owned(),
            output_extension: "wav".to_owned(),
            sample_rate: 48_000,
            channels: 2,
            timeout: Duration::from_secs(60),
        }
    }

    /// `espeak-ng -v {voice} -w {out} {text}`.
    pub fn espeak() -> Self {
        let args = ["-v", "{voice}", "-w", "{out}", "{text}"]
            .map(str::to_owned)
            .to_vec();
        Self {
            default_voice: "en-us".to_owned(),
            ..Self::new("espeak-ng", args)
        }
    }

    fn expand_args(&self, text: &str, out: &str, voice: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| {
                a.replace("{out}", out)
                    .replace("{voice}", voice)
                    .replace("{text}", text)
            })
            .collect()
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    #[tracing::instrument(skip(self, text), fields(program = %self.program.display()))]
    fn synthesize(&self, text: &str, voice: Option<&str>) -> WyrResult<AudioClip> {
        let dir = tempfile::Builder::new()
            .prefix("wyr-tts-")
            .tempdir()
            .context("create TTS scratch dir")?;
        let out = dir.path().join(format!("speech.{}", self.output_extension));
        let out_str = out.to_string_lossy();
        let voice = voice.unwrap_or(&self.default_voice);

        let stderr_path = dir.path().join("stderr.log");
        let stderr = std::fs::File::create(&stderr_path).context("create TTS stderr log")?;

        let mut child = Command::new(&self.program)
            .args(self.expand_args(text, &out_str, voice))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                WyrError::synthesis(format!(
                    "failed to run '{}': {e}",
                    self.program.display()
                ))
            })?;
        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "TTS program killed");
                    return Err(WyrError::timeout(format!(
                        "'{}' did not finish within {:?}",
                        self.program.display(),
                        self.timeout
                    )));
                }
                Ok(None) => std::thread::sleep(POLL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(WyrError::synthesis(format!(
                        "failed to wait for '{}': {e}",
                        self.program.display()
                    )));
                }
            }
        };
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(WyrError::synthesis(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                status,
                stderr.trim()
            )));
        }
        if !out.is_file() {
            return Err(WyrError::synthesis(format!(
                "'{}' did not write '{}'",
                self.program.display(),
                out.display()
            )));
        }

        decode_audio_file(&out, self.sample_rate, self.channels)
            .map_err(|e| WyrError::synthesis(format!("decode synthesized speech: {e}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/narration/command.rs"]
mod tests;
