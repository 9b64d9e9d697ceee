use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crate::audio::clip::AudioClip;
use crate::foundation::error::{WyrError, WyrResult};
use crate::request::model::NarrationSpec;

/// Text-to-speech engine.
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text`, optionally with an engine-specific `voice`.
    fn synthesize(&self, text: &str, voice: Option<&str>) -> WyrResult<AudioClip>;
}

/// The line read out for a pair of captions.
pub fn narration_line(upper: &str, lower: &str) -> String {
    format!("Would you rather {}, or {}?", upper.trim(), lower.trim())
}

/// Runs each [`SpeechSynthesizer`] call on a fresh thread and bounds it.
///
/// A call that times out is abandoned on its own thread, so a hung engine call never delays the
/// next one.
pub struct Narrator {
    synth: Arc<dyn SpeechSynthesizer>,
    timeout: Duration,
}

impl Narrator {
    /// Create a narrator that waits at most `timeout` per call.
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, timeout: Duration) -> Self {
        Self { synth, timeout }
    }

    /// Synthesize `text`, failing if the engine errors, returns no audio or does not answer
    /// within the time box (also capped by `deadline`).
    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    pub fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        deadline: Option<Instant>,
    ) -> WyrResult<AudioClip> {
        let (tx, rx) = mpsc::sync_channel(1);
        let synth = self.synth.clone();
        let text = text.to_owned();
        let voice = voice.map(str::to_owned);
        std::thread::Builder::new()
            .name("wyr-narration".to_owned())
            .spawn(move || {
                let _ = tx.send(synth.synthesize(&text, voice.as_deref()));
            })
            .map_err(|e| WyrError::synthesis(format!("spawn narration thread: {e}")))?;

        let mut wait = self.timeout;
        if let Some(d) = deadline {
            wait = wait.min(d.saturating_duration_since(Instant::now()));
        }
        let clip = match rx.recv_timeout(wait) {
            Ok(res) => res?,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(WyrError::timeout(format!(
                    "speech synthesis did not finish within {wait:?}"
                )));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(WyrError::synthesis("speech synthesis worker exited"));
            }
        };
        if clip.is_empty() {
            return Err(WyrError::synthesis("speech synthesis produced no audio"));
        }
        Ok(clip)
    }

    /// Narrate a caption pair according to `spec`.
    ///
    /// Returns `Ok(None)` when narration is disabled, or when it failed and is not required.
    pub fn narrate(
        &self,
        spec: &NarrationSpec,
        captions: [&str; 2],
        deadline: Option<Instant>,
    ) -> WyrResult<Option<AudioClip>> {
        if !spec.enabled {
            return Ok(None);
        }
        let line = narration_line(captions[0], captions[1]);
        match self.speak(&line, spec.voice.as_deref(), deadline) {
            Ok(clip) => {
                tracing::debug!(secs = clip.duration_secs(), "narration ready");
                Ok(Some(clip))
            }
            Err(e) if spec.required => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "narration failed; continuing without audio");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/narration/synth.rs"]
mod tests;
