//! Spoken narration.
//!
//! The TTS engine sits behind [`synth::SpeechSynthesizer`]; [`synth::Narrator`] runs it on a
//! dedicated pool with a time box and applies the recover-or-fail policy of a request.

/// External-command TTS engine.
pub mod command;
/// Synthesizer trait and the time-boxed narrator.
pub mod synth;
