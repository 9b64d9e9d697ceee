use crate::foundation::error::{ErrorKind, WyrError};
use std::fmt;
use std::path::PathBuf;

/// Orchestrator-assigned job identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller's reference to a submitted job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub(crate) id: JobId,
}

impl JobHandle {
    /// The job's identifier.
    pub fn id(self) -> JobId {
        self.id
    }
}

/// Lifecycle state.
///
/// `Accepted -> Validating -> Rendering -> Encoding -> Completed`, with `Failed` and `Cancelled`
/// reachable from any non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum JobState {
    /// Queued, not yet picked up by a worker.
    Accepted,
    /// Decoding images, resolving layout and narration.
    Validating,
    /// Producing frames.
    Rendering,
    /// Muxing audio and finalizing the container.
    Encoding,
    /// Output committed.
    Completed,
    /// Stopped with an error.
    Failed,
    /// Stopped on request.
    Cancelled,
}

impl JobState {
    /// Whether the job can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Why a job failed.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct JobFailure {
    /// Coarse category.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl From<&WyrError> for JobFailure {
    fn from(e: &WyrError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Snapshot returned by polling.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct JobStatus {
    /// Current state.
    pub state: JobState,
    /// Completion percentage, `0..=100`, never decreasing.
    pub progress: u8,
    /// What the job is doing.
    pub stage: String,
    /// Final video path once completed.
    pub output: Option<PathBuf>,
    /// Failure detail once failed.
    pub failure: Option<JobFailure>,
}

impl JobStatus {
    pub(crate) fn accepted() -> Self {
        Self {
            state: JobState::Accepted,
            progress: 0,
            stage: Stage::Queued.label().to_owned(),
            output: None,
            failure: None,
        }
    }
}

/// Named progress checkpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    Queued,
    Initializing,
    ProcessingImages,
    Narration,
    StartRendering,
    Finalizing,
    Complete,
}

impl Stage {
    pub(crate) fn progress(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Initializing => 5,
            Self::ProcessingImages => 10,
            Self::Narration => 12,
            Self::StartRendering => 15,
            Self::Finalizing => 98,
            Self::Complete => 100,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Initializing => "initializing",
            Self::ProcessingImages => "processing images",
            Self::Narration => "generating narration",
            Self::StartRendering => "rendering frames",
            Self::Finalizing => "finalizing video",
            Self::Complete => "complete",
        }
    }
}

/// Progress while `done` of `total` frames are written: 15 to 95.
pub(crate) fn frame_progress(done: u64, total: u64) -> u8 {
    if total == 0 {
        return Stage::StartRendering.progress();
    }
    let span = 80 * done.min(total) / total;
    Stage::StartRendering.progress() + span as u8
}

#[cfg(test)]
#[path = "../../tests/unit/job/status.rs"]
mod tests;
