use crate::config::render::RenderConfig;
use crate::foundation::error::{WyrError, WyrResult};
use std::path::PathBuf;
use std::time::Duration;

/// Pool sizes, limits and directories for an [`Orchestrator`](crate::Orchestrator).
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Concurrent jobs (OS worker threads).
    pub worker_count: usize,
    /// Accepted-but-not-started jobs held before `submit` is rejected.
    pub backlog: usize,
    /// Wall-clock limit per job, counted from acceptance.
    pub job_deadline: Option<Duration>,
    /// Limit for any single codec call.
    pub codec_call_timeout: Duration,
    /// Limit for one narration synthesis.
    pub synthesis_timeout: Duration,
    /// Finished jobs kept for `poll`; the oldest beyond this are evicted on `submit`.
    pub finished_retention: usize,
    /// Directory receiving finished videos.
    pub output_dir: PathBuf,
    /// Parent of per-job working directories.
    pub work_root: PathBuf,
    /// Render config for requests that carry none.
    pub render: RenderConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            backlog: 16,
            job_deadline: Some(Duration::from_secs(600)),
            codec_call_timeout: Duration::from_secs(60),
            synthesis_timeout: Duration::from_secs(60),
            finished_retention: 256,
            output_dir: PathBuf::from("out"),
            work_root: std::env::temp_dir(),
            render: RenderConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Check limits and the default render config.
    pub fn validate(&self) -> WyrResult<()> {
        if self.worker_count == 0 {
            return Err(WyrError::validation("worker_count must be >= 1"));
        }
        if self.backlog == 0 {
            return Err(WyrError::validation("backlog must be >= 1"));
        }
        if self.codec_call_timeout.is_zero() || self.synthesis_timeout.is_zero() {
            return Err(WyrError::validation("timeouts must be non-zero"));
        }
        if self.job_deadline.is_some_and(|d| d.is_zero()) {
            return Err(WyrError::validation("job_deadline must be non-zero when set"));
        }
        self.render.validate()
    }
}
