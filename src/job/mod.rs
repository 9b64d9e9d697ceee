//! Job lifecycle.
//!
//! [`orchestrator::Orchestrator`] accepts requests, queues them for a fixed pool of workers and
//! tracks each job's [`status::JobStatus`]; [`render_job`] is the pipeline one worker runs.

/// Worker pool, queue and job table.
pub mod orchestrator;
/// One job from request to committed MP4.
pub mod render_job;
/// Job identifiers, states and progress.
pub mod status;
