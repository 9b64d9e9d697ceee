use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, mpsc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::orchestrator::OrchestratorConfig;
use crate::encode::writer::Codec;
use crate::foundation::error::{WyrError, WyrResult};
use crate::job::render_job::{self, JobEnv, StatusSink};
use crate::job::status::{
    JobFailure, JobHandle, JobId, JobState, JobStatus, Stage, frame_progress,
};
use crate::narration::synth::{Narrator, SpeechSynthesizer};
use crate::request::model::VideoRequest;

/// Accepts video requests and runs them on a fixed pool of worker threads.
///
/// `submit` validates synchronously and queues; a full queue rejects the request. Finished jobs
/// stay pollable until `forget` or until more than `finished_retention` of them pile up. Dropping
/// the orchestrator cancels outstanding jobs and joins the workers.
pub struct Orchestrator {
    shared: Arc<Shared>,
    queue: Option<mpsc::SyncSender<JobId>>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    cfg: OrchestratorConfig,
    codec: Arc<dyn Codec>,
    narrator: Option<Narrator>,
    jobs: Mutex<HashMap<JobId, Arc<JobRecord>>>,
    next_id: AtomicU64,
}

struct JobRecord {
    id: JobId,
    request: Mutex<Option<VideoRequest>>,
    deadline: Option<Instant>,
    cancel: AtomicBool,
    status: Mutex<JobStatus>,
    changed: Condvar,
}

impl JobRecord {
    fn lock_status(&self) -> MutexGuard<'_, JobStatus> {
        self.status.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut JobStatus)) {
        let mut st = self.lock_status();
        if st.state.is_terminal() {
            return;
        }
        f(&mut st);
        drop(st);
        self.changed.notify_all();
    }

    fn finish(&self, result: WyrResult<PathBuf>) {
        self.update(|st| match result {
            Ok(path) => {
                st.state = JobState::Completed;
                st.progress = Stage::Complete.progress();
                st.stage = Stage::Complete.label().to_owned();
                st.output = Some(path);
            }
            Err(WyrError::Cancelled) => {
                tracing::info!(job = %self.id, "job cancelled");
                st.state = JobState::Cancelled;
                st.stage = "cancelled".to_owned();
            }
            Err(e) => {
                tracing::error!(job = %self.id, error = %e, kind = ?e.kind(), "job failed");
                st.state = JobState::Failed;
                st.stage = "failed".to_owned();
                st.failure = Some(JobFailure::from(&e));
            }
        });
    }
}

impl StatusSink for JobRecord {
    fn stage(&self, state: JobState, stage: Stage) {
        tracing::debug!(job = %self.id, ?state, stage = stage.label(), "job stage");
        self.update(|st| {
            st.state = state;
            st.progress = st.progress.max(stage.progress());
            st.stage = stage.label().to_owned();
        });
    }

    fn frames(&self, done: u64, total: u64) {
        let p = frame_progress(done, total);
        if self.lock_status().progress >= p {
            return;
        }
        self.update(|st| st.progress = st.progress.max(p));
    }
}

impl Orchestrator {
    /// Start `cfg.worker_count` workers.
    ///
    /// Without a `synthesizer`, narration requests are skipped (or fail when required).
    pub fn new(
        cfg: OrchestratorConfig,
        codec: Arc<dyn Codec>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> WyrResult<Self> {
        cfg.validate()?;
        for dir in [&cfg.output_dir, &cfg.work_root] {
            std::fs::create_dir_all(dir).map_err(|e| {
                WyrError::validation(format!("create directory '{}': {e}", dir.display()))
            })?;
        }
        let narrator = synthesizer.map(|s| Narrator::new(s, cfg.synthesis_timeout));

        let (tx, rx) = mpsc::sync_channel::<JobId>(cfg.backlog);
        let rx = Arc::new(Mutex::new(rx));
        let worker_count = cfg.worker_count;
        let shared = Arc::new(Shared {
            cfg,
            codec,
            narrator,
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        });

        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let shared = shared.clone();
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("wyr-job-{i}"))
                .spawn(move || worker_loop(&shared, &rx))
                .map_err(|e| WyrError::Other(anyhow::anyhow!("spawn job worker: {e}")))?;
            workers.push(handle);
        }
        tracing::info!(workers = worker_count, "orchestrator started");

        Ok(Self {
            shared,
            queue: Some(tx),
            workers,
        })
    }

    /// Validate and enqueue a request.
    ///
    /// Returns `Validation` for bad requests and `Rejected` when the backlog is full.
    pub fn submit(&self, request: VideoRequest) -> WyrResult<JobHandle> {
        request.validate()?;
        if request.render.is_none() {
            self.shared.cfg.render.validate()?;
        }
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| WyrError::rejected("orchestrator is shutting down"))?;

        let id = JobId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(JobRecord {
            id,
            request: Mutex::new(Some(request)),
            deadline: self.shared.cfg.job_deadline.map(|d| Instant::now() + d),
            cancel: AtomicBool::new(false),
            status: Mutex::new(JobStatus::accepted()),
            changed: Condvar::new(),
        });
        {
            let mut jobs = self.shared.lock_jobs();
            self.shared.evict_finished(&mut jobs);
            jobs.insert(id, record);
        }

        match queue.try_send(id) {
            Ok(()) => {
                tracing::info!(job = %id, "job accepted");
                Ok(JobHandle { id })
            }
            Err(e) => {
                self.shared.lock_jobs().remove(&id);
                Err(match e {
                    mpsc::TrySendError::Full(_) => {
                        tracing::warn!(job = %id, "backlog full; request rejected");
                        WyrError::rejected(format!(
                            "backlog of {} jobs is full",
                            self.shared.cfg.backlog
                        ))
                    }
                    mpsc::TrySendError::Disconnected(_) => {
                        WyrError::rejected("job workers have exited")
                    }
                })
            }
        }
    }

    /// Current status of a job.
    pub fn poll(&self, handle: JobHandle) -> WyrResult<JobStatus> {
        Ok(self.shared.record(handle.id)?.lock_status().clone())
    }

    /// Request cancellation.
    ///
    /// A queued job is cancelled immediately; a running job stops at its next frame or encode
    /// boundary. Terminal jobs are left unchanged.
    pub fn cancel(&self, handle: JobHandle) -> WyrResult<()> {
        let record = self.shared.record(handle.id)?;
        record.cancel.store(true, Ordering::Relaxed);
        record.update(|st| {
            if st.state == JobState::Accepted {
                tracing::info!(job = %handle.id, "queued job cancelled");
                st.state = JobState::Cancelled;
                st.stage = "cancelled".to_owned();
            }
        });
        Ok(())
    }

    /// Remove a finished job, returning its final status.
    ///
    /// Queued or running jobs are kept and reported as a `Validation` error.
    pub fn forget(&self, handle: JobHandle) -> WyrResult<JobStatus> {
        let mut jobs = self.shared.lock_jobs();
        let record = jobs
            .get(&handle.id)
            .ok_or_else(|| WyrError::validation(format!("unknown job {}", handle.id)))?;
        let st = record.lock_status().clone();
        if !st.state.is_terminal() {
            return Err(WyrError::validation(format!(
                "job {} is still {:?}",
                handle.id, st.state
            )));
        }
        jobs.remove(&handle.id);
        Ok(st)
    }

    /// Block until the job reaches a terminal state.
    ///
    /// Fails with `Timeout` if it is still running after `timeout`.
    pub fn wait(&self, handle: JobHandle, timeout: Duration) -> WyrResult<JobStatus> {
        let record = self.shared.record(handle.id)?;
        let st = record.lock_status();
        let (st, res) = record
            .changed
            .wait_timeout_while(st, timeout, |st| !st.state.is_terminal())
            .unwrap_or_else(|p| p.into_inner());
        if res.timed_out() && !st.state.is_terminal() {
            return Err(WyrError::timeout(format!(
                "job {} still {:?} after {timeout:?}",
                handle.id, st.state
            )));
        }
        Ok(st.clone())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        drop(self.queue.take());
        for record in self.shared.lock_jobs().values() {
            record.cancel.store(true, Ordering::Relaxed);
        }
        for w in self.workers.drain(..) {
            if w.join().is_err() {
                tracing::error!("job worker panicked");
            }
        }
    }
}

impl Shared {
    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<JobId, Arc<JobRecord>>> {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, id: JobId) -> WyrResult<Arc<JobRecord>> {
        self.lock_jobs()
            .get(&id)
            .cloned()
            .ok_or_else(|| WyrError::validation(format!("unknown job {id}")))
    }

    fn evict_finished(&self, jobs: &mut HashMap<JobId, Arc<JobRecord>>) {
        let mut finished: Vec<JobId> = jobs
            .iter()
            .filter(|(_, r)| r.lock_status().state.is_terminal())
            .map(|(id, _)| *id)
            .collect();
        if finished.len() <= self.cfg.finished_retention {
            return;
        }
        let excess = finished.len() - self.cfg.finished_retention;
        finished.sort_unstable();
        for id in &finished[..excess] {
            jobs.remove(id);
        }
        tracing::debug!(evicted = excess, "evicted finished jobs");
    }

    fn output_path(&self, id: JobId) -> PathBuf {
        self.cfg.output_dir.join(format!("wyr-{id}.mp4"))
    }

    #[tracing::instrument(skip_all, fields(job = %record.id))]
    fn execute(&self, record: &JobRecord) {
        let Some(request) = record
            .request
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        else {
            return;
        };
        if record.lock_status().state.is_terminal() {
            return;
        }
        if record.cancel.load(Ordering::Relaxed) {
            record.finish(Err(WyrError::Cancelled));
            return;
        }

        let work_dir = match tempfile::Builder::new()
            .prefix("wyr-job-")
            .tempdir_in(&self.cfg.work_root)
        {
            Ok(d) => d,
            Err(e) => {
                record.finish(Err(WyrError::Other(
                    anyhow::Error::new(e).context("create job working directory"),
                )));
                return;
            }
        };

        let cfg = request.render.as_ref().unwrap_or(&self.cfg.render);
        let output = self.output_path(record.id);
        let env = JobEnv {
            codec: self.codec.clone(),
            narrator: self.narrator.as_ref(),
            codec_call_timeout: self.cfg.codec_call_timeout,
            deadline: record.deadline,
            cancel: &record.cancel,
            work_dir: work_dir.path(),
            output: &output,
        };
        let started = Instant::now();
        let result = render_job::run(&request, cfg, &env, record);

        let dir_path = work_dir.path().to_path_buf();
        if let Err(e) = work_dir.close() {
            tracing::warn!(dir = %dir_path.display(), error = %e, "failed to remove working directory");
        }
        if let Ok(path) = &result {
            tracing::info!(
                output = %path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "job completed"
            );
        }
        record.finish(result);
    }
}

fn worker_loop(shared: &Shared, rx: &Mutex<mpsc::Receiver<JobId>>) {
    loop {
        let next = match rx.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => return,
        };
        let Ok(id) = next else {
            return;
        };
        match shared.record(id) {
            Ok(record) => shared.execute(&record),
            Err(_) => tracing::debug!(job = %id, "dequeued job was already forgotten"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/orchestrator.rs"]
mod tests;
