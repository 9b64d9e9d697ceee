use crate::audio::clip::AudioClip;
use crate::encode::writer::{Codec, SinkConfig, VideoWriter, WriterAbort};
use crate::foundation::error::{WyrError, WyrResult};
use crate::render::frame::Frame;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, mpsc};
use std::time::{Duration, Instant};

enum Call {
    Frame(Frame),
    Audio(AudioClip),
    Finalize,
}

type Reply = WyrResult<Option<PathBuf>>;

/// Runs a codec writer on its own thread and bounds every call.
///
/// Each call waits at most `call_timeout`, further capped by the job deadline. A call that does
/// not return in time yields [`WyrError::Timeout`] and the inner writer is aborted through its
/// [`WriterAbort`] handle; the writer is then unusable.
pub struct TimeBoxedWriter {
    calls: Option<mpsc::Sender<Call>>,
    replies: mpsc::Receiver<Reply>,
    abort: Arc<OnceLock<Arc<dyn WriterAbort>>>,
    call_timeout: Duration,
    deadline: Option<Instant>,
    broken: bool,
}

impl TimeBoxedWriter {
    /// Open a writer from `codec` on a dedicated thread.
    pub fn open(
        codec: Arc<dyn Codec>,
        output: &Path,
        cfg: SinkConfig,
        work_dir: &Path,
        call_timeout: Duration,
        deadline: Option<Instant>,
    ) -> WyrResult<Self> {
        let (call_tx, call_rx) = mpsc::channel::<Call>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();
        let output = output.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let abort = Arc::new(OnceLock::<Arc<dyn WriterAbort>>::new());
        let abort_slot = abort.clone();

        std::thread::Builder::new()
            .name("wyr-writer".to_owned())
            .spawn(move || {
                let mut inner = match codec.open(&output, cfg, &work_dir) {
                    Ok(w) => {
                        if let Some(handle) = w.abort_handle() {
                            let _ = abort_slot.set(handle);
                        }
                        if reply_tx.send(Ok(None)).is_err() {
                            return;
                        }
                        w
                    }
                    Err(e) => {
                        let _ = reply_tx.send(Err(e));
                        return;
                    }
                };
                while let Ok(call) = call_rx.recv() {
                    let res = match call {
                        Call::Frame(f) => inner.write_frame(f).map(|()| None),
                        Call::Audio(c) => inner.attach_audio(&c).map(|()| None),
                        Call::Finalize => {
                            let _ = reply_tx.send(inner.finalize().map(Some));
                            return;
                        }
                    };
                    if reply_tx.send(res).is_err() {
                        return;
                    }
                }
            })
            .map_err(|e| WyrError::encode(format!("failed to spawn writer thread: {e}")))?;

        let mut this = Self {
            calls: Some(call_tx),
            replies: reply_rx,
            abort,
            call_timeout,
            deadline,
            broken: false,
        };
        this.await_reply("open")?;
        Ok(this)
    }

    fn budget(&self) -> WyrResult<Duration> {
        let Some(deadline) = self.deadline else {
            return Ok(self.call_timeout);
        };
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(WyrError::timeout("job deadline exceeded before codec call"));
        }
        Ok(left.min(self.call_timeout))
    }

    fn call(&mut self, call: Call, what: &str) -> Reply {
        if self.broken {
            return Err(WyrError::encode(
                "writer is unusable after an earlier failure",
            ));
        }
        let sent = self.calls.as_ref().map(|tx| tx.send(call));
        if !matches!(sent, Some(Ok(()))) {
            self.broken = true;
            return Err(WyrError::encode("writer thread exited"));
        }
        self.await_reply(what)
    }

    fn await_reply(&mut self, what: &str) -> Reply {
        let budget = match self.budget() {
            Ok(b) => b,
            Err(e) => {
                self.broken = true;
                return Err(e);
            }
        };
        match self.replies.recv_timeout(budget) {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => {
                self.broken = true;
                Err(e)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.broken = true;
                tracing::warn!(call = what, budget_ms = budget.as_millis() as u64, "codec call timed out");
                self.abort_inner();
                Err(WyrError::timeout(format!(
                    "codec {what} did not return within {} ms",
                    budget.as_millis()
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.broken = true;
                Err(WyrError::encode(format!("writer thread exited during {what}")))
            }
        }
    }

    fn abort_inner(&self) {
        if let Some(handle) = self.abort.get() {
            handle.abort();
        }
    }
}

impl VideoWriter for TimeBoxedWriter {
    fn write_frame(&mut self, frame: Frame) -> WyrResult<()> {
        self.call(Call::Frame(frame), "write_frame").map(|_| ())
    }

    fn attach_audio(&mut self, clip: &AudioClip) -> WyrResult<()> {
        self.call(Call::Audio(clip.clone()), "attach_audio")
            .map(|_| ())
    }

    fn finalize(mut self: Box<Self>) -> WyrResult<PathBuf> {
        self.call(Call::Finalize, "finalize")?
            .ok_or_else(|| WyrError::encode("writer finalized without an output path"))
    }

    fn abort_handle(&self) -> Option<Arc<dyn WriterAbort>> {
        self.abort.get().cloned()
    }
}

impl Drop for TimeBoxedWriter {
    fn drop(&mut self) {
        // Closing the call channel lets an idle writer thread exit and drop its codec state.
        drop(self.calls.take());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/timed.rs"]
mod tests;
