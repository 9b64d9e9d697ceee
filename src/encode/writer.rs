use crate::audio::clip::AudioClip;
use crate::foundation::core::Fps;
use crate::foundation::error::{WyrError, WyrResult};
use crate::render::frame::Frame;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stream parameters given to a codec when a writer is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

/// Factory for [`VideoWriter`]s; the seam to the codec library.
pub trait Codec: Send + Sync {
    /// Open a writer producing `output`, whose parent directory must exist.
    ///
    /// `work_dir` is a job-private scratch directory removed after the job ends.
    fn open(
        &self,
        output: &Path,
        cfg: SinkConfig,
        work_dir: &Path,
    ) -> WyrResult<Box<dyn VideoWriter>>;
}

/// One output video being written.
///
/// Ordering contract: `write_frame` receives frames in strictly increasing index order starting
/// at 0. Implementations reject anything else.
pub trait VideoWriter: Send {
    /// Append the next frame.
    fn write_frame(&mut self, frame: Frame) -> WyrResult<()>;
    /// Attach the audio track muxed on [`VideoWriter::finalize`].
    fn attach_audio(&mut self, clip: &AudioClip) -> WyrResult<()>;
    /// Finish the file and return the path that was written.
    fn finalize(self: Box<Self>) -> WyrResult<PathBuf>;
    /// Handle that can stop this writer from another thread while a call is blocked.
    fn abort_handle(&self) -> Option<Arc<dyn WriterAbort>> {
        None
    }
}

/// Stops a writer's in-flight work from outside the thread that drives it.
///
/// After `abort` the writer must not start new external work; pending calls should return an
/// error soon after.
pub trait WriterAbort: Send + Sync {
    /// Kill whatever the writer is blocked on.
    fn abort(&self);
}

/// Presentation-order and geometry check shared by writers.
#[derive(Debug)]
pub(crate) struct FrameOrder {
    cfg: SinkConfig,
    next: u64,
}

impl FrameOrder {
    pub(crate) fn new(cfg: SinkConfig) -> Self {
        Self { cfg, next: 0 }
    }

    pub(crate) fn accept(&mut self, frame: &Frame) -> WyrResult<()> {
        if frame.index().0 != self.next {
            return Err(WyrError::encode(format!(
                "out-of-order frame: got {}, expected {}",
                frame.index().0,
                self.next
            )));
        }
        if frame.width() != self.cfg.width || frame.height() != self.cfg.height {
            return Err(WyrError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.cfg.width,
                self.cfg.height
            )));
        }
        self.next += 1;
        Ok(())
    }

    pub(crate) fn written(&self) -> u64 {
        self.next
    }
}

/// Everything an [`InMemoryCodec`] writer received.
#[derive(Clone, Debug)]
pub struct CapturedVideo {
    /// Path the writer was opened with.
    pub path: PathBuf,
    /// Stream parameters.
    pub config: SinkConfig,
    /// Frames in write order.
    pub frames: Vec<Frame>,
    /// Attached audio, if any.
    pub audio: Option<AudioClip>,
}

/// Codec that keeps frames in memory; for tests and dry runs.
///
/// `finalize` writes a small marker file at the output path so the commit step has something to
/// rename, then records the capture.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCodec {
    captures: Arc<Mutex<Vec<CapturedVideo>>>,
    aborted: Arc<AtomicUsize>,
    frame_delay: Duration,
    finalize_delay: Duration,
    stall_at_frame: Option<u64>,
    fail_at_frame: Option<u64>,
}

impl InMemoryCodec {
    /// Create a codec with no artificial delays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every `write_frame`.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Sleep this long before `finalize` writes its output.
    pub fn with_finalize_delay(mut self, delay: Duration) -> Self {
        self.finalize_delay = delay;
        self
    }

    /// Block when asked to write frame `index`, until the writer is aborted.
    pub fn stalling_at(mut self, index: u64) -> Self {
        self.stall_at_frame = Some(index);
        self
    }

    /// Fail with an encode error when asked to write frame `index`.
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at_frame = Some(index);
        self
    }

    /// Number of stalled writers released by an abort.
    pub fn aborted_writers(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Finalized videos so far.
    pub fn captures(&self) -> Vec<CapturedVideo> {
        self.captures
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl Codec for InMemoryCodec {
    fn open(
        &self,
        output: &Path,
        cfg: SinkConfig,
        _work_dir: &Path,
    ) -> WyrResult<Box<dyn VideoWriter>> {
        Ok(Box::new(InMemoryWriter {
            codec: self.clone(),
            abort: Arc::new(AbortFlag::default()),
            order: FrameOrder::new(cfg),
            capture: CapturedVideo {
                path: output.to_path_buf(),
                config: cfg,
                frames: Vec::new(),
                audio: None,
            },
        }))
    }
}

#[derive(Debug, Default)]
struct AbortFlag(AtomicBool);

impl WriterAbort for AbortFlag {
    fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct InMemoryWriter {
    codec: InMemoryCodec,
    abort: Arc<AbortFlag>,
    order: FrameOrder,
    capture: CapturedVideo,
}

impl VideoWriter for InMemoryWriter {
    fn write_frame(&mut self, frame: Frame) -> WyrResult<()> {
        let idx = frame.index().0;
        if self.codec.stall_at_frame == Some(idx) {
            while !self.abort.0.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
            self.codec.aborted.fetch_add(1, Ordering::SeqCst);
            return Err(WyrError::encode(format!("writer aborted at frame {idx}")));
        }
        if self.codec.fail_at_frame == Some(idx) {
            return Err(WyrError::encode(format!("injected failure at frame {idx}")));
        }
        if !self.codec.frame_delay.is_zero() {
            std::thread::sleep(self.codec.frame_delay);
        }
        self.order.accept(&frame)?;
        self.capture.frames.push(frame);
        Ok(())
    }

    fn attach_audio(&mut self, clip: &AudioClip) -> WyrResult<()> {
        self.capture.audio = Some(clip.clone());
        Ok(())
    }

    fn finalize(self: Box<Self>) -> WyrResult<PathBuf> {
        let this = *self;
        if !this.codec.finalize_delay.is_zero() {
            std::thread::sleep(this.codec.finalize_delay);
        }
        std::fs::write(&this.capture.path, b"wyr in-memory video\n").map_err(|e| {
            WyrError::encode(format!(
                "failed to write '{}': {e}",
                this.capture.path.display()
            ))
        })?;
        tracing::debug!(frames = this.order.written(), "in-memory writer finalized");
        let path = this.capture.path.clone();
        this.codec
            .captures
            .lock()
            .map_err(|_| WyrError::encode("capture list poisoned"))?
            .push(this.capture);
        Ok(path)
    }

    fn abort_handle(&self) -> Option<Arc<dyn WriterAbort>> {
        Some(self.abort.clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/writer.rs"]
mod tests;
