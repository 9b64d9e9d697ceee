use crate::audio::clip::AudioClip;
use crate::encode::writer::{Codec, FrameOrder, SinkConfig, VideoWriter, WriterAbort};
use crate::foundation::core::Fps;
use crate::foundation::error::{WyrError, WyrResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::Frame;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const WAIT_POLL: Duration = Duration::from_millis(10);

/// Codec backed by the system `ffmpeg` binary.
///
/// Frames are streamed as raw RGBA into an H.264 (libx264, yuv420p) intermediate inside the job's
/// working directory. `finalize` muxes the attached narration as AAC, or remuxes the video alone,
/// into the requested output with `+faststart`.
#[derive(Clone, Debug)]
pub struct FfmpegCodec {
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
    /// x264 constant rate factor.
    pub crf: u8,
    /// x264 preset.
    pub preset: String,
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self {
            bg_rgba: [0, 0, 0, 255],
            crf: 20,
            preset: "veryfast".to_owned(),
        }
    }
}

impl Codec for FfmpegCodec {
    fn open(
        &self,
        output: &Path,
        cfg: SinkConfig,
        work_dir: &Path,
    ) -> WyrResult<Box<dyn VideoWriter>> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(WyrError::validation(
                "ffmpeg writer width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(WyrError::validation(
                "ffmpeg writer width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if !is_ffmpeg_on_path() {
            return Err(WyrError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        let video_path = work_dir.join("video.mp4");
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Input: raw RGBA8 frames. `ffmpeg` does not understand premul, so frames are flattened
        // before they are written to stdin.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-preset", &self.preset, "-crf", &self.crf.to_string()])
            .arg(&video_path);

        let process = Arc::new(ProcessSlot::default());
        let (stdin, stderr_drain) = process.spawn(&mut cmd, "encoder")?;
        let Some(stdin) = stdin else {
            process.kill();
            return Err(WyrError::encode("failed to open ffmpeg stdin (unexpected)"));
        };

        tracing::debug!(video = %video_path.display(), "ffmpeg encoder started");
        Ok(Box::new(FfmpegWriter {
            cfg,
            bg_rgba: self.bg_rgba,
            output: output.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            video_path,
            process,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            scratch: vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4],
            order: FrameOrder::new(cfg),
            audio: None,
        }))
    }
}

struct FfmpegWriter {
    cfg: SinkConfig,
    bg_rgba: [u8; 4],
    output: PathBuf,
    work_dir: PathBuf,
    video_path: PathBuf,

    process: Arc<ProcessSlot>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<StderrDrain>,

    scratch: Vec<u8>,
    order: FrameOrder,
    audio: Option<AudioClip>,
}

impl VideoWriter for FfmpegWriter {
    fn write_frame(&mut self, frame: Frame) -> WyrResult<()> {
        self.order.accept(&frame)?;
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, frame.data(), self.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(WyrError::encode("ffmpeg writer is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            WyrError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn attach_audio(&mut self, clip: &AudioClip) -> WyrResult<()> {
        self.audio = Some(clip.clone());
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> WyrResult<PathBuf> {
        drop(self.stdin.take());
        let drain = self
            .stderr_drain
            .take()
            .ok_or_else(|| WyrError::encode("ffmpeg writer not started"))?;
        self.process.wait(drain, "encoder")?;

        let mut mux = Command::new("ffmpeg");
        mux.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(&self.video_path);
        match self.audio.as_ref() {
            Some(audio) if !audio.is_empty() => {
                self.process.ensure_live()?;
                let audio_path = self.work_dir.join("narration.f32le");
                audio.write_f32le(&audio_path)?;
                mux.args([
                    "-f",
                    "f32le",
                    "-ar",
                    &audio.sample_rate().to_string(),
                    "-ac",
                    &audio.channels().to_string(),
                    "-i",
                ])
                .arg(&audio_path)
                .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac"])
                .arg("-shortest");
            }
            _ => {
                mux.args(["-c", "copy"]);
            }
        }
        mux.args(["-movflags", "+faststart", "-f", "mp4"])
            .arg(&self.output);

        let (_, drain) = self.process.spawn(&mut mux, "mux")?;
        self.process.wait(drain, "mux")?;
        tracing::debug!(
            output = %self.output.display(),
            frames = self.order.written(),
            width = self.cfg.width,
            height = self.cfg.height,
            "ffmpeg mux finished"
        );
        Ok(self.output.clone())
    }

    fn abort_handle(&self) -> Option<Arc<dyn WriterAbort>> {
        Some(self.process.clone())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        drop(self.stdin.take());
        self.process.kill();
    }
}

type StderrDrain = std::thread::JoinHandle<std::io::Result<Vec<u8>>>;

/// The `ffmpeg` process a writer is waiting on, shared with its abort handle.
///
/// Waiting polls with the lock released so [`ProcessSlot::kill`] can interrupt it from another
/// thread. Once killed the slot refuses to spawn anything else.
#[derive(Debug, Default)]
struct ProcessSlot {
    state: Mutex<SlotState>,
}

#[derive(Debug, Default)]
struct SlotState {
    child: Option<Child>,
    aborted: bool,
}

impl ProcessSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn ensure_live(&self) -> WyrResult<()> {
        if self.lock().aborted {
            return Err(WyrError::encode("ffmpeg writer was aborted"));
        }
        Ok(())
    }

    fn spawn(&self, cmd: &mut Command, what: &str) -> WyrResult<(Option<ChildStdin>, StderrDrain)> {
        let mut state = self.lock();
        if state.aborted {
            return Err(WyrError::encode(format!(
                "ffmpeg {what} not started: writer was aborted"
            )));
        }
        if state.child.is_some() {
            return Err(WyrError::encode("another ffmpeg process is still running"));
        }
        let mut child = cmd.spawn().map_err(|e| {
            WyrError::encode(format!(
                "failed to spawn ffmpeg {what} (is it installed and on PATH?): {e}"
            ))
        })?;
        let Some(mut stderr) = child.stderr.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(WyrError::encode("failed to open ffmpeg stderr (unexpected)"));
        };
        let stdin = child.stdin.take();
        let drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });
        state.child = Some(child);
        Ok((stdin, drain))
    }

    fn wait(&self, drain: StderrDrain, what: &str) -> WyrResult<()> {
        let status = loop {
            {
                let mut state = self.lock();
                let Some(child) = state.child.as_mut() else {
                    return Err(WyrError::encode(format!("ffmpeg {what} was killed")));
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        state.child = None;
                        break status;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        return Err(WyrError::encode(format!(
                            "failed to wait for ffmpeg {what}: {e}"
                        )));
                    }
                }
            }
            std::thread::sleep(WAIT_POLL);
        };
        let stderr_bytes = drain
            .join()
            .map_err(|_| WyrError::encode("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| WyrError::encode(format!("ffmpeg stderr read failed: {e}")))?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(WyrError::encode(format!(
                "ffmpeg {what} exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn kill(&self) {
        let mut state = self.lock();
        state.aborted = true;
        if let Some(mut child) = state.child.take() {
            tracing::debug!(pid = child.id(), "killing ffmpeg");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl WriterAbort for ProcessSlot {
    fn abort(&self) {
        self.kill();
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate, as a `num/den` rational.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> WyrResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(WyrError::encode(
            "flatten expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (s[0] as u16 + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (s[1] as u16 + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (s[2] as u16 + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> WyrResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
