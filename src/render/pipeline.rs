use crate::config::render::RenderThreading;
use crate::encode::writer::VideoWriter;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{WyrError, WyrResult};
use crate::render::compositor::CompositorWorker;
use crate::render::frame::Frame;
use crate::render::scene::PreparedScene;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Instant;

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Cooperative stop conditions and progress reporting for a render.
pub struct RenderControl<'a> {
    /// Set to request cancellation; checked at every frame boundary.
    pub cancel: &'a AtomicBool,
    /// Wall-clock limit for the whole job.
    pub deadline: Option<Instant>,
    /// Called from the encoder thread after each frame is written, with `(written, total)`.
    pub on_frame: &'a (dyn Fn(u64, u64) + Sync),
}

impl RenderControl<'_> {
    /// Fail with `Cancelled` or `Timeout` when the job must stop.
    pub fn check(&self) -> WyrResult<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(WyrError::Cancelled);
        }
        if let Some(d) = self.deadline
            && Instant::now() >= d
        {
            return Err(WyrError::timeout("job deadline exceeded while rendering"));
        }
        Ok(())
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames rendered and handed to the writer.
    pub frames_written: u64,
}

/// Why a producer stopped early.
enum Halt {
    Failed(WyrError),
    EncoderGone,
}

impl From<WyrError> for Halt {
    fn from(e: WyrError) -> Self {
        Halt::Failed(e)
    }
}

/// Render every frame of `scene` and stream it into `writer`.
///
/// The writer receives frames in strictly increasing index order. With `parallel` enabled, frames
/// are produced on a rayon pool and out-of-order completion is restored at the encoder thread
/// through an index-keyed reorder buffer (bounded channel backpressure).
#[tracing::instrument(skip_all, fields(frames = scene.frame_count, parallel = threading.parallel))]
pub fn render_to_writer(
    scene: &Arc<PreparedScene>,
    threading: &RenderThreading,
    control: &RenderControl<'_>,
    writer: &mut dyn VideoWriter,
) -> WyrResult<RenderStats> {
    let total = scene.frame_count;
    if total == 0 {
        return Err(WyrError::validation("video has no frames"));
    }

    let cap = threading.channel_capacity.max(1);
    let bytes_per_frame = (scene.canvas.frame_len_bytes() as u64).max(1);
    let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
    let chunk_size = normalized_chunk_size(threading.chunk_size)
        .min(max_chunk_by_mem)
        .min(total);

    let pool = if threading.parallel {
        Some(build_thread_pool(threading.threads)?)
    } else {
        None
    };

    // Encoder thread: enforce in-order delivery to the writer regardless of render completion
    // order.
    std::thread::scope(|scope| -> WyrResult<RenderStats> {
        let (tx, rx) = mpsc::sync_channel::<Frame>(cap);
        let on_frame = control.on_frame;

        let enc = scope.spawn(move || -> WyrResult<u64> {
            let mut next = 0u64;
            let mut pending = HashMap::<u64, Frame>::new();
            while next < total {
                if let Some(frame) = pending.remove(&next) {
                    writer.write_frame(frame)?;
                    next += 1;
                    on_frame(next, total);
                    continue;
                }
                let Ok(frame) = rx.recv() else {
                    // Producers stopped early; their error is reported instead.
                    return Ok(next);
                };
                pending.insert(frame.index().0, frame);
            }
            Ok(next)
        });

        let produce_res: Result<(), Halt> = match pool.as_ref() {
            Some(pool) => {
                let mut chunk_start = 0u64;
                let mut res = Ok(());
                while chunk_start < total {
                    let chunk_end = (chunk_start + chunk_size).min(total);
                    res = render_chunk_parallel(
                        scene,
                        pool,
                        control,
                        &tx,
                        chunk_start,
                        chunk_end,
                    );
                    if res.is_err() {
                        break;
                    }
                    chunk_start = chunk_end;
                }
                res
            }
            None => (|| -> Result<(), Halt> {
                let mut worker = CompositorWorker::new(scene.clone())?;
                for f in 0..total {
                    control.check()?;
                    let frame = worker.render_frame(FrameIndex(f))?;
                    tx.send(frame).map_err(|_| Halt::EncoderGone)?;
                }
                Ok(())
            })(),
        };

        drop(tx);
        let enc_res = enc
            .join()
            .map_err(|_| WyrError::encode("encoder thread panicked"))?;

        match produce_res {
            Ok(()) => {
                let written = enc_res?;
                if written != total {
                    return Err(WyrError::render(format!(
                        "encoder stopped after {written} of {total} frames"
                    )));
                }
                Ok(RenderStats {
                    frames_written: written,
                })
            }
            Err(Halt::Failed(e)) => Err(e),
            Err(Halt::EncoderGone) => match enc_res {
                Err(e) => Err(e),
                Ok(_) => Err(WyrError::encode("encoder thread stopped accepting frames")),
            },
        }
    })
}

fn render_chunk_parallel(
    scene: &Arc<PreparedScene>,
    pool: &rayon::ThreadPool,
    control: &RenderControl<'_>,
    tx: &mpsc::SyncSender<Frame>,
    start: u64,
    end: u64,
) -> Result<(), Halt> {
    let tx = tx.clone();
    pool.install(|| {
        (start..end).into_par_iter().try_for_each_init(
            || CompositorWorker::new(scene.clone()),
            move |worker, f| -> Result<(), Halt> {
                control.check()?;
                let worker = worker
                    .as_mut()
                    .map_err(|e| Halt::Failed(WyrError::render(e.to_string())))?;
                let frame = worker.render_frame(FrameIndex(f))?;
                tx.send(frame).map_err(|_| Halt::EncoderGone)
            },
        )
    })
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

fn build_thread_pool(threads: Option<usize>) -> WyrResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(WyrError::validation(
            "render 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("wyr-render-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| WyrError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
