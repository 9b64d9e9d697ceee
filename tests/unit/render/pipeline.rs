use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::AtomicU64;

use super::*;
use crate::config::render::RenderConfig;
use crate::encode::writer::{Codec, InMemoryCodec, SinkConfig};
use crate::foundation::core::Canvas;
use crate::layout::resolver::resolve_layout;
use crate::render::scene::SceneInputs;
use crate::request::model::ImageSource;
use crate::results::percentages::Percentages;

fn png(px: [u8; 4]) -> ImageSource {
    let img = image::RgbaImage::from_pixel(64, 48, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageSource::uploaded(buf)
}

fn scene() -> Arc<PreparedScene> {
    let cfg = RenderConfig {
        canvas: Canvas {
            width: 36,
            height: 64,
        },
        base_duration_secs: 2.0,
        ..RenderConfig::default()
    };
    let layout = resolve_layout(&png([250, 0, 0, 255]), &png([0, 0, 250, 128]), &cfg).unwrap();
    Arc::new(
        PreparedScene::prepare(SceneInputs {
            cfg: &cfg,
            layout,
            captions: ["a", "b"],
            percentages: Some(Percentages::new(70, 30).unwrap()),
            narration_secs: None,
            font: None,
        })
        .unwrap(),
    )
}

fn run(
    scene: &Arc<PreparedScene>,
    threading: RenderThreading,
    codec: &InMemoryCodec,
    cancel: &AtomicBool,
) -> WyrResult<RenderStats> {
    let progress = AtomicU64::new(0);
    let on_frame = |done: u64, _total: u64| {
        progress.store(done, Ordering::Relaxed);
    };
    let control = RenderControl {
        cancel,
        deadline: None,
        on_frame: &on_frame,
    };
    let cfg = SinkConfig {
        width: scene.canvas.width,
        height: scene.canvas.height,
        fps: scene.fps,
    };
    let dir = tempfile::tempdir().unwrap();
    let mut writer = codec.open(&dir.path().join("o.mp4"), cfg, Path::new("."))?;
    let stats = render_to_writer(scene, &threading, &control, writer.as_mut())?;
    writer.finalize()?;
    assert_eq!(progress.load(Ordering::Relaxed), stats.frames_written);
    Ok(stats)
}

fn threading(parallel: bool) -> RenderThreading {
    RenderThreading {
        parallel,
        threads: Some(3),
        chunk_size: 7,
        channel_capacity: 2,
    }
}

#[test]
fn sequential_render_writes_every_frame_in_order() {
    let s = scene();
    assert_eq!(s.frame_count, 60);
    let codec = InMemoryCodec::new();
    let stats = run(&s, threading(false), &codec, &AtomicBool::new(false)).unwrap();
    assert_eq!(stats.frames_written, 60);
    let cap = &codec.captures()[0];
    assert_eq!(cap.frames.len(), 60);
    for (i, f) in cap.frames.iter().enumerate() {
        assert_eq!(f.index(), FrameIndex(i as u64));
    }
}

#[test]
fn parallel_matches_sequential_output() {
    let s = scene();
    let seq = InMemoryCodec::new();
    let par = InMemoryCodec::new();
    run(&s, threading(false), &seq, &AtomicBool::new(false)).unwrap();
    run(&s, threading(true), &par, &AtomicBool::new(false)).unwrap();

    let a = &seq.captures()[0].frames;
    let b = &par.captures()[0].frames;
    assert_eq!(a.len(), b.len());
    for (fa, fb) in a.iter().zip(b.iter()) {
        assert_eq!(fa, fb, "frame {}", fa.index().0);
    }
    assert_ne!(a[0].data(), a[30].data(), "expected frame-to-frame variation");
}

#[test]
fn cancellation_stops_before_any_frame() {
    let s = scene();
    let codec = InMemoryCodec::new();
    for parallel in [false, true] {
        let err = run(&s, threading(parallel), &codec, &AtomicBool::new(true)).unwrap_err();
        assert!(matches!(err, WyrError::Cancelled), "{err}");
    }
    assert!(codec.captures().is_empty());
}

#[test]
fn writer_failure_is_reported_over_channel_shutdown() {
    let s = scene();
    for parallel in [false, true] {
        let codec = InMemoryCodec::new().failing_at(5);
        let err = run(&s, threading(parallel), &codec, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, WyrError::Encode(_)), "{err}");
    }
}

#[test]
fn expired_deadline_is_a_timeout() {
    let s = scene();
    let cancel = AtomicBool::new(false);
    let on_frame = |_: u64, _: u64| {};
    let control = RenderControl {
        cancel: &cancel,
        deadline: Some(Instant::now()),
        on_frame: &on_frame,
    };
    assert!(matches!(control.check(), Err(WyrError::Timeout(_))));
    let codec = InMemoryCodec::new();
    let cfg = SinkConfig {
        width: 36,
        height: 64,
        fps: s.fps,
    };
    let mut w = codec.open(Path::new("unused.mp4"), cfg, Path::new(".")).unwrap();
    let err = render_to_writer(&s, &threading(true), &control, w.as_mut()).unwrap_err();
    assert!(matches!(err, WyrError::Timeout(_)));
}
