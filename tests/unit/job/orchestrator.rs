use std::io::Cursor;

use super::*;
use crate::config::render::RenderConfig;
use crate::encode::writer::InMemoryCodec;
use crate::foundation::core::Canvas;
use crate::foundation::error::ErrorKind;
use crate::request::model::{ImageSource, OptionInput};

fn png() -> ImageSource {
    let img = image::RgbaImage::from_pixel(20, 30, image::Rgba([90, 20, 20, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageSource::uploaded(buf)
}

fn request() -> VideoRequest {
    let opt = |caption: &str| OptionInput {
        image: png(),
        caption: caption.to_owned(),
    };
    VideoRequest::new(opt("left"), opt("right"))
}

fn config(root: &std::path::Path, workers: usize, backlog: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        worker_count: workers,
        backlog,
        output_dir: root.join("out"),
        work_root: root.join("work"),
        render: RenderConfig {
            canvas: Canvas {
                width: 18,
                height: 32,
            },
            base_duration_secs: 1.0,
            ..RenderConfig::default()
        },
        ..OrchestratorConfig::default()
    }
}

fn orchestrator(
    root: &std::path::Path,
    codec: InMemoryCodec,
    workers: usize,
    backlog: usize,
) -> Orchestrator {
    Orchestrator::new(config(root, workers, backlog), Arc::new(codec), None).unwrap()
}

fn wait_until_started(o: &Orchestrator, h: JobHandle) {
    let t0 = Instant::now();
    while o.poll(h).unwrap().state == JobState::Accepted {
        assert!(t0.elapsed() < Duration::from_secs(10), "job never started");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn completed_job_reports_output_and_full_progress() {
    let tmp = tempfile::tempdir().unwrap();
    let o = orchestrator(tmp.path(), InMemoryCodec::new(), 1, 4);
    let h = o.submit(request()).unwrap();
    let st = o.wait(h, Duration::from_secs(30)).unwrap();
    assert_eq!(st.state, JobState::Completed, "{st:?}");
    assert_eq!(st.progress, 100);
    let out = st.output.unwrap();
    assert_eq!(out, tmp.path().join("out").join(format!("wyr-{}.mp4", h.id())));
    assert!(out.is_file());
}

#[test]
fn invalid_request_is_rejected_synchronously() {
    let tmp = tempfile::tempdir().unwrap();
    let o = orchestrator(tmp.path(), InMemoryCodec::new(), 1, 4);
    let mut req = request();
    req.upper.caption = "  ".to_owned();
    assert!(matches!(o.submit(req), Err(WyrError::Validation(_))));
}

#[test]
fn full_backlog_rejects_instead_of_dropping() {
    let tmp = tempfile::tempdir().unwrap();
    let slow = InMemoryCodec::new().with_frame_delay(Duration::from_millis(50));
    let o = orchestrator(tmp.path(), slow, 1, 1);

    let running = o.submit(request()).unwrap();
    wait_until_started(&o, running);
    let queued = o.submit(request()).unwrap();
    let err = o.submit(request()).unwrap_err();
    assert!(matches!(err, WyrError::Rejected(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Rejected);

    o.cancel(queued).unwrap();
    assert_eq!(o.poll(queued).unwrap().state, JobState::Cancelled);
    o.cancel(running).unwrap();
    let st = o.wait(running, Duration::from_secs(30)).unwrap();
    assert_eq!(st.state, JobState::Cancelled);
    assert!(st.failure.is_none());
}

#[test]
fn unknown_handles_are_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let o = orchestrator(tmp.path(), InMemoryCodec::new(), 1, 1);
    let ghost = JobHandle { id: JobId(9_999) };
    assert!(o.poll(ghost).is_err());
    assert!(o.cancel(ghost).is_err());
}

#[test]
fn wait_times_out_on_a_running_job() {
    let tmp = tempfile::tempdir().unwrap();
    let slow = InMemoryCodec::new().with_frame_delay(Duration::from_millis(50));
    let o = orchestrator(tmp.path(), slow, 1, 1);
    let h = o.submit(request()).unwrap();
    let err = o.wait(h, Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, WyrError::Timeout(_)));
    o.cancel(h).unwrap();
}

#[test]
fn forget_removes_only_finished_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let slow = InMemoryCodec::new().with_frame_delay(Duration::from_millis(20));
    let o = orchestrator(tmp.path(), slow, 1, 4);
    let h = o.submit(request()).unwrap();

    let err = o.forget(h).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(o.poll(h).is_ok());

    let done = o.wait(h, Duration::from_secs(30)).unwrap();
    assert_eq!(o.forget(h).unwrap(), done);
    assert!(o.poll(h).is_err());
    assert!(o.forget(h).is_err());
}

#[test]
fn finished_jobs_beyond_retention_are_evicted_oldest_first() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = config(tmp.path(), 1, 4);
    cfg.finished_retention = 2;
    let o = Orchestrator::new(cfg, Arc::new(InMemoryCodec::new()), None).unwrap();

    let mut done = Vec::new();
    for _ in 0..3 {
        let h = o.submit(request()).unwrap();
        o.wait(h, Duration::from_secs(30)).unwrap();
        done.push(h);
    }
    assert!(done.iter().all(|h| o.poll(*h).is_ok()));

    let next = o.submit(request()).unwrap();
    assert!(o.poll(done[0]).is_err());
    assert!(o.poll(done[1]).is_ok());
    assert!(o.poll(done[2]).is_ok());
    assert_eq!(
        o.wait(next, Duration::from_secs(30)).unwrap().state,
        JobState::Completed
    );
}
