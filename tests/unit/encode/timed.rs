use super::*;
use crate::encode::writer::InMemoryCodec;
use crate::foundation::core::{Fps, FrameIndex};

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
    }
}

fn frame(i: u64) -> Frame {
    Frame::new(FrameIndex(i), 2, 2, vec![0; 16]).unwrap()
}

#[test]
fn forwards_calls_to_inner_writer() {
    let dir = tempfile::tempdir().unwrap();
    let codec = InMemoryCodec::new();
    let out = dir.path().join("o.mp4");
    let mut w = Box::new(
        TimeBoxedWriter::open(
            Arc::new(codec.clone()),
            &out,
            cfg(),
            dir.path(),
            Duration::from_secs(5),
            None,
        )
        .unwrap(),
    );
    w.write_frame(frame(0)).unwrap();
    w.write_frame(frame(1)).unwrap();
    assert_eq!(w.finalize().unwrap(), out);
    assert_eq!(codec.captures()[0].frames.len(), 2);
}

#[test]
fn stalled_call_times_out_and_poisons_writer() {
    let dir = tempfile::tempdir().unwrap();
    let codec = InMemoryCodec::new().stalling_at(1);
    let mut w = TimeBoxedWriter::open(
        Arc::new(codec),
        &dir.path().join("o.mp4"),
        cfg(),
        dir.path(),
        Duration::from_millis(50),
        None,
    )
    .unwrap();
    w.write_frame(frame(0)).unwrap();
    let err = w.write_frame(frame(1)).unwrap_err();
    assert!(matches!(err, WyrError::Timeout(_)), "{err}");
    assert!(matches!(w.write_frame(frame(2)), Err(WyrError::Encode(_))));
}

#[test]
fn timeout_aborts_the_stalled_writer() {
    let dir = tempfile::tempdir().unwrap();
    let codec = InMemoryCodec::new().stalling_at(0);
    let mut w = TimeBoxedWriter::open(
        Arc::new(codec.clone()),
        &dir.path().join("o.mp4"),
        cfg(),
        dir.path(),
        Duration::from_millis(50),
        None,
    )
    .unwrap();
    assert!(w.abort_handle().is_some());
    assert!(matches!(w.write_frame(frame(0)), Err(WyrError::Timeout(_))));

    let t0 = Instant::now();
    while codec.aborted_writers() == 0 {
        assert!(t0.elapsed() < Duration::from_secs(5), "stalled writer never released");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn expired_deadline_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let res = TimeBoxedWriter::open(
        Arc::new(InMemoryCodec::new()),
        &dir.path().join("o.mp4"),
        cfg(),
        dir.path(),
        Duration::from_secs(5),
        Some(Instant::now()),
    );
    assert!(matches!(res, Err(WyrError::Timeout(_))));
}

#[test]
fn inner_errors_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = TimeBoxedWriter::open(
        Arc::new(InMemoryCodec::new().failing_at(0)),
        &dir.path().join("o.mp4"),
        cfg(),
        dir.path(),
        Duration::from_secs(5),
        None,
    )
    .unwrap();
    assert!(matches!(w.write_frame(frame(0)), Err(WyrError::Encode(_))));
}
