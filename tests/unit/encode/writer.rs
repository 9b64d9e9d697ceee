use super::*;
use crate::foundation::core::FrameIndex;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
    }
}

fn frame(i: u64) -> Frame {
    Frame::new(FrameIndex(i), 2, 2, vec![i as u8; 16]).unwrap()
}

#[test]
fn in_memory_captures_frames_and_audio() {
    let dir = tempfile::tempdir().unwrap();
    let codec = InMemoryCodec::new();
    let out = dir.path().join("out.mp4");
    let mut w = codec.open(&out, cfg(), dir.path()).unwrap();
    for i in 0..3 {
        w.write_frame(frame(i)).unwrap();
    }
    let clip = AudioClip::silence(48_000, 2, 10).unwrap();
    w.attach_audio(&clip).unwrap();
    assert_eq!(w.finalize().unwrap(), out);
    assert!(out.exists());

    let caps = codec.captures();
    assert_eq!(caps.len(), 1);
    assert_eq!(caps[0].frames.len(), 3);
    assert_eq!(caps[0].audio.as_ref(), Some(&clip));
}

#[test]
fn out_of_order_frames_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let codec = InMemoryCodec::new();
    let mut w = codec.open(&dir.path().join("o.mp4"), cfg(), dir.path()).unwrap();
    w.write_frame(frame(0)).unwrap();
    let err = w.write_frame(frame(2)).unwrap_err();
    assert!(matches!(err, WyrError::Encode(_)));
}

#[test]
fn frame_size_mismatch_is_rejected() {
    let mut order = FrameOrder::new(cfg());
    let wrong = Frame::new(FrameIndex(0), 1, 1, vec![0; 4]).unwrap();
    assert!(order.accept(&wrong).is_err());
    order.accept(&frame(0)).unwrap();
    assert_eq!(order.written(), 1);
}

#[test]
fn injected_failure_surfaces_as_encode_error() {
    let dir = tempfile::tempdir().unwrap();
    let codec = InMemoryCodec::new().failing_at(1);
    let mut w = codec.open(&dir.path().join("o.mp4"), cfg(), dir.path()).unwrap();
    w.write_frame(frame(0)).unwrap();
    assert!(matches!(w.write_frame(frame(1)), Err(WyrError::Encode(_))));
}
