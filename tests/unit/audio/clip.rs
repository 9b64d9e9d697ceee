use super::*;

fn tone(frames: usize) -> AudioClip {
    let samples = (0..frames * 2).map(|i| (i as f32) * 0.001 + 0.5).collect();
    AudioClip::new(100, 2, samples).unwrap()
}

#[test]
fn rejects_ragged_interleaving() {
    assert!(AudioClip::new(48_000, 2, vec![0.0; 3]).is_err());
    assert!(AudioClip::new(0, 2, vec![]).is_err());
}

#[test]
fn duration_from_frames() {
    let c = tone(250);
    assert_eq!(c.frames(), 250);
    assert_eq!(c.duration_secs(), 2.5);
    assert!(!c.is_empty());
    assert!(AudioClip::silence(100, 2, 0).unwrap().is_empty());
}

#[test]
fn fit_pads_with_lead_in_and_tail_silence() {
    let fps = Fps::new(2, 1).unwrap();
    // 4 video frames at 2 fps -> 2 s -> 200 sample frames.
    let fitted = tone(100).fit_to_video(0.5, 4, fps);
    assert_eq!(fitted.frames(), 200);
    assert_eq!(fitted.duration_secs(), 2.0);
    let s = fitted.samples();
    assert!(s[..100].iter().all(|&x| x == 0.0), "lead-in");
    assert_eq!(s[100], 0.5);
    assert!(s[300..].iter().all(|&x| x == 0.0), "tail");
}

#[test]
fn fit_trims_long_clips() {
    let fps = Fps::new(30, 1).unwrap();
    let fitted = tone(1000).fit_to_video(0.0, 30, fps);
    assert_eq!(fitted.frames(), 100);
    assert_eq!(fitted.samples()[0], 0.5);
}

#[test]
fn fit_matches_narration_scenario_length() {
    let fps = Fps::new(30, 1).unwrap();
    let narration = AudioClip::silence(48_000, 2, 48_000 * 14).unwrap();
    let fitted = narration.fit_to_video(0.5, 450, fps);
    assert_eq!(fitted.duration_secs(), 15.0);
}

#[test]
fn writes_f32le_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.f32le");
    let c = AudioClip::new(10, 1, vec![1.0, -0.5]).unwrap();
    c.write_f32le(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
}

#[test]
fn write_f32le_does_not_create_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone");
    let c = AudioClip::new(10, 1, vec![0.25]).unwrap();
    assert!(matches!(
        c.write_f32le(&missing.join("a.f32le")),
        Err(WyrError::Encode(_))
    ));
    assert!(!missing.exists());
}
