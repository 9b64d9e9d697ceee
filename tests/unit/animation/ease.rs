use super::*;

#[test]
fn endpoints_are_fixed() {
    for e in [Ease::Linear, Ease::InCubic, Ease::OutCubic] {
        assert_eq!(e.apply(0.0), 0.0, "{e:?}");
        assert_eq!(e.apply(1.0), 1.0, "{e:?}");
        assert_eq!(e.apply(-3.0), 0.0, "{e:?}");
        assert_eq!(e.apply(7.0), 1.0, "{e:?}");
    }
}

#[test]
fn out_cubic_decelerates_and_in_cubic_accelerates() {
    assert!(Ease::OutCubic.apply(0.5) > 0.5);
    assert!(Ease::InCubic.apply(0.5) < 0.5);
    assert_eq!(Ease::OutCubic.apply(0.5), 0.875);
}

#[test]
fn span_progress_handles_zero_duration() {
    assert_eq!(span_progress(0.25, 0.0, 0.5), 0.5);
    assert_eq!(span_progress(-1.0, 0.0, 0.3), 0.0);
    assert_eq!(span_progress(2.0, 1.0, 0.0), 1.0);
    assert_eq!(span_progress(0.5, 1.0, 0.0), 0.0);
}
