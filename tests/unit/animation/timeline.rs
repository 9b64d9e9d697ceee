use super::*;

fn cfg() -> RenderConfig {
    RenderConfig::default()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn default_phases_without_results() {
    let p = TimelinePhases::resolve(&cfg(), false, None);
    assert_eq!(p.total, 10.0);
    assert_eq!(p.entrance, PhaseSpan { start: 0.0, end: 0.3 });
    assert_eq!(p.hold.start, 0.3);
    assert!(approx(p.hold.end, 9.7));
    assert!(p.results.is_none());
    assert!(approx(p.exit.start, 9.7));
    assert_eq!(p.frame_count(cfg().fps), 300);
}

#[test]
fn phases_are_contiguous_and_sum_to_total() {
    for (has_results, narr) in [(false, None), (true, None), (true, Some(14.0)), (false, Some(3.0))] {
        let p = TimelinePhases::resolve(&cfg(), has_results, narr);
        let results = p.results.map(|r| r.duration()).unwrap_or(0.0);
        let sum = p.entrance.duration() + p.hold.duration() + results + p.exit.duration();
        assert!(approx(sum, p.total), "{p:?}");
        assert_eq!(p.entrance.end, p.hold.start);
        if let Some(r) = p.results {
            assert!(approx(r.start, p.hold.end));
            assert!(approx(r.end, p.exit.start));
            assert!(approx(r.duration(), 1.0));
        }
        assert!(p.hold.duration() >= 0.0);
    }
}

#[test]
fn narration_extends_hold_only() {
    let p = TimelinePhases::resolve(&cfg(), true, Some(14.0));
    assert_eq!(p.total, 15.0);
    assert!(approx(p.entrance.duration(), 0.3));
    assert!(approx(p.exit.duration(), 0.3));
    assert!(approx(p.hold.duration(), 15.0 - 0.3 - 0.3 - 1.0));

    let short = TimelinePhases::resolve(&cfg(), true, Some(2.0));
    assert_eq!(short.total, 10.0);
}

#[test]
fn hold_floors_at_zero_for_tiny_base_duration() {
    let c = RenderConfig {
        base_duration_secs: 0.5,
        ..cfg()
    };
    let p = TimelinePhases::resolve(&c, true, None);
    assert!(approx(p.total, 1.6));
    assert!(approx(p.hold.duration(), 0.0));
}

#[test]
fn entrance_boundaries() {
    let tl = Timeline::new(&cfg(), false, None);
    let placement = Rect::new(290.0, 230.0, 790.0, 730.0);

    let start = tl.image_state(Slot::Upper, placement, 0.0);
    assert_eq!(start.opacity, 0.0);
    assert_eq!(start.offset, Vec2::new(0.0, -730.0));
    assert!(approx(start.scale, 0.8));
    assert!(approx(start.rotation, std::f64::consts::FRAC_PI_2));

    assert_eq!(tl.image_state(Slot::Upper, placement, 0.3), ElementState::REST);
    assert_eq!(tl.image_state(Slot::Upper, placement, 5.0), ElementState::REST);

    let mid = tl.image_state(Slot::Upper, placement, 0.15);
    assert!(mid.opacity > 0.5, "ease-out is past halfway at mid-phase");
    assert!(mid.offset.y < 0.0);
}

#[test]
fn lower_image_enters_from_below_and_exits_downward() {
    let tl = Timeline::new(&cfg(), false, None);
    let placement = Rect::new(290.0, 1190.0, 790.0, 1690.0);
    let start = tl.image_state(Slot::Lower, placement, 0.0);
    assert_eq!(start.offset, Vec2::new(0.0, 730.0));

    let leaving = tl.image_state(Slot::Lower, placement, 9.9);
    assert!(leaving.offset.y > 0.0);
    assert!(leaving.opacity < 1.0 && leaving.opacity > 0.0);
}

#[test]
fn captions_fade_in_at_caption_start_and_out_on_exit() {
    let tl = Timeline::new(&cfg(), false, None);
    assert_eq!(tl.caption_opacity(0.5), 0.0);
    assert_eq!(tl.caption_opacity(1.0), 0.0);
    assert!(approx(tl.caption_opacity(1.15), 0.5));
    assert_eq!(tl.caption_opacity(2.0), 1.0);
    assert!(tl.caption_opacity(9.9) < 1.0);
}

#[test]
fn results_state_only_inside_results_phase() {
    let tl = Timeline::new(&cfg(), true, None);
    let r = tl.phases.results.unwrap();
    assert!(tl.results_state(r.start - 0.01).is_none());
    let s0 = tl.results_state(r.start).unwrap();
    assert_eq!(s0.bar_progress, 0.0);
    let s1 = tl.results_state(r.start + 0.5).unwrap();
    assert!(s1.bar_progress > s1.label_opacity);
    assert!(tl.results_state(r.end).is_none());

    let none = Timeline::new(&cfg(), false, None);
    assert!(none.results_state(9.0).is_none());
}

#[test]
fn frame_time_is_index_over_fps() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(Timeline::frame_time(fps, 0), 0.0);
    assert!(approx(Timeline::frame_time(fps, 45), 1.5));
}
