use super::*;

#[test]
fn default_config_is_valid_and_matches_short_format() {
    let cfg = RenderConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.canvas, Canvas::PORTRAIT_1080);
    assert_eq!(cfg.fps.num, 30);
    assert_eq!(cfg.base_duration_secs, 10.0);
    assert_eq!(cfg.animation_duration_secs, 0.3);
    assert_eq!(cfg.narration.padding_secs(), 1.0);
    assert_eq!(cfg.px_scale(), 1.0);
}

#[test]
fn partial_json_overrides_only_given_keys() {
    let json = r#"{
        "canvas": { "width": 36, "height": 64 },
        "base_duration_secs": 4.0,
        "background": { "kind": "color", "rgba": [1, 2, 3, 255] }
    }"#;
    let cfg = RenderConfig::from_reader(json.as_bytes()).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.canvas.width, 36);
    assert_eq!(cfg.base_duration_secs, 4.0);
    assert_eq!(cfg.background, Background::Color { rgba: [1, 2, 3, 255] });
    assert_eq!(cfg.animation_duration_secs, 0.3);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = RenderConfig::from_reader(r#"{ "durration": 3 }"#.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("serialization error"));
}

#[test]
fn invalid_values_fail_validation() {
    let cfg = RenderConfig {
        base_duration_secs: -1.0,
        ..RenderConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = RenderConfig {
        auto_percent_range: [0, 100],
        ..RenderConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = RenderConfig {
        canvas: Canvas {
            width: 1920,
            height: 1080,
        },
        ..RenderConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn orchestrator_defaults_validate_and_zero_limits_do_not() {
    use crate::config::orchestrator::OrchestratorConfig;

    OrchestratorConfig::default().validate().unwrap();
    for bad in [
        OrchestratorConfig {
            worker_count: 0,
            ..OrchestratorConfig::default()
        },
        OrchestratorConfig {
            backlog: 0,
            ..OrchestratorConfig::default()
        },
        OrchestratorConfig {
            job_deadline: Some(std::time::Duration::ZERO),
            ..OrchestratorConfig::default()
        },
    ] {
        assert!(bad.validate().is_err());
    }
}
