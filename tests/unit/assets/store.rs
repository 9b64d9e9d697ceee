use super::*;

fn system_font() -> Option<FontAsset> {
    FONT_SEARCH_PATHS
        .iter()
        .find_map(|p| FontAsset::read(p).ok())
}

#[test]
fn explicit_missing_font_is_validation_error() {
    let style = CaptionStyle {
        font_path: Some(PathBuf::from("/no/such/font.ttf")),
        ..CaptionStyle::default()
    };
    let err = resolve_caption_font(&style).unwrap_err();
    assert!(matches!(err, WyrError::Validation(_)));
}

#[test]
fn brush_from_rgba_array() {
    let b = TextBrushRgba8::from([1, 2, 3, 4]);
    assert_eq!((b.r, b.g, b.b, b.a), (1, 2, 3, 4));
}

#[test]
fn layout_rejects_non_positive_size() {
    let mut engine = TextLayoutEngine::new();
    assert!(
        engine
            .layout_plain("x", &[], 0.0, TextBrushRgba8::default(), None)
            .is_err()
    );
}

#[test]
fn centered_shaping_wraps_and_stays_in_box() {
    let Some(font) = system_font() else {
        return;
    };
    let mut engine = TextLayoutEngine::new();
    let one = engine
        .shape_centered("Fly", &font.bytes, 40.0, 400.0)
        .unwrap();
    assert_eq!(one.lines, 1);
    assert_eq!(one.glyphs.len(), 3);
    let min_x = one.glyphs.iter().map(|g| g.x).fold(f32::INFINITY, f32::min);
    assert!(min_x > 100.0, "short line should be centered, min_x={min_x}");

    let wrapped = engine
        .shape_centered("Be able to talk to every animal", &font.bytes, 40.0, 200.0)
        .unwrap();
    assert!(wrapped.lines > 1);
    assert!(wrapped.height > one.height);
    assert!(wrapped.glyphs.iter().all(|g| g.x >= -1.0 && g.x <= 201.0));
}
