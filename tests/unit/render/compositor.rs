use std::io::Cursor;

use super::*;
use crate::assets::store::{FONT_SEARCH_PATHS, FontAsset};
use crate::config::render::RenderConfig;
use crate::foundation::core::Canvas;
use crate::layout::resolver::resolve_layout;
use crate::render::scene::SceneInputs;
use crate::request::model::ImageSource;
use crate::results::percentages::Percentages;

fn png(px: [u8; 4]) -> ImageSource {
    let img = image::RgbaImage::from_pixel(1000, 1000, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageSource::uploaded(buf)
}

fn scene(
    width: u32,
    percentages: Option<Percentages>,
    font: Option<&FontAsset>,
) -> Arc<PreparedScene> {
    let cfg = RenderConfig {
        canvas: Canvas {
            width,
            height: width * 16 / 9,
        },
        ..RenderConfig::default()
    };
    let layout = resolve_layout(&png([200, 10, 10, 255]), &png([10, 10, 200, 255]), &cfg).unwrap();
    Arc::new(
        PreparedScene::prepare(SceneInputs {
            cfg: &cfg,
            layout,
            captions: ["Fly", "Swim"],
            percentages,
            narration_secs: None,
            font,
        })
        .unwrap(),
    )
}

#[test]
fn first_frame_is_background_only() {
    let s = scene(90, None, None);
    let mut w = CompositorWorker::new(s).unwrap();
    let f = w.render_frame(FrameIndex(0)).unwrap();
    assert_eq!((f.width(), f.height()), (90, 160));
    assert!(f.data().chunks_exact(4).all(|p| p == [24, 24, 32, 255]));
}

#[test]
fn held_frame_shows_both_images_at_rest() {
    let s = scene(90, None, None);
    assert_eq!(s.frame_count, 300);
    let up = s.placement(Slot::Upper);
    let down = s.placement(Slot::Lower);
    let mut w = CompositorWorker::new(s).unwrap();
    let f = w.render_frame(FrameIndex(150)).unwrap();
    let c = up.center();
    assert_eq!(f.pixel(c.x as u32, c.y as u32), [200, 10, 10, 255]);
    let c = down.center();
    assert_eq!(f.pixel(c.x as u32, c.y as u32), [10, 10, 200, 255]);
    assert_eq!(f.pixel(1, 1), [24, 24, 32, 255]);
}

#[test]
fn rendering_is_deterministic_across_workers_and_repeats() {
    let s = scene(90, Some(Percentages::new(60, 40).unwrap()), None);
    let mut a = CompositorWorker::new(s.clone()).unwrap();
    let mut b = CompositorWorker::new(s).unwrap();
    for idx in [0u64, 4, 150, 285, 299] {
        let fa = a.render_frame(FrameIndex(idx)).unwrap();
        let fb = b.render_frame(FrameIndex(idx)).unwrap();
        assert_eq!(fa, fb, "frame {idx}");
    }
    let first = a.render_frame(FrameIndex(4)).unwrap();
    a.render_frame(FrameIndex(285)).unwrap();
    assert_eq!(a.render_frame(FrameIndex(4)).unwrap(), first);
}

#[test]
fn results_overlay_draws_panel_and_bars() {
    let s = scene(90, Some(Percentages::new(60, 40).unwrap()), None);
    let mut w = CompositorWorker::new(s).unwrap();
    let hold = w.render_frame(FrameIndex(150)).unwrap();
    let results = w.render_frame(FrameIndex(285)).unwrap();

    // Dimmed background.
    assert_eq!(hold.pixel(2, 2), [24, 24, 32, 255]);
    let dim = results.pixel(2, 2);
    assert!(dim[0] < 24 && dim[2] < 32, "{dim:?}");

    // Upper bar fill starts at the track's left edge, outside the image.
    assert_eq!(results.pixel(12, 40), [229, 57, 53, 255]);
    assert_eq!(results.pixel(12, 120), [30, 136, 229, 255]);
    // 40% of the lower track ends well before 60% of the upper one.
    assert_eq!(results.pixel(45, 40), [229, 57, 53, 255]);
    assert_ne!(results.pixel(45, 120), [30, 136, 229, 255]);
}

#[test]
fn frame_outside_video_is_rejected() {
    let s = scene(90, None, None);
    let mut w = CompositorWorker::new(s).unwrap();
    assert!(w.render_frame(FrameIndex(300)).is_err());
    let last = w.render_at_secs(99.0).unwrap();
    assert_eq!(last.index(), FrameIndex(299));
}

#[test]
fn captions_are_drawn_when_a_font_is_available() {
    let Some(font) = FONT_SEARCH_PATHS.iter().find_map(|p| FontAsset::read(p).ok()) else {
        return;
    };
    let s = scene(360, None, Some(&font));
    assert!(s.has_text());
    let mut w = CompositorWorker::new(s).unwrap();
    let before = w.render_frame(FrameIndex(10)).unwrap();
    let after = w.render_frame(FrameIndex(150)).unwrap();
    let white_rows = |f: &Frame| {
        (250..320).any(|y| (0..360).any(|x| f.pixel(x, y).iter().take(3).all(|&c| c > 200)))
    };
    assert!(!white_rows(&before));
    assert!(white_rows(&after));
}
