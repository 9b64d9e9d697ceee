use std::io::Cursor;

use super::*;
use crate::foundation::error::WyrError;

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([200, 10, 10, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn fit_scale_caps_larger_side_and_never_upscales() {
    assert_eq!(fit_scale(1000, 1000, 500.0), 0.5);
    assert_eq!(fit_scale(1000, 250, 500.0), 0.5);
    assert_eq!(fit_scale(250, 2000, 500.0), 0.25);
    assert_eq!(fit_scale(100, 50, 500.0), 1.0);
}

#[test]
fn square_images_land_in_their_halves_at_full_size() {
    let cfg = RenderConfig::default();
    let src = ImageSource::uploaded(png(1000, 1000));
    let layout = resolve_layout(&src, &src, &cfg).unwrap();

    let up = layout.slot(Slot::Upper);
    assert_eq!(up.scaled_size, Size::new(500.0, 500.0));
    assert_eq!(up.placement, Rect::new(290.0, 230.0, 790.0, 730.0));
    assert_eq!((up.image.width, up.image.height), (500, 500));

    let down = layout.slot(Slot::Lower);
    assert_eq!(down.placement, Rect::new(290.0, 1190.0, 790.0, 1690.0));

    assert_eq!(up.caption.top, 760.0);
    assert_eq!(down.caption.top, 1000.0);
    assert_eq!(up.caption.width, 1000.0);
}

#[test]
fn wide_image_keeps_aspect_ratio() {
    let cfg = RenderConfig::default();
    let src = ImageSource::uploaded(png(2000, 500));
    let layout = resolve_layout(&src, &src, &cfg).unwrap();
    let up = layout.slot(Slot::Upper);
    assert_eq!(up.scaled_size, Size::new(500.0, 125.0));
    assert_eq!(layout.canvas.rect().intersect(up.placement), up.placement);
}

#[test]
fn small_canvas_scales_cap_with_width() {
    let cfg = RenderConfig {
        canvas: Canvas {
            width: 36,
            height: 64,
        },
        ..RenderConfig::default()
    };
    let src = ImageSource::uploaded(png(1000, 1000));
    let layout = resolve_layout(&src, &src, &cfg).unwrap();
    for slot in Slot::ALL {
        let l = layout.slot(slot);
        let area = slot.rect(cfg.canvas, cfg.slot_margin_px * cfg.px_scale());
        assert!(l.scaled_size.width <= area.width().ceil());
        assert!(l.scaled_size.height <= area.height().ceil());
    }
}

#[test]
fn undecodable_image_is_decode_error() {
    let cfg = RenderConfig::default();
    let good = ImageSource::uploaded(png(10, 10));
    let bad = ImageSource::uploaded(b"\x89PNG broken".to_vec());
    let err = resolve_layout(&good, &bad, &cfg).unwrap_err();
    assert!(matches!(err, WyrError::Decode(_)));
}
