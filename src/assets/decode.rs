use std::sync::Arc;

use crate::foundation::core::Canvas;
use crate::foundation::error::{WyrError, WyrResult};
use crate::foundation::math::premultiply_rgba8_in_place;

use image::imageops::FilterType;

#[derive(Clone, Debug, PartialEq)]
/// Raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded image bytes into straight RGBA8.
///
/// Undecodable input and zero-area images are both reported as [`WyrError::Decode`].
pub fn decode_rgba(bytes: &[u8]) -> WyrResult<image::RgbaImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| WyrError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Err(WyrError::decode(format!("image has zero area ({w}x{h})")));
    }
    Ok(rgba)
}

/// Resample to exactly `width x height` and premultiply.
pub fn resize_to(src: &image::RgbaImage, width: u32, height: u32) -> PreparedImage {
    let width = width.max(1);
    let height = height.max(1);
    if src.dimensions() == (width, height) {
        return premultiply(src.clone());
    }
    premultiply(image::imageops::resize(
        src,
        width,
        height,
        FilterType::Lanczos3,
    ))
}

/// Scale `src` to cover the whole canvas preserving aspect ratio, then center-crop.
pub fn cover_canvas(src: &image::RgbaImage, canvas: Canvas) -> PreparedImage {
    let (sw, sh) = src.dimensions();
    let scale = (f64::from(canvas.width) / f64::from(sw))
        .max(f64::from(canvas.height) / f64::from(sh));
    let w = ((f64::from(sw) * scale).ceil() as u32).max(canvas.width);
    let h = ((f64::from(sh) * scale).ceil() as u32).max(canvas.height);
    let scaled = image::imageops::resize(src, w, h, FilterType::Triangle);
    let x = (w - canvas.width) / 2;
    let y = (h - canvas.height) / 2;
    let cropped = image::imageops::crop_imm(&scaled, x, y, canvas.width, canvas.height).to_image();
    premultiply(cropped)
}

fn premultiply(rgba: image::RgbaImage) -> PreparedImage {
    let (width, height) = rgba.dimensions();
    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
