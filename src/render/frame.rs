use crate::foundation::core::FrameIndex;
use crate::foundation::error::{WyrError, WyrResult};

/// One rendered frame: premultiplied RGBA8, tightly packed, row-major.
///
/// Frames are immutable once built and are moved by value into the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    index: FrameIndex,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a premultiplied pixel buffer.
    pub fn new(index: FrameIndex, width: u32, height: u32, data: Vec<u8>) -> WyrResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(WyrError::render(format!(
                "frame {} has {} bytes, expected {expected}",
                index.0,
                data.len()
            )));
        }
        Ok(Self {
            index,
            width,
            height,
            data,
        })
    }

    /// Frame index in presentation order.
    pub fn index(&self) -> FrameIndex {
        self.index
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Convert to a straight-alpha image for PNG export.
    pub fn to_rgba_image(&self) -> WyrResult<image::RgbaImage> {
        let mut straight = self.data.clone();
        for px in straight.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| WyrError::render("frame buffer does not match its dimensions"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
