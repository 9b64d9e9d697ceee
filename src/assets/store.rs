use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::render::CaptionStyle;
use crate::foundation::error::{WyrError, WyrResult};

/// Bold sans fonts probed when no caption font is configured.
pub const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/local/share/fonts/DejaVuSans-Bold.ttf",
    "/Library/Fonts/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    /// Red channel.
    pub(crate) r: u8,
    /// Green channel.
    pub(crate) g: u8,
    /// Blue channel.
    pub(crate) b: u8,
    /// Alpha channel.
    pub(crate) a: u8,
}

impl From<[u8; 4]> for TextBrushRgba8 {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// Loaded font file.
#[derive(Clone, Debug)]
pub struct FontAsset {
    /// Where the font was read from.
    pub path: PathBuf,
    /// Raw font file bytes.
    pub bytes: Arc<Vec<u8>>,
}

impl FontAsset {
    /// Read a font file from disk.
    pub fn read(path: impl AsRef<Path>) -> WyrResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            WyrError::validation(format!("failed to read font '{}': {e}", path.display()))
        })?;
        if bytes.is_empty() {
            return Err(WyrError::validation(format!(
                "font file '{}' is empty",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            bytes: Arc::new(bytes),
        })
    }
}

/// Resolve the caption font for a job.
///
/// An explicitly configured font that cannot be read is an error. Without one, well-known system
/// locations are probed; `Ok(None)` means no font was found and captions will be skipped.
pub fn resolve_caption_font(style: &CaptionStyle) -> WyrResult<Option<FontAsset>> {
    if let Some(p) = &style.font_path {
        return FontAsset::read(p).map(Some);
    }
    for candidate in FONT_SEARCH_PATHS {
        let p = Path::new(candidate);
        if p.is_file()
            && let Ok(font) = FontAsset::read(p)
        {
            tracing::debug!(path = %p.display(), "using system caption font");
            return Ok(Some(font));
        }
    }
    tracing::warn!("no caption font found; captions and labels will not be drawn");
    Ok(None)
}

/// One positioned glyph, in pixels relative to the text block's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    /// Glyph id in the font.
    pub id: u32,
    /// Pen x.
    pub x: f32,
    /// Baseline y.
    pub y: f32,
}

/// Shaped, line-broken and centered text ready for drawing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedText {
    /// Positioned glyphs.
    pub glyphs: Vec<PlacedGlyph>,
    /// Font size the glyphs were shaped at.
    pub font_size: f32,
    /// Width of the box lines were centered in.
    pub width: f32,
    /// Total layout height.
    pub height: f32,
    /// Number of laid out lines.
    pub lines: usize,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out plain text using provided font bytes and styling.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: Option<f32>,
    ) -> WyrResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(WyrError::validation("text size_px must be finite and > 0"));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| WyrError::render("no font families registered from font bytes"))?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| WyrError::render("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        if let Some(w) = max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok(layout)
    }

    /// Lay out `text` wrapped to `box_width_px` with every line horizontally centered in the box.
    pub(crate) fn shape_centered(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        box_width_px: f32,
    ) -> WyrResult<ShapedText> {
        let box_width_px = box_width_px.max(1.0);
        let layout = self.layout_plain(
            text,
            font_bytes,
            size_px,
            TextBrushRgba8::default(),
            Some(box_width_px),
        )?;

        let mut glyphs = Vec::new();
        let mut lines = 0usize;
        for line in layout.lines() {
            let start = glyphs.len();
            let mut min_x = f32::INFINITY;
            let mut max_x = f32::NEG_INFINITY;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let mut x = run.offset();
                let y = run.baseline();
                for g in run.glyphs() {
                    let gx = x + g.x;
                    min_x = min_x.min(gx);
                    max_x = max_x.max(gx + g.advance);
                    glyphs.push(PlacedGlyph {
                        id: g.id,
                        x: gx,
                        y: y - g.y,
                    });
                    x += g.advance;
                }
            }
            if glyphs.len() == start {
                continue;
            }
            lines += 1;
            let dx = (box_width_px - (max_x - min_x)) * 0.5 - min_x;
            for g in &mut glyphs[start..] {
                g.x += dx;
            }
        }

        Ok(ShapedText {
            glyphs,
            font_size: size_px,
            width: box_width_px,
            height: layout.height(),
            lines,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
