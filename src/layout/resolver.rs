use crate::assets::decode::{PreparedImage, decode_rgba, resize_to};
use crate::config::render::RenderConfig;
use crate::foundation::core::{Canvas, Rect, Size};
use crate::foundation::error::WyrResult;
use crate::request::model::ImageSource;

/// Vertical half of the canvas an option occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Slot {
    /// Top half; the first option.
    Upper,
    /// Bottom half; the second option.
    Lower,
}

impl Slot {
    /// Both slots in draw order.
    pub const ALL: [Slot; 2] = [Slot::Upper, Slot::Lower];

    /// Index into per-slot arrays.
    pub fn index(self) -> usize {
        match self {
            Slot::Upper => 0,
            Slot::Lower => 1,
        }
    }

    /// Inset rectangle the image is centered in.
    pub fn rect(self, canvas: Canvas, margin: f64) -> Rect {
        let w = f64::from(canvas.width);
        let h = f64::from(canvas.height);
        let mid = h * 0.5;
        match self {
            Slot::Upper => Rect::new(margin, margin, w - margin, mid - margin),
            Slot::Lower => Rect::new(margin, mid + margin, w - margin, h - margin),
        }
    }
}

/// Where a caption block is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptionAnchor {
    /// Left edge of the wrapping box.
    pub x: f64,
    /// Top of the text block.
    pub top: f64,
    /// Wrapping width; lines are centered inside it.
    pub width: f64,
}

/// One resolved option slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotLayout {
    /// Which half.
    pub slot: Slot,
    /// Size after aspect-preserving scaling.
    pub scaled_size: Size,
    /// Final resting rectangle on the canvas.
    pub placement: Rect,
    /// Scaled pixels, premultiplied.
    pub image: PreparedImage,
    /// Caption position.
    pub caption: CaptionAnchor,
}

/// Placement of both options, fixed for the lifetime of a job.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLayout {
    /// Canvas the layout was resolved for.
    pub canvas: Canvas,
    /// Upper then lower.
    pub slots: [SlotLayout; 2],
}

impl ResolvedLayout {
    /// Layout of one slot.
    pub fn slot(&self, slot: Slot) -> &SlotLayout {
        &self.slots[slot.index()]
    }
}

/// Uniform downscale factor so the larger side fits `cap`; never upscales.
pub fn fit_scale(width: u32, height: u32, cap: f64) -> f64 {
    (cap / f64::from(width))
        .min(cap / f64::from(height))
        .min(1.0)
}

/// Decode both images and compute their placement and caption anchors.
#[tracing::instrument(skip_all, fields(canvas_w = cfg.canvas.width, canvas_h = cfg.canvas.height))]
pub fn resolve_layout(
    upper: &ImageSource,
    lower: &ImageSource,
    cfg: &RenderConfig,
) -> WyrResult<ResolvedLayout> {
    let s = cfg.px_scale();
    let upper = resolve_slot(Slot::Upper, upper, cfg, s)?;
    let lower = resolve_slot(Slot::Lower, lower, cfg, s)?;
    Ok(ResolvedLayout {
        canvas: cfg.canvas,
        slots: [upper, lower],
    })
}

fn resolve_slot(
    slot: Slot,
    source: &ImageSource,
    cfg: &RenderConfig,
    s: f64,
) -> WyrResult<SlotLayout> {
    let bytes = source.load()?;
    let rgba = decode_rgba(&bytes)?;
    let (w, h) = rgba.dimensions();

    let area = slot.rect(cfg.canvas, cfg.slot_margin_px * s);
    let cap = (f64::from(cfg.max_image_dimension) * s)
        .min(area.width())
        .min(area.height())
        .max(1.0);
    let scale = fit_scale(w, h, cap);
    let sw = ((f64::from(w) * scale).round() as u32).max(1);
    let sh = ((f64::from(h) * scale).round() as u32).max(1);
    let image = resize_to(&rgba, sw, sh);

    let c = area.center();
    let x0 = (c.x - f64::from(sw) * 0.5).round();
    let y0 = (c.y - f64::from(sh) * 0.5).round();
    let placement = Rect::new(x0, y0, x0 + f64::from(sw), y0 + f64::from(sh));

    let side = cfg.caption.side_padding_px * s;
    let caption = CaptionAnchor {
        x: side,
        top: f64::from(cfg.canvas.height) * 0.5 + cfg.caption.offsets_px[slot.index()] * s,
        width: (f64::from(cfg.canvas.width) - 2.0 * side).max(1.0),
    };

    tracing::debug!(?slot, src_w = w, src_h = h, sw, sh, "resolved slot");
    Ok(SlotLayout {
        slot,
        scaled_size: Size::new(f64::from(sw), f64::from(sh)),
        placement,
        image,
        caption,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/layout/resolver.rs"]
mod tests;
