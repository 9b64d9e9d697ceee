use std::sync::Arc;

use crate::foundation::core::{Affine, FrameIndex, Rect, Vec2};
use crate::foundation::error::{WyrError, WyrResult};
use crate::layout::resolver::Slot;
use crate::assets::decode::PreparedImage;
use crate::render::frame::Frame;
use crate::render::scene::{Plate, PreparedScene, TextBlock, TextStyle};
use crate::animation::timeline::Timeline;

/// Number of offset copies used to draw a text outline.
const OUTLINE_TAPS: usize = 16;

#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

/// Per-thread frame renderer.
///
/// Owns the raster context, the output pixmap and paints derived from the shared scene. The
/// context is reset before every frame, so output depends only on the scene and the frame index.
pub struct CompositorWorker {
    scene: Arc<PreparedScene>,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    plate: Option<ImagePaint>,
    images: Vec<ImagePaint>,
    font: Option<vello_cpu::peniko::FontData>,
}

impl CompositorWorker {
    /// Build a worker for `scene`.
    pub fn new(scene: Arc<PreparedScene>) -> WyrResult<Self> {
        let (w, h) = canvas_u16(&scene)?;
        let plate = match &scene.plate {
            Plate::Solid(_) => None,
            Plate::Image(img) => Some(image_paint(img)?),
        };
        let images = Slot::ALL
            .iter()
            .map(|&slot| image_paint(&scene.layout.slot(slot).image))
            .collect::<WyrResult<Vec<_>>>()?;
        let font = scene.font.as_ref().map(|bytes| {
            vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from((**bytes).clone()),
                0,
            )
        });
        Ok(Self {
            scene,
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
            plate,
            images,
            font,
        })
    }

    /// Scene this worker draws.
    pub fn scene(&self) -> &Arc<PreparedScene> {
        &self.scene
    }

    /// Render frame `index`, sampled at `index / fps`.
    pub fn render_frame(&mut self, index: FrameIndex) -> WyrResult<Frame> {
        if index.0 >= self.scene.frame_count {
            return Err(WyrError::validation(format!(
                "frame {} is outside the video ({} frames)",
                index.0, self.scene.frame_count
            )));
        }
        let t = Timeline::frame_time(self.scene.fps, index.0);
        self.render_at(index, t)
    }

    /// Render the frame nearest to `secs`.
    pub fn render_at_secs(&mut self, secs: f64) -> WyrResult<Frame> {
        let last = self.scene.frame_count.saturating_sub(1);
        let idx = self.scene.fps.secs_to_frames_round(secs).min(last);
        self.render_frame(FrameIndex(idx))
    }

    fn render_at(&mut self, index: FrameIndex, t: f64) -> WyrResult<Frame> {
        let scene = self.scene.clone();
        let canvas_rect = rect_to_cpu(scene.canvas.rect());

        self.pixmap.data_as_u8_slice_mut().fill(0);
        let ctx = &mut self.ctx;
        ctx.reset();
        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        match (&scene.plate, &self.plate) {
            (_, Some(p)) => ctx.set_paint(p.paint.clone()),
            (Plate::Solid(c), None) => ctx.set_paint(color(*c)),
            (Plate::Image(_), None) => {
                return Err(WyrError::render("background paint missing"));
            }
        }
        ctx.fill_rect(&canvas_rect);

        for slot in Slot::ALL {
            let placement = scene.placement(slot);
            let st = scene.timeline.image_state(slot, placement, t);
            if st.opacity <= 0.0 {
                continue;
            }
            let p = &self.images[slot.index()];
            let (w, h) = (f64::from(p.w), f64::from(p.h));
            let center = placement.center() + st.offset;
            let tr = Affine::translate(center.to_vec2())
                * Affine::rotate(st.rotation)
                * Affine::scale(st.scale)
                * Affine::translate(Vec2::new(-w * 0.5, -h * 0.5));
            ctx.set_transform(affine_to_cpu(tr));
            ctx.set_paint(p.paint.clone());
            with_opacity(ctx, st.opacity, |ctx| {
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            });
        }

        if let (Some(font), Some(blocks)) = (&self.font, &scene.captions) {
            let opacity = scene.timeline.caption_opacity(t);
            if opacity > 0.0 {
                with_opacity(ctx, opacity, |ctx| {
                    for block in blocks {
                        draw_text(ctx, font, block, &scene.text_style);
                    }
                });
            }
        }

        if let Some(layer) = &scene.results
            && let Some(state) = scene.timeline.results_state(t)
        {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(color(layer.panel));
            ctx.fill_rect(&canvas_rect);
            for slot in Slot::ALL {
                let g = layer.geometry[slot.index()];
                ctx.set_paint(color(layer.track));
                ctx.fill_rect(&rect_to_cpu(g.track));
                let fill_w = g.fill.width() * state.bar_progress;
                if fill_w > 0.0 {
                    ctx.set_paint(color(layer.bars[slot.index()]));
                    ctx.fill_rect(&rect_to_cpu(Rect::new(
                        g.fill.x0,
                        g.fill.y0,
                        g.fill.x0 + fill_w,
                        g.fill.y1,
                    )));
                }
            }
            if let (Some(font), Some(labels)) = (&self.font, &layer.labels)
                && state.label_opacity > 0.0
            {
                with_opacity(ctx, state.label_opacity, |ctx| {
                    for block in labels {
                        draw_text(ctx, font, block, &scene.text_style);
                    }
                });
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);
        Frame::new(
            index,
            scene.canvas.width,
            scene.canvas.height,
            self.pixmap.data_as_u8_slice().to_vec(),
        )
    }
}

fn with_opacity(
    ctx: &mut vello_cpu::RenderContext,
    opacity: f64,
    f: impl FnOnce(&mut vello_cpu::RenderContext),
) {
    let layered = opacity < 1.0;
    if layered {
        ctx.push_opacity_layer(opacity.clamp(0.0, 1.0) as f32);
    }
    f(ctx);
    if layered {
        ctx.pop_layer();
    }
}

/// Outline pass (offset copies in the stroke color) followed by the fill pass.
fn draw_text(
    ctx: &mut vello_cpu::RenderContext,
    font: &vello_cpu::peniko::FontData,
    block: &TextBlock,
    style: &TextStyle,
) {
    let origin = block.origin.to_vec2();
    if style.stroke_width > 0.0 {
        ctx.set_paint(color(style.stroke));
        for i in 0..OUTLINE_TAPS {
            let a = std::f64::consts::TAU * (i as f64) / (OUTLINE_TAPS as f64);
            let d = Vec2::new(a.cos(), a.sin()) * style.stroke_width;
            ctx.set_transform(affine_to_cpu(Affine::translate(origin + d)));
            fill_glyphs(ctx, font, block);
        }
    }
    ctx.set_paint(color(style.fill));
    ctx.set_transform(affine_to_cpu(Affine::translate(origin)));
    fill_glyphs(ctx, font, block);
}

fn fill_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    font: &vello_cpu::peniko::FontData,
    block: &TextBlock,
) {
    let glyphs = block.shaped.glyphs.iter().map(|g| vello_cpu::Glyph {
        id: g.id,
        x: g.x,
        y: g.y,
    });
    ctx.glyph_run(font)
        .font_size(block.shaped.font_size)
        .fill_glyphs(glyphs);
}

fn color([r, g, b, a]: [u8; 4]) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn canvas_u16(scene: &PreparedScene) -> WyrResult<(u16, u16)> {
    let w: u16 = scene
        .canvas
        .width
        .try_into()
        .map_err(|_| WyrError::render("canvas width exceeds u16"))?;
    let h: u16 = scene
        .canvas
        .height
        .try_into()
        .map_err(|_| WyrError::render("canvas height exceeds u16"))?;
    Ok((w, h))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn image_paint(img: &PreparedImage) -> WyrResult<ImagePaint> {
    let pixmap = pixmap_from_premul_bytes(&img.rgba8_premul, img.width, img.height)?;
    Ok(ImagePaint {
        paint: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
        w: img.width,
        h: img.height,
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> WyrResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| WyrError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| WyrError::render("pixmap height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(WyrError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
