use rand::Rng;

use crate::config::render::RenderConfig;
use crate::foundation::core::Rect;
use crate::foundation::error::{WyrError, WyrResult};
use crate::layout::resolver::Slot;
use crate::request::model::PercentageSpec;

/// Complementary vote split; `value1 + value2 == 100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Percentages {
    value1: u8,
    value2: u8,
}

impl Percentages {
    /// Build a pair, rejecting values that do not add up to 100.
    pub fn new(value1: u8, value2: u8) -> WyrResult<Self> {
        if value1 > 100 || value2 > 100 || u16::from(value1) + u16::from(value2) != 100 {
            return Err(WyrError::validation(format!(
                "percentages must add up to 100, got {value1} + {value2}"
            )));
        }
        Ok(Self { value1, value2 })
    }

    /// Value for a slot.
    pub fn get(self, slot: Slot) -> u8 {
        match slot {
            Slot::Upper => self.value1,
            Slot::Lower => self.value2,
        }
    }

    /// Label drawn next to a bar, e.g. `"60%"`.
    pub fn label(self, slot: Slot) -> String {
        format!("{}%", self.get(slot))
    }
}

/// Reject manual splits that cannot be resolved.
pub fn validate_spec(spec: PercentageSpec) -> WyrResult<()> {
    match spec {
        PercentageSpec::Auto => Ok(()),
        PercentageSpec::Manual { value1, value2 } => Percentages::new(value1, value2).map(|_| ()),
    }
}

/// Resolve a spec with the thread-local RNG.
pub fn resolve(spec: PercentageSpec, auto_range: [u8; 2]) -> WyrResult<Percentages> {
    resolve_with_rng(spec, auto_range, &mut rand::thread_rng())
}

/// Resolve a spec, drawing auto values from `rng`.
///
/// Auto draws `value1` uniformly from the inclusive `auto_range`, itself clamped to `[1, 99]`.
pub fn resolve_with_rng<R: Rng + ?Sized>(
    spec: PercentageSpec,
    auto_range: [u8; 2],
    rng: &mut R,
) -> WyrResult<Percentages> {
    match spec {
        PercentageSpec::Manual { value1, value2 } => Percentages::new(value1, value2),
        PercentageSpec::Auto => {
            let lo = auto_range[0].clamp(1, 99);
            let hi = auto_range[1].clamp(lo, 99);
            let v = rng.gen_range(lo..=hi);
            Percentages::new(v, 100 - v)
        }
    }
}

/// Results overlay geometry for one option.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarGeometry {
    /// Unfilled track, full 100% width.
    pub track: Rect,
    /// Filled bar at full progress.
    pub fill: Rect,
    /// Bottom edge of the percentage label box.
    pub label_bottom: f64,
}

/// Bar placement for a slot: centered horizontally at the slot's vertical center.
///
/// The fill grows from the track's left edge; its width is proportional to the percentage.
pub fn bar_geometry(cfg: &RenderConfig, p: Percentages, slot: Slot) -> BarGeometry {
    let s = cfg.px_scale();
    let w = f64::from(cfg.canvas.width);
    let h = f64::from(cfg.canvas.height);
    let track_w = w * cfg.results.bar_max_width_frac;
    let bar_h = cfg.results.bar_height_px * s;
    let cy = match slot {
        Slot::Upper => h * 0.25,
        Slot::Lower => h * 0.75,
    };
    let x0 = (w - track_w) * 0.5;
    let y0 = cy - bar_h * 0.5;
    let track = Rect::new(x0, y0, x0 + track_w, y0 + bar_h);
    let fill_w = track_w * f64::from(p.get(slot)) / 100.0;
    let fill = Rect::new(x0, y0, x0 + fill_w, y0 + bar_h);
    let gap = 24.0 * s;
    BarGeometry {
        track,
        fill,
        label_bottom: y0 - gap,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/results/percentages.rs"]
mod tests;
