// ============================================================================
// HEAT BRUSH: Gaussian-kernel add / remove on the intensity field
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};
use crate::field::{IntensityField, clamp_unit};

/// Gaussian sigma is `radius / SIGMA_DIVISOR`.
const SIGMA_DIVISOR: f32 = 2.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrushMode {
    Add,
    Remove,
}

impl BrushMode {
    pub fn label(&self) -> &'static str {
        match self {
            BrushMode::Add => "Add heat",
            BrushMode::Remove => "Remove heat",
        }
    }
}

/// Per-stroke brush settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrushParams {
    /// Footprint radius in pixels. Must be finite and positive.
    pub radius: f32,
    /// Energy per application, `0.0..=1.0`.
    pub strength: f32,
    /// Tip density, multiplies `strength`. `0.0..=1.0`.
    #[serde(alias = "alpha")]
    pub alpha_cap: f32,
}

impl Default for BrushParams {
    fn default() -> Self {
        Self {
            radius: 60.0,
            strength: 0.15,
            alpha_cap: 1.0,
        }
    }
}

impl BrushParams {
    pub fn new(radius: f32, strength: f32, alpha_cap: f32) -> Self {
        Self {
            radius,
            strength,
            alpha_cap,
        }
    }

    /// Reject shapes that cannot describe a footprint.
    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(HeatError::Configuration(format!(
                "brush radius must be a positive number, got {}",
                self.radius
            )));
        }
        Ok(())
    }
}

/// Inclusive cell rectangle touched by one brush application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

/// Energy delivered at distance `dist` from the brush center, before the
/// strength and alpha scaling. Zero at and beyond the radius.
#[inline]
pub fn kernel(dist: f32, radius: f32) -> f32 {
    if dist >= radius {
        return 0.0;
    }
    let sigma = radius / SIGMA_DIVISOR;
    let gaussian = (-(dist * dist) / (2.0 * sigma * sigma)).exp();
    let fade_out = 1.0 - dist / radius;
    gaussian * fade_out
}

/// Apply one brush sample centred on `(x, y)`.
///
/// The box `[floor(x) - r, floor(x) + r]` (same for y) is clipped to the
/// field, so samples partly or wholly off the image are fine; the latter
/// simply touch nothing and return `Ok(None)`. Distances are measured from
/// the exact sub-pixel center. Protected cells are skipped.
pub fn apply_brush(
    field: &mut IntensityField,
    x: f32,
    y: f32,
    params: &BrushParams,
    mode: BrushMode,
) -> Result<Option<CellRect>> {
    params.validate()?;
    if !x.is_finite() || !y.is_finite() {
        return Ok(None);
    }

    let radius = params.radius;
    let scale = clamp_unit(params.strength) * clamp_unit(params.alpha_cap);

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let w = field.width() as i64;
    let h = field.height() as i64;

    // Float-to-int casts saturate, so far-off centers clip cleanly.
    let r = radius as f64;
    let min_x = ((x0 as f64 - r).ceil() as i64).max(0);
    let max_x = ((x0 as f64 + r).floor() as i64).min(w - 1);
    let min_y = ((y0 as f64 - r).ceil() as i64).max(0);
    let max_y = ((y0 as f64 + r).floor() as i64).min(h - 1);
    if min_x > max_x || min_y > max_y {
        return Ok(None);
    }

    let stride = w as usize;
    let (intensity, protection) = field.parts_mut();

    for iy in min_y..=max_y {
        let dy = iy as f32 - y;
        let row = iy as usize * stride;
        for ix in min_x..=max_x {
            let idx = row + ix as usize;
            if protection[idx] {
                continue;
            }
            let dx = ix as f32 - x;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist >= radius {
                continue;
            }
            let delta = kernel(dist, radius) * scale;
            let v = intensity[idx];
            intensity[idx] = match mode {
                BrushMode::Add => clamp_unit(v + delta),
                BrushMode::Remove => clamp_unit(v - delta),
            };
        }
    }

    Ok(Some(CellRect {
        min_x: min_x as u32,
        min_y: min_y as u32,
        max_x: max_x as u32,
        max_y: max_y as u32,
    }))
}

/// Raise intensity around `(x, y)`.
pub fn add_heat(field: &mut IntensityField, x: f32, y: f32, params: &BrushParams) -> Result<()> {
    apply_brush(field, x, y, params, BrushMode::Add).map(|_| ())
}

/// Lower intensity around `(x, y)`.
pub fn remove_heat(
    field: &mut IntensityField,
    x: f32,
    y: f32,
    params: &BrushParams,
) -> Result<()> {
    apply_brush(field, x, y, params, BrushMode::Remove).map(|_| ())
}
