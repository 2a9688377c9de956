// ============================================================================
// HEAT COMPOSITOR: threshold bands blended over the source map
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};
use crate::field::{IntensityField, clamp_unit};
use crate::ops::ramp::{ColorRamp, RAMP_STOPS, RampLayer};

/// Minimum intensity for each layer, base to peak.
pub const BAND_THRESHOLDS: [f32; RAMP_STOPS] = [0.01, 0.25, 0.5, 0.75];

/// Width of one band; `blur` scales the soft edge as a fraction of it.
const BAND_WIDTH: f32 = 0.25;

/// Global render settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Multiplies every layer's alpha, `0.0..=1.0`.
    pub opacity: f32,
    /// Soft band edges, `0.0` = hard steps, `1.0` = a full band of fade.
    pub blur: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blur: 0.3,
        }
    }
}

impl RenderParams {
    pub fn new(opacity: f32, blur: f32) -> Self {
        Self { opacity, blur }
    }

    /// Same settings with both values clamped to `[0, 1]`.
    pub fn clamped(&self) -> Self {
        Self {
            opacity: clamp_unit(self.opacity),
            blur: clamp_unit(self.blur),
        }
    }
}

/// Straight-alpha color accumulator, channels in `0.0..=255.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Accum {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

/// Standard "over": `src * a + dst * (1 - a)`, alpha `a + a_dst * (1 - a)`.
#[inline]
fn blend_over(dst: Accum, layer: &RampLayer, alpha: f32) -> Accum {
    let inv = 1.0 - alpha;
    Accum {
        r: layer.color.r as f32 * alpha + dst.r * inv,
        g: layer.color.g as f32 * alpha + dst.g * inv,
        b: layer.color.b as f32 * alpha + dst.b * inv,
        a: alpha + dst.a * inv,
    }
}

/// Edge factor for a band: ramps 0 → 1 over `0.25 * blur` above the
/// threshold, 1 elsewhere.
#[inline]
fn band_factor(intensity: f32, threshold: f32, blur: f32) -> f32 {
    if blur > 0.0 {
        let range = BAND_WIDTH * blur;
        if intensity < threshold + range {
            return (intensity - threshold) / range;
        }
    }
    1.0
}

/// Shade one unprotected pixel. Returns `None` when the intensity is below
/// the base band and the source pixel should stay as is.
#[inline]
pub fn shade_pixel(
    rgb: [u8; 3],
    intensity: f32,
    layers: &[RampLayer; RAMP_STOPS],
    params: &RenderParams,
) -> Option<[u8; 3]> {
    if intensity.is_nan() || intensity < BAND_THRESHOLDS[0] {
        return None;
    }

    let mut acc = Accum {
        r: rgb[0] as f32,
        g: rgb[1] as f32,
        b: rgb[2] as f32,
        a: 1.0,
    };

    for (layer, &threshold) in layers.iter().zip(BAND_THRESHOLDS.iter()) {
        if intensity < threshold {
            continue;
        }
        let factor = band_factor(intensity, threshold, params.blur);
        let alpha = layer.alpha * params.opacity * factor;
        acc = blend_over(acc, layer, alpha);
    }

    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    Some([to_u8(acc.r), to_u8(acc.g), to_u8(acc.b)])
}

/// Render the heat field over `source`.
///
/// The output has the source's dimensions and alpha channel. Protected (label)
/// cells and cells below the base threshold keep their source RGB; every other
/// cell is built up band by band from the base layer to the peak. Reads the
/// field only, so the same inputs always produce the same bytes.
pub fn render_heatmap(
    source: &RgbaImage,
    field: &IntensityField,
    ramp: &ColorRamp,
    params: &RenderParams,
) -> Result<RgbaImage> {
    if source.width() != field.width() || source.height() != field.height() {
        return Err(HeatError::Input(format!(
            "source image is {}x{}, field is {}x{}",
            source.width(),
            source.height(),
            field.width(),
            field.height()
        )));
    }

    let params = params.clamped();
    let layers = ramp.layers();
    let mut out = source.clone();

    out.par_chunks_mut(4)
        .zip(field.intensity().par_iter())
        .zip(field.protection().par_iter())
        .for_each(|((px, &intensity), &protected)| {
            if protected {
                return;
            }
            if let Some(rgb) = shade_pixel([px[0], px[1], px[2]], intensity, &layers, &params) {
                px[..3].copy_from_slice(&rgb);
            }
        });

    Ok(out)
}
