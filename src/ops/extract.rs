use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};
use crate::field::IntensityField;
use crate::ops::classify::{EXTRACT_BG_DISTANCE, MAP_BG_COLOR, Rgb, classify};
use crate::ops::region_fill::{FillStats, auto_fill_region};

/// Minimum HSV saturation for a pixel to read as heat.
const MIN_HEAT_SATURATION: f32 = 0.15;
/// Hue that maps to zero heat; red (0°) maps to full heat.
const COLDEST_HUE: f32 = 240.0;
/// Floor for any detected heat pixel so it still reaches the base band.
const MIN_HEAT: f32 = 0.01;

/// Inputs to an extraction pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Reference paper color of the map.
    pub background: Rgb,
    /// Detection sensitivity. Recorded with the session and logged, but the
    /// thresholds below are fixed and do not read it.
    pub sensitivity: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            background: MAP_BG_COLOR,
            sensitivity: 0.05,
        }
    }
}

/// Result of bootstrapping a field from a source image.
#[derive(Clone, Debug)]
pub struct Extraction {
    pub field: IntensityField,
    /// Cells that carried heat straight from the source colors.
    pub heat_cells: usize,
    /// Set when no heat was found and the region filler ran instead.
    pub fill: Option<FillStats>,
}

/// Heat implied by a hue: `max(0.01, 1 - hue / 240)`.
#[inline]
pub fn hue_to_heat(hue: f32) -> f32 {
    (1.0 - hue / COLDEST_HUE).max(MIN_HEAT)
}

/// Build a fresh field from `source`.
///
/// Every pixel is classified once: dark opaque pixels become protected label
/// cells; saturated pixels well away from the background (and outside the
/// reserved magenta band) get heat from their hue. When nothing qualifies the
/// region filler bootstraps the field so a plain map always has a starting
/// point.
pub fn extract_intensity(source: &RgbaImage, opts: &ExtractOptions) -> Result<Extraction> {
    let (w, h) = source.dimensions();
    if w == 0 || h == 0 {
        return Err(HeatError::Input(format!(
            "cannot extract heat from a {}x{} image",
            w, h
        )));
    }

    let bg = opts.background;
    let (protection, intensity): (Vec<bool>, Vec<f32>) = source
        .as_raw()
        .par_chunks(4)
        .map(|p| {
            let class = classify(&image::Rgba([p[0], p[1], p[2], p[3]]), bg);
            if class.is_label {
                return (true, 0.0);
            }
            let is_heat = class.is_far_from(EXTRACT_BG_DISTANCE)
                && class.saturation > MIN_HEAT_SATURATION
                && !class.in_reserved_hue();
            (false, if is_heat { hue_to_heat(class.hue) } else { 0.0 })
        })
        .unzip();

    let heat_cells = intensity.iter().filter(|&&v| v > 0.0).count();
    let mut field = IntensityField::from_parts(w, h, intensity, protection)?;

    log::info!(
        "extracted {}x{}: {} heat cells, {} label cells (sensitivity {:.3})",
        w,
        h,
        heat_cells,
        field.protected_count(),
        opts.sensitivity
    );

    let fill = if heat_cells == 0 {
        let stats = auto_fill_region(&mut field, source, bg)?;
        log::info!(
            "no existing heat, region fill seeded {} cells from {} seeds",
            stats.filled,
            stats.seeds
        );
        Some(stats)
    } else {
        None
    };

    Ok(Extraction {
        field,
        heat_cells,
        fill,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgba;

    fn map(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([247, 247, 247, 255]))
    }

    #[test]
    fn hue_mapping() {
        assert_eq!(hue_to_heat(0.0), 1.0);
        assert_abs_diff_eq!(hue_to_heat(120.0), 0.5);
        assert_eq!(hue_to_heat(240.0), 0.01);
        assert_eq!(hue_to_heat(330.0), 0.01);
    }

    #[test]
    fn colored_pixels_become_heat() {
        let mut img = map(3, 1);
        img.put_pixel(0, 0, Rgba([255, 80, 80, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        let ex = extract_intensity(&img, &ExtractOptions::default()).unwrap();
        assert!(ex.fill.is_none());
        assert_eq!(ex.heat_cells, 2);
        assert_eq!(ex.field.get(0, 0), 1.0);
        assert_abs_diff_eq!(ex.field.get(1, 0), 0.5);
        assert_eq!(ex.field.get(2, 0), 0.0);
    }

    #[test]
    fn labels_are_masked_and_never_heat() {
        let mut img = map(3, 1);
        img.put_pixel(0, 0, Rgba([90, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 60, 60, 255]));
        let ex = extract_intensity(&img, &ExtractOptions::default()).unwrap();
        assert!(ex.field.is_protected(0, 0));
        assert_eq!(ex.field.get(0, 0), 0.0);
        assert!(!ex.field.is_protected(1, 0));
        assert!(ex.field.get(1, 0) > 0.9);
    }

    #[test]
    fn reserved_band_and_pale_colors_ignored() {
        let mut img = map(4, 1);
        // Light magenta (300°) is reserved.
        img.put_pixel(0, 0, Rgba([255, 120, 255, 255]));
        // Close to the background.
        img.put_pixel(1, 0, Rgba([247, 230, 230, 255]));
        // Far from background but barely saturated.
        img.put_pixel(2, 0, Rgba([180, 175, 170, 255]));
        // Real heat so the filler stays out of the way.
        img.put_pixel(3, 0, Rgba([255, 128, 0, 255]));
        let ex = extract_intensity(&img, &ExtractOptions::default()).unwrap();
        assert_eq!(ex.heat_cells, 1);
        assert_eq!(&ex.field.intensity()[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn plain_map_falls_back_to_region_fill() {
        let mut img = map(60, 60);
        for y in 10..50 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgba([225, 225, 250, 255]));
            }
        }
        let ex = extract_intensity(&img, &ExtractOptions::default()).unwrap();
        assert_eq!(ex.heat_cells, 0);
        let fill = ex.fill.expect("filler should have run");
        assert_eq!(fill.filled, 40 * 40);
        assert_abs_diff_eq!(ex.field.get(30, 30), 0.7, epsilon = 1e-6);
        assert_eq!(ex.field.get(10, 49), 0.1);
    }

    #[test]
    fn sensitivity_does_not_change_the_result() {
        let mut img = map(5, 5);
        img.put_pixel(2, 2, Rgba([255, 200, 0, 255]));
        let a = extract_intensity(&img, &ExtractOptions::default()).unwrap();
        let opts = ExtractOptions {
            sensitivity: 0.9,
            ..Default::default()
        };
        let b = extract_intensity(&img, &opts).unwrap();
        assert_eq!(a.field, b.field);
    }

    #[test]
    fn custom_background_is_respected() {
        // On a blue sea map, the sea itself is background rather than heat.
        let img = RgbaImage::from_pixel(4, 4, Rgba([150, 180, 240, 255]));
        let opts = ExtractOptions {
            background: Rgb::new(150, 180, 240),
            ..Default::default()
        };
        let ex = extract_intensity(&img, &opts).unwrap();
        assert_eq!(ex.heat_cells, 0);
        assert!(ex.fill.is_some());
    }
}
