use image::RgbaImage;
use std::collections::VecDeque;

use crate::error::{HeatError, Result};
use crate::field::IntensityField;
use crate::ops::brush::{BrushMode, BrushParams, apply_brush};
use crate::ops::classify::{GROW_BG_DISTANCE, Rgb, SEED_BG_DISTANCE, bg_distance, is_boundary_pixel};

/// Half-width of the seed grid around the image center.
const SEED_SPAN: i64 = 80;
/// Spacing between seed candidates.
const SEED_STEP: usize = 15;
/// Flat baseline written into every filled cell.
const FILL_INTENSITY: f32 = 0.1;
/// Energy of the centroid brush applied after the flood.
const CENTROID_STRENGTH: f32 = 0.6;

/// What a region fill did, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillStats {
    pub seeds: usize,
    pub filled: usize,
}

/// Region auto-fill: bootstraps heat on a plain map with no existing signal:
///
/// 1. **Seeds** from a sparse 11×11 grid (step 15 px) around the image center,
///    accepted when away from the background, not a label and not a line.
/// 2. **Flood fill** (BFS, 4-connected) from every seed with a slightly
///    looser background gate. Each reached cell is set to a flat `0.1`.
/// 3. **Centroid brush**: one wide Add stamp at the center
///    (`radius = min(w, h) / 3`, strength 0.6) once the queue has drained.
///
/// Not idempotent: running it twice re-applies the centroid brush. Callers
/// wanting repeatable output clear the field first.
pub fn auto_fill_region(
    field: &mut IntensityField,
    source: &RgbaImage,
    bg: Rgb,
) -> Result<FillStats> {
    let w = field.width();
    let h = field.height();
    if source.width() != w || source.height() != h {
        return Err(HeatError::Input(format!(
            "source image is {}x{}, field is {}x{}",
            source.width(),
            source.height(),
            w,
            h
        )));
    }

    let center_x = (w / 2) as i64;
    let center_y = (h / 2) as i64;
    let mut stats = FillStats::default();

    {
        let (intensity, protection) = field.parts_mut();
        let stride = w as usize;
        let accepts = |idx: usize, threshold: f32| -> bool {
            if protection[idx] {
                return false;
            }
            let px = source.get_pixel((idx % stride) as u32, (idx / stride) as u32);
            bg_distance(px, bg) > threshold && !is_boundary_pixel(px[0], px[1], px[2])
        };

        // ====================================================================
        // Step 1: Seed selection on the sparse center grid
        // ====================================================================
        let mut visited = vec![false; intensity.len()];
        let mut queue: VecDeque<usize> = VecDeque::with_capacity(1024);

        for dy in (-SEED_SPAN..=SEED_SPAN).step_by(SEED_STEP) {
            for dx in (-SEED_SPAN..=SEED_SPAN).step_by(SEED_STEP) {
                let sx = center_x + dx;
                let sy = center_y + dy;
                if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                    continue;
                }
                let idx = sy as usize * stride + sx as usize;
                if visited[idx] || !accepts(idx, SEED_BG_DISTANCE) {
                    continue;
                }
                visited[idx] = true;
                queue.push_back(idx);
                stats.seeds += 1;
            }
        }

        // ====================================================================
        // Step 2: Breadth-first growth, flat baseline on every reached cell
        // ====================================================================
        while let Some(idx) = queue.pop_front() {
            intensity[idx] = FILL_INTENSITY;
            stats.filled += 1;

            let cx = (idx % stride) as u32;
            let cy = (idx / stride) as u32;
            let neighbors = [
                (cx + 1, cy),
                (cx.wrapping_sub(1), cy),
                (cx, cy + 1),
                (cx, cy.wrapping_sub(1)),
            ];
            for (nx, ny) in neighbors {
                if nx >= w || ny >= h {
                    continue;
                }
                let nidx = ny as usize * stride + nx as usize;
                if visited[nidx] || !accepts(nidx, GROW_BG_DISTANCE) {
                    continue;
                }
                visited[nidx] = true;
                queue.push_back(nidx);
            }
        }
    }

    // ========================================================================
    // Step 3: Centroid brush, strictly after the flood has finished
    // ========================================================================
    let centroid = BrushParams::new(w.min(h) as f32 / 3.0, CENTROID_STRENGTH, 1.0);
    apply_brush(
        field,
        center_x as f32,
        center_y as f32,
        &centroid,
        BrushMode::Add,
    )?;

    log::debug!(
        "region fill: {} seeds, {} cells filled on {}x{}",
        stats.seeds,
        stats.filled,
        w,
        h
    );
    Ok(stats)
}
