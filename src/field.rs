// ============================================================================
// INTENSITY FIELD: per-pixel heat values plus the label protection mask
// ============================================================================

use crate::error::{HeatError, Result};

/// Scalar heat field over an image grid.
///
/// `intensity` and `protection` are row-major (`y * width + x`) and always
/// `width * height` long. Protected cells hold map labels; the brush and the
/// region filler skip them and the compositor leaves them as the source pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityField {
    width: u32,
    height: u32,
    intensity: Vec<f32>,
    protection: Vec<bool>,
}

/// Verbatim copy of a field's intensity values, used for undo.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSnapshot {
    width: u32,
    height: u32,
    intensity: Vec<f32>,
}

impl FieldSnapshot {
    pub fn memory_size(&self) -> usize {
        self.intensity.len() * std::mem::size_of::<f32>()
    }
}

impl IntensityField {
    /// All-zero, unprotected field.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            intensity: vec![0.0; len],
            protection: vec![false; len],
        })
    }

    /// Build a field from existing buffers. Intensities are clamped to `[0, 1]`.
    pub fn from_parts(
        width: u32,
        height: u32,
        mut intensity: Vec<f32>,
        protection: Vec<bool>,
    ) -> Result<Self> {
        let len = cell_count(width, height)?;
        if intensity.len() != len || protection.len() != len {
            return Err(HeatError::Input(format!(
                "field buffers must hold {} cells, got {} intensity / {} mask",
                len,
                intensity.len(),
                protection.len()
            )));
        }
        for v in intensity.iter_mut() {
            *v = clamp_unit(*v);
        }
        Ok(Self {
            width,
            height,
            intensity,
            protection,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.intensity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensity.is_empty()
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    pub fn intensity(&self) -> &[f32] {
        &self.intensity
    }

    pub fn protection(&self) -> &[bool] {
        &self.protection
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.intensity[self.index(x, y)]
    }

    #[inline]
    pub fn is_protected(&self, x: u32, y: u32) -> bool {
        self.protection[self.index(x, y)]
    }

    /// Write a value at a flat index, clamped. Protected cells are left alone;
    /// returns whether the write happened.
    #[inline]
    pub fn set_index(&mut self, idx: usize, value: f32) -> bool {
        if self.protection[idx] {
            return false;
        }
        self.intensity[idx] = clamp_unit(value);
        true
    }

    /// Clamped write at `(x, y)`; no-op on protected cells.
    pub fn set(&mut self, x: u32, y: u32, value: f32) -> bool {
        let idx = self.index(x, y);
        self.set_index(idx, value)
    }

    /// Zero every cell, including protected ones, which never hold heat of
    /// their own anyway.
    pub fn clear(&mut self) {
        self.intensity.fill(0.0);
    }

    /// True when any cell carries non-zero heat.
    pub fn has_heat(&self) -> bool {
        self.intensity.iter().any(|&v| v > 0.0)
    }

    pub fn max_intensity(&self) -> f32 {
        self.intensity.iter().copied().fold(0.0, f32::max)
    }

    pub fn protected_count(&self) -> usize {
        self.protection.iter().filter(|&&p| p).count()
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            width: self.width,
            height: self.height,
            intensity: self.intensity.clone(),
        }
    }

    /// Restore a snapshot byte-for-byte. Fails if it was taken from a field of
    /// different dimensions.
    pub fn restore(&mut self, snapshot: &FieldSnapshot) -> Result<()> {
        if snapshot.width != self.width || snapshot.height != self.height {
            return Err(HeatError::Input(format!(
                "snapshot is {}x{}, field is {}x{}",
                snapshot.width, snapshot.height, self.width, self.height
            )));
        }
        self.intensity.copy_from_slice(&snapshot.intensity);
        Ok(())
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [f32], &[bool]) {
        (&mut self.intensity, &self.protection)
    }
}

/// Clamp to `[0, 1]`, mapping NaN to zero.
#[inline]
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn cell_count(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(HeatError::Input(format!(
            "field dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    Ok(width as usize * height as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(IntensityField::new(0, 4), Err(HeatError::Input(_))));
        assert!(matches!(IntensityField::new(4, 0), Err(HeatError::Input(_))));
    }

    #[test]
    fn from_parts_checks_lengths_and_clamps() {
        let err = IntensityField::from_parts(2, 2, vec![0.0; 3], vec![false; 4]);
        assert!(err.is_err());

        let f = IntensityField::from_parts(2, 1, vec![-0.5, 3.0], vec![false; 2]).unwrap();
        assert_eq!(f.intensity(), &[0.0, 1.0]);
    }

    #[test]
    fn protected_cell_ignores_writes() {
        let mut f =
            IntensityField::from_parts(2, 1, vec![0.2, 0.0], vec![true, false]).unwrap();
        assert!(!f.set(0, 0, 0.9));
        assert!(f.set(1, 0, 0.9));
        assert_eq!(f.intensity(), &[0.2, 0.9]);
    }

    #[test]
    fn snapshot_round_trips_exactly() {
        let mut f = IntensityField::new(3, 2).unwrap();
        f.set(1, 1, 0.123_456_7);
        let snap = f.snapshot();
        f.clear();
        assert!(!f.has_heat());
        f.restore(&snap).unwrap();
        assert_eq!(f.get(1, 1).to_bits(), 0.123_456_7_f32.to_bits());
    }

    #[test]
    fn snapshot_of_other_size_is_rejected() {
        let snap = IntensityField::new(3, 3).unwrap().snapshot();
        let mut f = IntensityField::new(2, 2).unwrap();
        assert!(f.restore(&snap).is_err());
    }

    #[test]
    fn nan_clamps_to_zero() {
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert_eq!(clamp_unit(1.5), 1.0);
    }
}
