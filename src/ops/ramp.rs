// ============================================================================
// COLOR RAMP: four positional heat stops, peak first
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};
use crate::field::clamp_unit;
use crate::ops::classify::Rgb;

/// Number of stops the band compositor is built around.
pub const RAMP_STOPS: usize = 4;

/// One ramp entry. Position in the ramp decides which band it paints;
/// `offset` is carried along for editors but never read by the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "StopRecord", into = "StopRecord")]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgb,
    pub alpha: f32,
}

impl ColorStop {
    pub fn new(offset: f32, color: Rgb, alpha: f32) -> Self {
        Self {
            offset: clamp_unit(offset),
            color,
            alpha: clamp_unit(alpha),
        }
    }

    pub fn from_hex(offset: f32, hex: &str, alpha: f32) -> Result<Self> {
        Ok(Self::new(offset, Rgb::from_hex(hex)?, alpha))
    }
}

/// On-disk form of a stop. The offset is optional; values are clamped on load.
#[derive(Serialize, Deserialize)]
struct StopRecord {
    #[serde(default)]
    offset: f32,
    color: Rgb,
    alpha: f32,
}

impl From<StopRecord> for ColorStop {
    fn from(rec: StopRecord) -> Self {
        ColorStop::new(rec.offset, rec.color, rec.alpha)
    }
}

impl From<ColorStop> for StopRecord {
    fn from(stop: ColorStop) -> Self {
        StopRecord {
            offset: stop.offset,
            color: stop.color,
            alpha: stop.alpha,
        }
    }
}

/// A layer as the compositor consumes it: plain color plus alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RampLayer {
    pub color: Rgb,
    pub alpha: f32,
}

/// Exactly four stops, ordered peak (stop 0, drawn on top) to base (stop 3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColorStop>", into = "Vec<ColorStop>")]
pub struct ColorRamp {
    stops: [ColorStop; RAMP_STOPS],
}

impl Default for ColorRamp {
    /// Red peak, yellow, green, blue base, all at 80% alpha.
    fn default() -> Self {
        Self {
            stops: [
                ColorStop::new(1.0, Rgb::new(0xef, 0x44, 0x44), 0.8),
                ColorStop::new(0.66, Rgb::new(0xfb, 0xbf, 0x24), 0.8),
                ColorStop::new(0.33, Rgb::new(0x10, 0xb9, 0x81), 0.8),
                ColorStop::new(0.0, Rgb::new(0x3b, 0x82, 0xf6), 0.8),
            ],
        }
    }
}

impl TryFrom<Vec<ColorStop>> for ColorRamp {
    type Error = HeatError;

    fn try_from(stops: Vec<ColorStop>) -> Result<Self> {
        Self::from_stops(stops)
    }
}

impl From<ColorRamp> for Vec<ColorStop> {
    fn from(ramp: ColorRamp) -> Self {
        ramp.stops.to_vec()
    }
}

impl ColorRamp {
    /// Build a ramp from stops listed peak to base. Anything other than four
    /// stops is rejected rather than padded or truncated.
    pub fn from_stops(stops: Vec<ColorStop>) -> Result<Self> {
        let count = stops.len();
        let stops: [ColorStop; RAMP_STOPS] = stops.try_into().map_err(|_| {
            HeatError::Configuration(format!(
                "color ramp needs exactly {} stops, got {}",
                RAMP_STOPS, count
            ))
        })?;
        Ok(Self { stops })
    }

    pub fn stops(&self) -> &[ColorStop; RAMP_STOPS] {
        &self.stops
    }

    /// Replace one stop's color. Accepts hex with or without `#`.
    pub fn set_color(&mut self, index: usize, hex: &str) -> Result<()> {
        let color = Rgb::from_hex(hex)?;
        self.stop_mut(index)?.color = color;
        Ok(())
    }

    /// Replace one stop's alpha, clamped to `[0, 1]`.
    pub fn set_alpha(&mut self, index: usize, alpha: f32) -> Result<()> {
        self.stop_mut(index)?.alpha = clamp_unit(alpha);
        Ok(())
    }

    /// Layers in compositing order: base (stop 3) first, peak (stop 0) last.
    pub fn layers(&self) -> [RampLayer; RAMP_STOPS] {
        let mut layers = self.stops.map(|s| RampLayer {
            color: s.color,
            alpha: clamp_unit(s.alpha),
        });
        layers.reverse();
        layers
    }

    fn stop_mut(&mut self, index: usize) -> Result<&mut ColorStop> {
        self.stops.get_mut(index).ok_or_else(|| {
            HeatError::Configuration(format!(
                "stop index {} out of range (ramp has {} stops)",
                index, RAMP_STOPS
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ramp_peak_is_red() {
        let ramp = ColorRamp::default();
        assert_eq!(ramp.stops()[0].color.to_hex(), "#ef4444");
        assert_eq!(ramp.stops()[3].color.to_hex(), "#3b82f6");
    }

    #[test]
    fn layers_run_base_to_peak() {
        let layers = ColorRamp::default().layers();
        assert_eq!(layers[0].color, Rgb::new(0x3b, 0x82, 0xf6));
        assert_eq!(layers[3].color, Rgb::new(0xef, 0x44, 0x44));
    }

    #[test]
    fn wrong_stop_count_rejected() {
        let three = ColorRamp::default().stops()[..3].to_vec();
        assert!(matches!(
            ColorRamp::from_stops(three),
            Err(HeatError::Configuration(_))
        ));
        let mut five = ColorRamp::default().stops().to_vec();
        five.push(five[0]);
        assert!(ColorRamp::from_stops(five).is_err());
    }

    #[test]
    fn editing_stops() {
        let mut ramp = ColorRamp::default();
        ramp.set_color(1, "00ff00").unwrap();
        ramp.set_alpha(1, 1.7).unwrap();
        assert_eq!(ramp.stops()[1].color, Rgb::new(0, 255, 0));
        assert_eq!(ramp.stops()[1].alpha, 1.0);
        assert!(ramp.set_alpha(4, 0.5).is_err());
        assert!(ramp.set_color(0, "nothex").is_err());
        assert_eq!(ramp.stops()[0].color, Rgb::new(0xef, 0x44, 0x44));
    }

    #[test]
    fn json_shape_uses_hex_colors() {
        let json = r##"[
            {"offset": 1.0, "color": "#ff0000", "alpha": 0.5},
            {"color": "ffff00", "alpha": 0.5},
            {"color": "#00ff00", "alpha": 2.0},
            {"color": "#0000ff", "alpha": 0.5}
        ]"##;
        let ramp: ColorRamp = serde_json::from_str(json).unwrap();
        assert_eq!(ramp.stops()[1].offset, 0.0);
        assert_eq!(ramp.stops()[2].alpha, 1.0);

        let out = serde_json::to_string(&ramp).unwrap();
        assert!(out.contains("\"#ffff00\""));
    }

    #[test]
    fn json_with_three_stops_fails() {
        let json = r##"[
            {"color": "#ff0000", "alpha": 0.5},
            {"color": "#ffff00", "alpha": 0.5},
            {"color": "#00ff00", "alpha": 0.5}
        ]"##;
        assert!(serde_json::from_str::<ColorRamp>(json).is_err());
    }
}
