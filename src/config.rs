// ============================================================================
// SESSION CONFIG: everything a heat session starts from, loadable from JSON
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ops::brush::BrushParams;
use crate::ops::classify::{MAP_BG_COLOR, Rgb};
use crate::ops::composite::RenderParams;
use crate::ops::extract::ExtractOptions;
use crate::ops::ramp::ColorRamp;

/// Starting state of a session. Every field is optional in the JSON form and
/// falls back to the defaults of a fresh session.
///
/// ```json
/// {
///   "background": "#f7f7f7",
///   "sensitivity": 0.05,
///   "ramp": [
///     { "offset": 1.0,  "color": "#ef4444", "alpha": 0.8 },
///     { "offset": 0.66, "color": "#fbbf24", "alpha": 0.8 },
///     { "offset": 0.33, "color": "#10b981", "alpha": 0.8 },
///     { "offset": 0.0,  "color": "#3b82f6", "alpha": 0.8 }
///   ],
///   "render": { "opacity": 1.0, "blur": 0.3 },
///   "brush": { "radius": 60, "strength": 0.15, "alphaCap": 1.0 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeatConfig {
    pub background: Rgb,
    pub sensitivity: f32,
    pub ramp: ColorRamp,
    pub render: RenderParams,
    pub brush: BrushParams,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            background: MAP_BG_COLOR,
            sensitivity: 0.05,
            ramp: ColorRamp::default(),
            render: RenderParams::default(),
            brush: BrushParams::default(),
        }
    }
}

impl HeatConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: HeatConfig = serde_json::from_str(text)?;
        config.brush.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            background: self.background,
            sensitivity: self.sensitivity,
        }
    }
}
