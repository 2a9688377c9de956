//! Heat map painting and rendering over raster base maps.
//!
//! A [`Session`] owns one source image and its [`IntensityField`]. The field is
//! bootstrapped from the image's own heat colors (or by the region filler when
//! there are none), edited with the Gaussian brush, and rendered through a
//! four-stop [`ColorRamp`]. Dark label pixels are detected once and never
//! recolored.

pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod field;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;

pub use config::HeatConfig;
pub use error::{HeatError, Result};
pub use field::{FieldSnapshot, IntensityField};
pub use ops::brush::{BrushMode, BrushParams, apply_brush};
pub use ops::classify::{MAP_BG_COLOR, Rgb};
pub use ops::composite::{RenderParams, render_heatmap};
pub use ops::extract::{ExtractOptions, Extraction, extract_intensity};
pub use ops::ramp::{ColorRamp, ColorStop};
pub use ops::region_fill::{FillStats, auto_fill_region};
pub use session::Session;
