// ============================================================================
// PIXEL CLASSIFIER: label / boundary / background predicates
// ============================================================================

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};

/// Background distance a pixel must exceed to count as heat during extraction.
pub const EXTRACT_BG_DISTANCE: f32 = 40.0;
/// Background distance a region-fill seed must exceed.
pub const SEED_BG_DISTANCE: f32 = 10.0;
/// Background distance a region-fill neighbor must exceed. Looser than the
/// seed gate so the fill bleeds a little past its own seeds.
pub const GROW_BG_DISTANCE: f32 = 8.0;

/// Hue band (degrees, exclusive) reserved for UI highlighting.
pub const RESERVED_HUE: (f32, f32) = (250.0, 310.0);

/// Plain 8-bit RGB triple. Serialized as a `#rrggbb` string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HeatError::Configuration(format!(
                "expected a 6-digit hex color, got '{}'",
                hex
            )));
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
        match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Self { r, g, b }),
            _ => Err(HeatError::Configuration(format!("bad hex color '{}'", hex))),
        }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Rgb {
    type Err = HeatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = HeatError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_hex()
    }
}

/// Light gray paper color of a typical base map.
pub const MAP_BG_COLOR: Rgb = Rgb::new(247, 247, 247);

/// Everything the engine wants to know about one source pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelClass {
    pub is_label: bool,
    pub is_boundary: bool,
    /// Euclidean RGB distance to the reference background.
    pub bg_distance: f32,
    /// HSV hue in degrees, `0.0` for achromatic pixels.
    pub hue: f32,
    /// HSV saturation in `0.0..=1.0`.
    pub saturation: f32,
}

impl PixelClass {
    /// True when the pixel differs from the background by more than `threshold`.
    #[inline]
    pub fn is_far_from(&self, threshold: f32) -> bool {
        self.bg_distance > threshold
    }

    #[inline]
    pub fn is_background(&self, threshold: f32) -> bool {
        !self.is_far_from(threshold)
    }

    #[inline]
    pub fn in_reserved_hue(&self) -> bool {
        self.hue > RESERVED_HUE.0 && self.hue < RESERVED_HUE.1
    }
}

/// Classify a single pixel against a reference background color.
pub fn classify(p: &Rgba<u8>, bg: Rgb) -> PixelClass {
    let (hue, saturation) = hue_saturation(p[0], p[1], p[2]);
    PixelClass {
        is_label: is_label_pixel(p[0], p[1], p[2], p[3]),
        is_boundary: is_boundary_pixel(p[0], p[1], p[2]),
        bg_distance: bg_distance(p, bg),
        hue,
        saturation,
    }
}

/// Rec.601 integer luma, `(299r + 587g + 114b) / 1000`, kept fractional.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 * 299.0 + g as f32 * 587.0 + b as f32 * 114.0) / 1000.0
}

/// Dark, opaque pixels are map text and must never be recolored.
#[inline]
pub fn is_label_pixel(r: u8, g: u8, b: u8, a: u8) -> bool {
    a >= 128 && luma(r, g, b) < 110.0
}

/// Near-achromatic gray/black pixels are cartographic lines.
#[inline]
pub fn is_boundary_pixel(r: u8, g: u8, b: u8) -> bool {
    luma(r, g, b) < 180.0 && r.abs_diff(g) < 20 && g.abs_diff(b) < 20
}

/// Euclidean distance in RGB space (alpha ignored).
#[inline]
pub fn bg_distance(p: &Rgba<u8>, bg: Rgb) -> f32 {
    let dr = p[0] as f32 - bg.r as f32;
    let dg = p[1] as f32 - bg.g as f32;
    let db = p[2] as f32 - bg.b as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Standard HSV hue (degrees) and saturation.
pub fn hue_saturation(r: u8, g: u8, b: u8) -> (f32, f32) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let chroma = max - min;
    let saturation = if max == 0.0 { 0.0 } else { chroma / max };

    if chroma == 0.0 {
        return (0.0, saturation);
    }

    let sector = if max == rf {
        ((gf - bf) / chroma) % 6.0
    } else if max == gf {
        (bf - rf) / chroma + 2.0
    } else {
        (rf - gf) / chroma + 4.0
    };
    let mut hue = sector * 60.0;
    if hue < 0.0 {
        hue += 360.0;
    }
    (hue, saturation)
}
