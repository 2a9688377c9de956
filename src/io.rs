// ============================================================================
// IMAGE AND CONFIG FILE I/O
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageEncoder, RgbaImage};

use crate::config::HeatConfig;
use crate::error::{HeatError, Result};
use crate::ops::ramp::ColorRamp;

/// JPEG quality for rendered maps.
const JPEG_QUALITY: u8 = 92;

/// Output encodings, chosen from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tga,
    Tiff,
}

impl SaveFormat {
    /// Unknown or missing extensions fall back to PNG.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "jpg" | "jpeg" => SaveFormat::Jpeg,
            "webp" => SaveFormat::Webp,
            "bmp" => SaveFormat::Bmp,
            "tga" => SaveFormat::Tga,
            "tif" | "tiff" => SaveFormat::Tiff,
            _ => SaveFormat::Png,
        }
    }
}

/// Decode any supported raster file to RGBA8.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(HeatError::Input(format!(
            "'{}' decoded to an empty {}x{} image",
            path.display(),
            img.width(),
            img.height()
        )));
    }
    log::debug!(
        "loaded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}

/// Wrap a raw row-major RGBA buffer, checking it against its dimensions.
pub fn image_from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(HeatError::Input(format!(
            "image dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    let got = pixels.len();
    RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
        HeatError::Input(format!(
            "{}x{} RGBA image needs {} bytes, got {}",
            width,
            height,
            width as usize * height as usize * 4,
            got
        ))
    })
}

/// Encode `image` by the extension of `path` (PNG when unknown).
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<()> {
    let format = SaveFormat::from_path(path);
    let (w, h) = image.dimensions();

    match format {
        SaveFormat::Png => {
            let mut writer = create_writer(path)?;
            PngEncoder::new(&mut writer).write_image(image.as_raw(), w, h, image::ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut writer = create_writer(path)?;
            JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).write_image(
                rgb.as_raw(),
                w,
                h,
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut writer = create_writer(path)?;
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), w, h, image::ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            let mut writer = create_writer(path)?;
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), w, h, image::ColorType::Rgba8)?;
        }
        SaveFormat::Webp | SaveFormat::Tiff => image.save(path)?,
    }

    log::debug!("wrote {} as {:?}", path.display(), format);
    Ok(())
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

pub fn load_config(path: &Path) -> Result<HeatConfig> {
    let text = std::fs::read_to_string(path)?;
    HeatConfig::from_json(&text)
}

/// Read a ramp file: a JSON array of exactly four `{offset, color, alpha}` stops.
pub fn load_ramp(path: &Path) -> Result<ColorRamp> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("htmap-io-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(SaveFormat::from_path(Path::new("a.JPG")), SaveFormat::Jpeg);
        assert_eq!(SaveFormat::from_path(Path::new("a.tif")), SaveFormat::Tiff);
        assert_eq!(SaveFormat::from_path(Path::new("a")), SaveFormat::Png);
        assert_eq!(SaveFormat::from_path(Path::new("a.xyz")), SaveFormat::Png);
    }

    #[test]
    fn raw_buffer_size_is_checked() {
        assert!(image_from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            image_from_rgba(2, 2, vec![0; 15]),
            Err(HeatError::Input(_))
        ));
        assert!(matches!(
            image_from_rgba(0, 2, vec![]),
            Err(HeatError::Input(_))
        ));
    }

    #[test]
    fn png_keeps_pixels_and_alpha() {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 1, Rgba([200, 100, 50, 77]));
        let path = scratch("map.png");
        save_image(&img, &path).unwrap();
        let back = load_image(&path).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = scratch("nope.png");
        assert!(load_image(&path).is_err());
        assert!(matches!(load_config(&path), Err(HeatError::Io(_))));
    }

    #[test]
    fn ramp_file_needs_four_stops() {
        let path = scratch("ramp.json");
        std::fs::write(&path, r##"[{"color":"#ff0000","alpha":1.0}]"##).unwrap();
        assert!(matches!(load_ramp(&path), Err(HeatError::Json(_))));
    }
}
