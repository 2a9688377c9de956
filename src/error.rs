//! Error type shared by every htmap operation.

use thiserror::Error;

/// Errors produced while loading, configuring, or rendering a heat session.
///
/// Malformed *values* (an alpha of 1.4, a negative strength) are clamped at the
/// call boundary and never reach this type. Malformed *shapes* are rejected.
#[derive(Error, Debug)]
pub enum HeatError {
    /// Undecodable or zero-sized input, or a pixel buffer whose length does not
    /// match its declared dimensions.
    #[error("Input error: {0}")]
    Input(String),

    /// Wrong ramp stop count, unparsable hex color, non-positive brush radius.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HeatError>;
