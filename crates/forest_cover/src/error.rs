use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForestError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Failed to write image {}: {source}", path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Image is {width}x{height}; both sides must be at least {min} pixels")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("Mask dimensions {actual:?} do not match image dimensions {expected:?}")]
    DimensionMismatch { expected: (u32, u32), actual: (u32, u32) },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Unsupported config format: {0}. Please use .toml or .json files")]
    UnsupportedConfigFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Invalid border GeoJSON: {0}")]
    InvalidBorder(String),
}

pub type Result<T> = std::result::Result<T, ForestError>;
