use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the bead profiler
#[derive(Error, Debug)]
pub enum BeadProfileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Channel images differ in size: green is {green:?}, red is {red:?}")]
    DimensionMismatch {
        green: (u32, u32),
        red: (u32, u32),
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, BeadProfileError>;
