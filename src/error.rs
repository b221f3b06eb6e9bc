use std::path::PathBuf;
use thiserror::Error;

/// The main error type for mangalabel operations.
///
/// The geometry and merge engines never produce these for data-shaped
/// problems; they come from file handling and configuration.
#[derive(Debug, Error)]
pub enum MangalabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse label JSON from {path}: {source}")]
    LabelJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write label JSON to {path}: {source}")]
    LabelJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse merge config {path}: {source}")]
    MergeConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid label line in {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid angle spec '{spec}': {message}")]
    InvalidAngleSpec { spec: String, message: String },

    #[error("Invalid merge config: {message}")]
    InvalidMergeConfig { message: String },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Invalid dataset layout at {path}: {message}")]
    LayoutInvalid { path: PathBuf, message: String },
}
