//! Error types for model loading.

use std::path::PathBuf;
use thiserror::Error;

/// Failures in the upstream ice-dynamics output.
///
/// These are not bugs in the input files as such: the model run itself
/// diverged, and the whole climate-model run is set aside.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// The first length sample is NaN or missing.
    #[error("First glacier length sample is NaN")]
    NanLength,

    /// A sampled calendar year is NaN; later samples would pair with the
    /// wrong lengths.
    #[error("Calendar year at data row {row} is NaN")]
    NanYear { row: usize },
}

/// Errors raised while loading inputs or configuration.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] glake_geometry::GeometryError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: String, column: &'static str },

    #[error("{path}:{line}: {reason}")]
    InvalidRow {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("{path}: feature {index}: {reason}")]
    InvalidFeature {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("{0}: no LineString feature found")]
    NoCenterline(PathBuf),

    #[error("Duplicate basin number {0}")]
    DuplicateSink(u32),
}
