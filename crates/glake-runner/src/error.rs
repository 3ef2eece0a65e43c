//! Error types for the batch runner.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a glacier or the whole batch.
///
/// Year-level problems never surface here; they are recorded as skips in
/// the scenario summary. Run-level failures surface as
/// [`RunOutcome::Aborted`](crate::RunOutcome::Aborted).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] glake_model::ModelError),

    #[error("DEM error: {0}")]
    Dem(#[from] glake_dem::DemError),

    #[error("Missing input {0}")]
    MissingInput(PathBuf),

    #[error("Lake of basin {sink_nr} in {year} has no volume")]
    MissingVolume { year: i32, sink_nr: u32 },

    #[error("Data root {0} is not a directory")]
    NoDataRoot(PathBuf),
}
