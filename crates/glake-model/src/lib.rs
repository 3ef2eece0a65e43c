//! # glake-model
//!
//! Inputs of the glacial lake workflow:
//!
//! - [`RetreatSeries`]: decadal glacier length and terminus thickness
//!   sampled from ice-dynamics model output
//! - [`BasinSet`]: the candidate lake basins of a glacier in a fixed order
//! - [`load_centerline`]: the glacier flowline
//! - [`geojson`]: the vector format all of the above are exchanged in
//! - [`RunConfig`]: YAML configuration of a batch run

mod basin;
mod config;
mod error;
mod flowline;
pub mod geojson;
mod retreat;

pub use basin::{load_outline, Basin, BasinSet};
pub use config::{LayoutConfig, ResolverConfig, RunConfig};
pub use error::{DataError, ModelError};
pub use flowline::load_centerline;
pub use retreat::{RetreatSeries, SamplingConfig};

/// Result type for model loading.
pub type Result<T> = std::result::Result<T, ModelError>;
