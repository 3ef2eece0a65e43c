//! # glake-geometry
//!
//! Planar geometry for locating a retreating glacier front and cutting
//! overdeepening basins at it.
//!
//! - [`Centerline`]: glacier flowline with arc-length interpolation and
//!   nearest-vertex lookup
//! - [`ReferenceLine`] / [`CrossSection`]: the along-flow line through the
//!   terminus and the transverse line cutting the basin
//! - [`split_basin`] / [`keep_far_fragment`]: half-plane split of a basin and
//!   selection of the fragment on the lake side
//!
//! All coordinates are in a projected CRS with metric units. Every
//! tie-break resolves to the first candidate in vertex or basin order so
//! that repeated runs are bit-identical.

mod centerline;
mod cross_section;
mod error;
mod split;

pub use centerline::Centerline;
pub use cross_section::{spanning_half_length, CrossSection, ReferenceLine};
pub use error::GeometryError;
pub use split::{keep_far_fragment, point_to_fragment_distance, split_basin, BasinSplit};

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;
