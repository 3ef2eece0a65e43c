//! Error types for the geometry crate.

use thiserror::Error;

/// Errors raised while building terminus geometry or cutting basins.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The centerline has too few usable vertices.
    #[error("Centerline needs at least 2 vertices, got {vertices}")]
    ShortCenterline {
        /// Number of vertices supplied.
        vertices: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("Non-finite coordinate in {0}")]
    NonFinite(&'static str),

    /// Neither the up-glacier nor the down-glacier reference vertex exists.
    #[error("No reference vertex {offset} positions from vertex {nearest} (centerline has {count})")]
    NoReferenceVertex {
        /// Index of the vertex nearest to the terminus.
        nearest: usize,
        /// Requested offset.
        offset: usize,
        /// Number of centerline vertices.
        count: usize,
    },

    /// Reference vertex and terminus coincide, so no direction is defined.
    #[error("Reference line has zero length")]
    ZeroLengthReference,

    /// The reference line is too short to move the front up-glacier.
    #[error("Reference line of length {length:.3} cannot be shortened by {retreat:.3}")]
    ReferenceTooShort {
        /// Reference line length.
        length: f64,
        /// Requested retreat.
        retreat: f64,
    },

    /// The cross-section leaves the basin on one side only.
    #[error("Cross-section does not split the basin ({sides} non-empty side(s))")]
    NotSplit {
        /// Number of sides with area.
        sides: usize,
    },

    /// Both fragments are equally far from the reference point.
    #[error("Both basin fragments are {distance:.6} from the reference point")]
    ClipTie {
        /// The shared distance.
        distance: f64,
    },
}
