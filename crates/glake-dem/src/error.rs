//! Error types for the DEM crate.

use thiserror::Error;

/// Errors that can occur when working with bedrock surfaces.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing required tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Coordinate is outside the bounds of the raster.
    #[error("Coordinate ({x}, {y}) is outside raster bounds ({min_x}-{max_x}, {min_y}-{max_y})")]
    OutOfBounds {
        /// Requested easting.
        x: f64,
        /// Requested northing.
        y: f64,
        /// Raster minimum easting.
        min_x: f64,
        /// Raster maximum easting.
        max_x: f64,
        /// Raster minimum northing.
        min_y: f64,
        /// Raster maximum northing.
        max_y: f64,
    },

    /// No data value encountered.
    #[error("No elevation data at coordinate ({x}, {y})")]
    NoData {
        /// Requested easting.
        x: f64,
        /// Requested northing.
        y: f64,
    },

    /// Raster dimensions do not match the supplied cell data.
    #[error("Raster of {width}x{height} cells cannot hold {len} values")]
    DimensionMismatch {
        /// Raster width in cells.
        width: u32,
        /// Raster height in cells.
        height: u32,
        /// Number of values supplied.
        len: usize,
    },

    /// Malformed line in a TIN mass-point file.
    #[error("Invalid TIN record in {path} at line {line}: {reason}")]
    InvalidTinRecord {
        /// File being parsed.
        path: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// The TIN has no triangles (fewer than three non-collinear points).
    #[error("TIN has no triangles ({vertices} vertices)")]
    EmptySurface {
        /// Number of vertices that were loaded.
        vertices: usize,
    },

    /// Delaunay triangulation rejected a vertex.
    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    /// No TIN is indexed for the requested basin.
    #[error("No TIN found for basin {0}")]
    NoTinFound(u32),

    /// Cache lock was poisoned (a thread panicked while holding the lock).
    #[error("TIN cache lock was poisoned")]
    CacheLockPoisoned,

    /// Polygon cannot be integrated (empty, too few vertices, or non-finite).
    #[error("Degenerate polygon: {0}")]
    DegeneratePolygon(String),

    /// Polygon does not overlap the triangulated surface.
    #[error("Polygon does not overlap the TIN (polygon area {area:.3})")]
    NoSurfaceOverlap {
        /// Planar area of the polygon.
        area: f64,
    },
}
