//! # glake-dem
//!
//! Bedrock elevation surfaces for glacial lake estimation.
//!
//! This crate provides two views of the glacier bed:
//! - a bedrock elevation raster read from a GeoTIFF in a projected
//!   coordinate system ([`BedrockRaster`]), sampled at terminus points
//! - triangulated bedrock surfaces (TINs) per overdeepening ([`BedrockTin`]),
//!   used to integrate lake volume below a reference plane
//!
//! ## Overview
//!
//! ### Bedrock raster
//!
//! The raster is expected to carry the GeoTIFF `ModelTiepoint` (33922) and
//! `ModelPixelScale` (33550) tags. Cells are treated as areas: a coordinate
//! samples the cell it falls into, the same way a point extraction in a
//! desktop GIS does.
//!
//! ### Bedrock TINs
//!
//! TINs are stored as mass points (`x,y,z` CSV) and Delaunay-triangulated on
//! load. [`TinStore`] indexes one TIN file per basin and loads them on demand.
//!
//! ## Examples
//!
//! ```no_run
//! use geo::polygon;
//! use glake_dem::{BedrockRaster, TinStore};
//!
//! let raster = BedrockRaster::from_file("RGI60-14.00005/bedrock.tif")?;
//! let elevation = raster.value_at(452_130.0, 3_912_455.0)?;
//! println!("Bedrock elevation: {} m", elevation);
//!
//! let mut store = TinStore::new();
//! store.add_directory("RGI60-14.00005/tins")?;
//! let volume = store.with_tin(3, |tin| {
//!     let lake = geo::MultiPolygon::new(vec![geo::polygon![
//!         (x: 452_100.0, y: 3_912_400.0),
//!         (x: 452_200.0, y: 3_912_400.0),
//!         (x: 452_200.0, y: 3_912_500.0),
//!     ]]);
//!     tin.polygon_volume(&lake, 4_830.0)
//! })??;
//! println!("Volume: {} m3, surface: {} m2", volume.volume, volume.surface_area);
//! # Ok::<(), glake_dem::DemError>(())
//! ```

mod error;
mod raster;
mod store;
mod tin;

pub use error::DemError;
pub use raster::{BedrockRaster, RasterBounds};
pub use store::TinStore;
pub use tin::{BedrockTin, PolygonVolume, TinVertex};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
