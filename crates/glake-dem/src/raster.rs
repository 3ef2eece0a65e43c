//! Bedrock elevation raster in a projected coordinate system.

use crate::{DemError, Result};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

/// GeoTIFF ModelPixelScale tag.
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// GeoTIFF ModelTiepoint tag.
const TAG_MODEL_TIEPOINT: u16 = 33922;
/// GDAL_NODATA tag, stored as an ASCII string.
const TAG_GDAL_NODATA: u16 = 42113;

/// A bedrock elevation raster loaded from a GeoTIFF file.
///
/// Bedrock rasters are usually a surface DEM minus a modelled ice thickness,
/// clipped to a single glacier, so they comfortably fit in memory.
#[derive(Debug, Clone)]
pub struct BedrockRaster {
    /// Elevation data in row-major order (north to south, west to east).
    data: Vec<f32>,
    /// Width of the raster in cells.
    width: u32,
    /// Height of the raster in cells.
    height: u32,
    /// Projected bounds of the outer cell edges.
    bounds: RasterBounds,
    /// No-data value (elevations equal to this should be treated as missing).
    no_data_value: Option<f32>,
}

/// Projected bounds of a raster (outer cell edges).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterBounds {
    /// Minimum easting (west edge).
    pub min_x: f64,
    /// Maximum easting (east edge).
    pub max_x: f64,
    /// Minimum northing (south edge).
    pub min_y: f64,
    /// Maximum northing (north edge).
    pub max_y: f64,
}

impl RasterBounds {
    /// Check if a coordinate is within the bounds.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl BedrockRaster {
    /// Load a bedrock raster from a GeoTIFF file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut decoder = Decoder::new(file)?;

        let (width, height) = decoder.dimensions()?;
        let bounds = Self::read_geotransform(&mut decoder, path)?;
        let data = Self::read_band(&mut decoder, path)?;
        let no_data_value = Self::read_nodata_value(&mut decoder);

        tracing::debug!(
            "Loaded bedrock raster {} ({}x{} cells)",
            path.display(),
            width,
            height
        );

        Ok(Self {
            data,
            width,
            height,
            bounds,
            no_data_value,
        })
    }

    /// Build a raster from in-memory cell values.
    ///
    /// `data` is row-major, starting at the north-west cell.
    pub fn from_grid(
        data: Vec<f32>,
        width: u32,
        height: u32,
        bounds: RasterBounds,
        no_data_value: Option<f32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width as usize * height as usize {
            return Err(DemError::DimensionMismatch {
                width,
                height,
                len: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            bounds,
            no_data_value,
        })
    }

    /// Read the geotransform (projected bounds) from GeoTIFF tags.
    fn read_geotransform<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
        path: &Path,
    ) -> Result<RasterBounds> {
        let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT));
        let pixel_scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE));

        match (tiepoint, pixel_scale) {
            (Ok(tiepoint), Ok(scale)) if tiepoint.len() >= 6 && scale.len() >= 2 => {
                // Tiepoint format: [i, j, k, x, y, z] where (i,j) is the raster
                // position of the projected coordinate (x,y)
                let (tie_i, tie_j) = (tiepoint[0], tiepoint[1]);
                let scale_x = scale[0];
                let scale_y = scale[1];
                let min_x = tiepoint[3] - tie_i * scale_x;
                let max_y = tiepoint[4] + tie_j * scale_y;

                let (width, height) = decoder.dimensions()?;

                Ok(RasterBounds {
                    min_x,
                    max_x: min_x + width as f64 * scale_x,
                    min_y: max_y - height as f64 * scale_y,
                    max_y,
                })
            }
            _ => Err(DemError::InvalidGeoTiff(format!(
                "{} has no ModelTiepoint/ModelPixelScale tags",
                path.display()
            ))),
        }
    }

    /// Read the single elevation band as `f32`.
    ///
    /// Bedrock rasters are float32 ice-thickness products, or integer DEMs
    /// when the bed was derived from a surface DEM; anything with several
    /// samples per pixel is not an elevation model.
    fn read_band<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
        path: &Path,
    ) -> Result<Vec<f32>> {
        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(DemError::InvalidGeoTiff(format!(
                    "{} is not a single-band raster ({:?})",
                    path.display(),
                    other
                )))
            }
        }

        match decoder.read_image()? {
            DecodingResult::F32(data) => Ok(data),
            DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I16(data) => Ok(data.into_iter().map(f32::from).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            _ => Err(DemError::InvalidGeoTiff(format!(
                "{} has an unsupported sample format for elevations",
                path.display()
            ))),
        }
    }

    /// Try to read the no-data value from the GDAL_NODATA tag.
    fn read_nodata_value<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
        decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
    }

    fn check_bounds(&self, x: f64, y: f64) -> Result<()> {
        if self.bounds.contains(x, y) {
            return Ok(());
        }
        Err(DemError::OutOfBounds {
            x,
            y,
            min_x: self.bounds.min_x,
            max_x: self.bounds.max_x,
            min_y: self.bounds.min_y,
            max_y: self.bounds.max_y,
        })
    }

    /// Get the value of the cell containing a projected coordinate.
    ///
    /// Coordinates on the east or south edge sample the last column or row.
    pub fn value_at(&self, x: f64, y: f64) -> Result<f32> {
        self.check_bounds(x, y)?;

        let (cell_w, cell_h) = self.cell_size();
        let col = (((x - self.bounds.min_x) / cell_w).floor() as u32).min(self.width - 1);
        let row = (((self.bounds.max_y - y) / cell_h).floor() as u32).min(self.height - 1);

        self.get_cell(col, row).ok_or(DemError::NoData { x, y })
    }

    /// Get the value of a cell, or `None` for no-data cells.
    fn get_cell(&self, col: u32, row: u32) -> Option<f32> {
        let idx = row as usize * self.width as usize + col as usize;
        let value = *self.data.get(idx)?;

        if value.is_nan() {
            return None;
        }
        if let Some(nodata) = self.no_data_value {
            if (value - nodata).abs() < 0.001 {
                return None;
            }
        }

        Some(value)
    }

    /// Get the projected bounds of this raster.
    pub fn bounds(&self) -> RasterBounds {
        self.bounds
    }

    /// Get the dimensions of this raster in cells.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the cell size in map units (width, height).
    pub fn cell_size(&self) -> (f64, f64) {
        (
            (self.bounds.max_x - self.bounds.min_x) / self.width as f64,
            (self.bounds.max_y - self.bounds.min_y) / self.height as f64,
        )
    }
}
