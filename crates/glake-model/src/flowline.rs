//! Centerline input.

use crate::geojson::FeatureCollection;
use crate::{ModelError, Result};
use glake_geometry::Centerline;
use std::path::Path;

/// Load the glacier flowline from a GeoJSON file.
///
/// The first LineString feature is used. Its `RGIID` property, when
/// present, becomes the centerline id.
pub fn load_centerline<P: AsRef<Path>>(path: P) -> Result<Centerline> {
    let path = path.as_ref();
    let collection = FeatureCollection::from_file(path)?;

    for (index, feature) in collection.features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let Ok(line) = geometry.to_line_string() else {
            tracing::debug!("{}: feature {} is not a single line", path.display(), index);
            continue;
        };

        let id = feature.property_str("RGIID").map(str::to_string);
        return Ok(Centerline::new(line, id)?);
    }

    Err(ModelError::NoCenterline(path.to_path_buf()))
}
