//! Candidate lake basins of one glacier.

use crate::geojson::{Feature, FeatureCollection, Geometry};
use crate::{ModelError, Result};
use geo::{Area, BooleanOps, Intersects, MultiPolygon, Point};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Load a glacier outline, merging all polygon features.
pub fn load_outline<P: AsRef<Path>>(path: P) -> Result<MultiPolygon<f64>> {
    let path = path.as_ref();
    let collection = FeatureCollection::from_file(path)?;

    let mut polygons = Vec::new();
    for (index, feature) in collection.features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let shape = geometry
            .to_multi_polygon()
            .map_err(|reason| ModelError::InvalidFeature {
                path: path.to_path_buf(),
                index,
                reason,
            })?;
        polygons.extend(shape.0);
    }
    Ok(MultiPolygon::new(polygons))
}

/// A bedrock overdeepening that may hold a lake once the ice is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct Basin {
    /// Basin identifier, also addressing the basin's TIN.
    pub sink_nr: u32,
    /// Rim elevation rounded to whole metres.
    pub max_round: i64,
    /// Unrounded rim elevation, the reference plane for volumes.
    pub max: f64,
    /// Basin outline.
    pub polygon: MultiPolygon<f64>,
}

impl Basin {
    /// Whether `point` lies in or on the basin.
    pub fn contains_or_touches(&self, point: Point<f64>) -> bool {
        self.polygon.intersects(&point)
    }

    /// Attribute map written with exposed-basin copies.
    pub fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("sinkNr".to_string(), json!(self.sink_nr));
        props.insert("MAX".to_string(), json!(self.max));
        props.insert("MAX_round".to_string(), json!(self.max_round));
        props
    }

    /// The basin as a GeoJSON feature.
    pub fn to_feature(&self) -> Feature {
        Feature::new(Geometry::multi_polygon(&self.polygon), self.properties())
    }

    fn from_feature(feature: &Feature, index: usize, path: &Path) -> Result<Self> {
        let invalid = |reason: String| ModelError::InvalidFeature {
            path: path.to_path_buf(),
            index,
            reason,
        };

        let sink_nr = feature
            .property_f64("sinkNr")
            .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0)
            .ok_or_else(|| invalid("missing or invalid 'sinkNr'".to_string()))?
            as u32;
        let max_round = feature
            .property_f64("MAX_round")
            .filter(|m| m.is_finite())
            .ok_or_else(|| invalid("missing or invalid 'MAX_round'".to_string()))?
            .round() as i64;
        let max = feature
            .property_f64("MAX")
            .filter(|m| m.is_finite())
            .unwrap_or(max_round as f64);
        let polygon = feature
            .geometry
            .as_ref()
            .ok_or_else(|| invalid("no geometry".to_string()))?
            .to_multi_polygon()
            .map_err(invalid)?;

        Ok(Self {
            sink_nr,
            max_round,
            max,
            polygon,
        })
    }
}

/// The basins of one glacier, ordered by ascending `sink_nr`.
///
/// Every "first match wins" rule in the workflow uses this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasinSet {
    basins: Vec<Basin>,
    crs: Option<Value>,
}

impl BasinSet {
    /// Build a set; fails on duplicate basin numbers.
    pub fn new(mut basins: Vec<Basin>) -> Result<Self> {
        basins.sort_by_key(|b| b.sink_nr);
        if let Some(pair) = basins.windows(2).find(|w| w[0].sink_nr == w[1].sink_nr) {
            return Err(ModelError::DuplicateSink(pair[0].sink_nr));
        }
        Ok(Self { basins, crs: None })
    }

    /// Load a basin catalog from GeoJSON.
    pub fn from_geojson<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let collection = FeatureCollection::from_file(path)?;

        let basins = collection
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| Basin::from_feature(f, i, path))
            .collect::<Result<Vec<_>>>()?;

        let mut set = Self::new(basins)?;
        set.crs = collection.crs;
        tracing::debug!("Loaded {} basins from {}", set.len(), path.display());
        Ok(set)
    }

    /// Clip every basin to a glacier outline, dropping basins left empty.
    pub fn clip_to(self, outline: &MultiPolygon<f64>) -> Self {
        let before = self.basins.len();
        let basins: Vec<Basin> = self
            .basins
            .into_iter()
            .filter_map(|basin| {
                let clipped = basin.polygon.intersection(outline);
                (clipped.unsigned_area() > 0.0).then_some(Basin {
                    polygon: clipped,
                    ..basin
                })
            })
            .collect();

        if basins.len() < before {
            tracing::debug!(
                "{} basin(s) outside the glacier outline dropped",
                before - basins.len()
            );
        }
        Self {
            basins,
            crs: self.crs,
        }
    }

    /// CRS member of the source file, if any.
    pub fn crs(&self) -> Option<&Value> {
        self.crs.as_ref()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Basin> {
        self.basins.iter()
    }

    pub fn len(&self) -> usize {
        self.basins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basins.is_empty()
    }

    /// Basin by number.
    pub fn get(&self, sink_nr: u32) -> Option<&Basin> {
        self.basins
            .binary_search_by_key(&sink_nr, |b| b.sink_nr)
            .ok()
            .map(|i| &self.basins[i])
    }

    /// First basin, in set order, that `point` lies in or on.
    pub fn first_touching(&self, point: Point<f64>) -> Option<&Basin> {
        self.basins.iter().find(|b| b.contains_or_touches(point))
    }

    /// Basins with a rim strictly below `elevation`, in set order.
    pub fn rims_below(&self, elevation: i64) -> impl Iterator<Item = &Basin> {
        self.basins.iter().filter(move |b| b.max_round < elevation)
    }
}

impl<'a> IntoIterator for &'a BasinSet {
    type Item = &'a Basin;
    type IntoIter = std::slice::Iter<'a, Basin>;

    fn into_iter(self) -> Self::IntoIter {
        self.basins.iter()
    }
}
