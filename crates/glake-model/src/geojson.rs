//! Minimal GeoJSON reading and writing.
//!
//! Only the subset the lake workflow exchanges is modelled: feature
//! collections of points, lines and (multi)polygons with flat properties.
//! Positions may carry a third ordinate, which is ignored on read.

use crate::{ModelError, Result};
use geo::{Coord, Line, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

// ============================================================================
// Schema types
// ============================================================================

/// A GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Vec<f64>),
    LineString(Vec<Vec<f64>>),
    MultiLineString(Vec<Vec<Vec<f64>>>),
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    pub geometry: Option<Geometry>,
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Legacy named-CRS member, passed through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
    pub features: Vec<Feature>,
}

// ============================================================================
// Conversions
// ============================================================================

fn coord(position: &[f64]) -> std::result::Result<Coord<f64>, String> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(format!("position with {} ordinate(s)", position.len())),
    }
}

fn line_string(positions: &[Vec<f64>]) -> std::result::Result<LineString<f64>, String> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> std::result::Result<Polygon<f64>, String> {
    let mut rings = rings.iter().map(|r| line_string(r));
    let exterior = rings.next().ok_or("polygon without rings")??;
    let interiors = rings.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn positions(line: &LineString<f64>) -> Vec<Vec<f64>> {
    line.coords().map(|c| vec![c.x, c.y]).collect()
}

impl Geometry {
    /// Point geometry.
    pub fn point(point: Point<f64>) -> Self {
        Geometry::Point(vec![point.x(), point.y()])
    }

    /// Two-point line geometry.
    pub fn line(line: Line<f64>) -> Self {
        Geometry::LineString(vec![
            vec![line.start.x, line.start.y],
            vec![line.end.x, line.end.y],
        ])
    }

    /// Multipolygon geometry.
    pub fn multi_polygon(polygons: &MultiPolygon<f64>) -> Self {
        Geometry::MultiPolygon(
            polygons
                .0
                .iter()
                .map(|p| {
                    std::iter::once(p.exterior())
                        .chain(p.interiors())
                        .map(positions)
                        .collect()
                })
                .collect(),
        )
    }

    /// The geometry as a line string.
    ///
    /// A multi-line string is accepted when it has exactly one part.
    pub fn to_line_string(&self) -> std::result::Result<LineString<f64>, String> {
        match self {
            Geometry::LineString(p) => line_string(p),
            Geometry::MultiLineString(parts) if parts.len() == 1 => line_string(&parts[0]),
            Geometry::MultiLineString(parts) => {
                Err(format!("multi-line string with {} parts", parts.len()))
            }
            _ => Err("not a line string".to_string()),
        }
    }

    /// The geometry as a multipolygon.
    pub fn to_multi_polygon(&self) -> std::result::Result<MultiPolygon<f64>, String> {
        match self {
            Geometry::Polygon(rings) => Ok(MultiPolygon::new(vec![polygon(rings)?])),
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .map(|rings| polygon(rings))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(MultiPolygon::new),
            _ => Err("not a polygon".to_string()),
        }
    }
}

// ============================================================================
// Features
// ============================================================================

impl Feature {
    /// Feature with a geometry and properties.
    pub fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            kind: "Feature".to_string(),
            properties: Some(properties),
            geometry: Some(geometry),
        }
    }

    /// Raw property value.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(name)
    }

    /// Numeric property. Numeric strings are accepted.
    pub fn property_f64(&self, name: &str) -> Option<f64> {
        match self.property(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String property.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name)?.as_str()
    }
}

impl FeatureCollection {
    /// Collection of `features`.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            name: None,
            crs: None,
            features,
        }
    }

    /// Attach a CRS member, typically copied from an input file.
    pub fn with_crs(mut self, crs: Option<Value>) -> Self {
        self.crs = crs;
        self
    }

    /// Read a collection from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let collection: FeatureCollection = serde_json::from_reader(BufReader::new(file))?;
        Ok(collection)
    }

    /// Write the collection to a file, replacing any existing one.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(ModelError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use serde_json::json;

    #[test]
    fn test_parse_polygon_feature() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32645" } },
            "features": [
                {
                    "type": "Feature",
                    "properties": { "sinkNr": 3, "MAX_round": "4830" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0, 0, 4800], [10, 0, 4800], [10, 10, 4800], [0, 0, 4800]]]
                    }
                }
            ]
        }"#;

        let collection: FeatureCollection = serde_json::from_str(text).unwrap();
        assert!(collection.crs.is_some());

        let feature = &collection.features[0];
        assert_eq!(feature.property_f64("sinkNr"), Some(3.0));
        assert_eq!(feature.property_f64("MAX_round"), Some(4830.0));
        assert_eq!(feature.property_f64("MAX"), None);

        let shape = feature.geometry.as_ref().unwrap().to_multi_polygon().unwrap();
        assert_eq!(shape.0.len(), 1);
        assert_eq!(shape.0[0].exterior().0.len(), 4);
    }

    #[test]
    fn test_single_part_multilinestring() {
        let g = Geometry::MultiLineString(vec![vec![vec![0.0, 0.0], vec![5.0, 5.0]]]);
        assert_eq!(g.to_line_string().unwrap().0.len(), 2);

        let g = Geometry::MultiLineString(vec![vec![], vec![]]);
        assert!(g.to_line_string().is_err());
        assert!(Geometry::Point(vec![1.0]).to_multi_polygon().is_err());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lake.geojson");

        let lake = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 3.0),
        ]]);
        let mut props = Map::new();
        props.insert("sinkNr".to_string(), json!(7));
        let crs = json!({ "type": "name", "properties": { "name": "EPSG:32645" } });

        FeatureCollection::new(vec![Feature::new(Geometry::multi_polygon(&lake), props)])
            .with_crs(Some(crs.clone()))
            .write_to_file(&path)
            .unwrap();

        let back = FeatureCollection::from_file(&path).unwrap();
        assert_eq!(back.crs, Some(crs));
        assert_eq!(back.features[0].property_f64("sinkNr"), Some(7.0));
        assert_eq!(
            back.features[0].geometry.as_ref().unwrap().to_multi_polygon().unwrap(),
            lake
        );
    }
}
