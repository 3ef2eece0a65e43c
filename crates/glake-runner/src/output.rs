//! Result directory layout and writers.
//!
//! ```text
//! <output_root>/<glacier>/
//!   GCM_results/<gcm>/<ssp>/
//!     front_points/front_point<year>.geojson
//!     perpendiculars/frontline<year>.geojson
//!     perpendiculars/new_frontline<year>.geojson
//!     icefree_sinks/<year>/VOL_partial_sink.geojson
//!     icefree_sinks/<year>/VOLsink_<sinkNr>.geojson
//!     icefree_sinks/<year>/VOL_all_sinks.geojson
//!     summary.json
//!   GCM_error/<gcm>
//!   GCM_TIN_error/<gcm>
//! ```

use crate::locator::TerminusPoint;
use crate::outcome::ScenarioSummary;
use crate::resolver::ResolvedLake;
use crate::{Result, RunnerError};
use geo::Point;
use glake_dem::PolygonVolume;
use glake_geometry::CrossSection;
use glake_model::geojson::{Feature, FeatureCollection, Geometry};
use glake_model::{Basin, BasinSet};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

const RESULTS_DIR: &str = "GCM_results";

/// Output tree of one glacier.
#[derive(Debug, Clone)]
pub struct GlacierOutput {
    root: PathBuf,
    crs: Option<Value>,
}

impl GlacierOutput {
    /// Layout under `<output_root>/<glacier_id>`. `crs` is copied into every
    /// GeoJSON file written.
    pub fn new(output_root: &Path, glacier_id: &str, crs: Option<Value>) -> Self {
        Self {
            root: output_root.join(glacier_id),
            crs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Results directory of one climate model.
    pub fn gcm_dir(&self, gcm: &str) -> PathBuf {
        self.root.join(RESULTS_DIR).join(gcm)
    }

    /// Create the results directory of one scenario.
    pub fn scenario(&self, gcm: &str, scenario: &str) -> Result<ScenarioOutput> {
        let dir = self.gcm_dir(gcm).join(scenario);
        std::fs::create_dir_all(&dir)?;
        Ok(ScenarioOutput {
            dir,
            crs: self.crs.clone(),
        })
    }

    /// Move a climate model's results into an error bucket.
    ///
    /// Nothing is deleted: an occupied target gets a numeric suffix.
    /// Returns the new location, or `None` when there was nothing to move.
    pub fn relocate(&self, gcm: &str, bucket: &str) -> Result<Option<PathBuf>> {
        let source = self.gcm_dir(gcm);
        if !source.exists() {
            return Ok(None);
        }

        let bucket_dir = self.root.join(bucket);
        std::fs::create_dir_all(&bucket_dir)?;
        let target = free_target(&bucket_dir, gcm);
        std::fs::rename(&source, &target)?;

        tracing::info!("Moved {} to {}", source.display(), target.display());
        Ok(Some(target))
    }
}

/// `<dir>/<name>`, or `<dir>/<name>_<n>` for the first free `n`.
fn free_target(dir: &Path, name: &str) -> PathBuf {
    let plain = dir.join(name);
    if !plain.exists() {
        return plain;
    }
    (1..)
        .map(|n| dir.join(format!("{}_{}", name, n)))
        .find(|p| !p.exists())
        .unwrap_or(plain)
}

/// Output directory of one (climate model, scenario) run.
#[derive(Debug, Clone)]
pub struct ScenarioOutput {
    dir: PathBuf,
    crs: Option<Value>,
}

impl ScenarioOutput {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, relative: &Path, features: Vec<Feature>) -> Result<PathBuf> {
        let path = self.dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        FeatureCollection::new(features)
            .with_crs(self.crs.clone())
            .write_to_file(&path)?;
        Ok(path)
    }

    fn year_dir(year: i32) -> PathBuf {
        Path::new("icefree_sinks").join(year.to_string())
    }

    pub fn write_front_point(&self, terminus: &TerminusPoint) -> Result<PathBuf> {
        let mut props = Map::new();
        props.insert("year".to_string(), json!(terminus.year));
        props.insert("distance".to_string(), json!(terminus.distance));
        self.write(
            &Path::new("front_points").join(format!("front_point{}.geojson", terminus.year)),
            vec![Feature::new(Geometry::point(terminus.point), props)],
        )
    }

    /// Write a cross-section; `alternate` selects the `new_frontline` name.
    pub fn write_cross_section(&self, year: i32, section: &CrossSection, alternate: bool) -> Result<PathBuf> {
        let name = if alternate { "new_frontline" } else { "frontline" };
        let center: Point<f64> = section.center();
        let mut props = Map::new();
        props.insert("year".to_string(), json!(year));
        props.insert("center_x".to_string(), json!(center.x()));
        props.insert("center_y".to_string(), json!(center.y()));
        self.write(
            &Path::new("perpendiculars").join(format!("{}{}.geojson", name, year)),
            vec![Feature::new(Geometry::line(section.line()), props)],
        )
    }

    /// Write a lake with its volume. Lakes without a volume are refused.
    pub fn write_lake(&self, year: i32, lake: &ResolvedLake) -> Result<PathBuf> {
        let Some(PolygonVolume { volume, surface_area }) = lake.volume else {
            return Err(RunnerError::MissingVolume {
                year,
                sink_nr: lake.sink_nr,
            });
        };

        let mut props = Map::new();
        props.insert("sinkNr".to_string(), json!(lake.sink_nr));
        props.insert("MAX".to_string(), json!(lake.max));
        props.insert("MAX_round".to_string(), json!(lake.max_round));
        props.insert("Volume".to_string(), json!(volume));
        props.insert("SArea".to_string(), json!(surface_area));
        self.write(
            &Self::year_dir(year).join("VOL_partial_sink.geojson"),
            vec![Feature::new(Geometry::multi_polygon(&lake.polygon), props)],
        )
    }

    /// Copy of a basin exposed without a cut.
    pub fn write_exposed_basin(&self, year: i32, basin: &Basin) -> Result<PathBuf> {
        self.write(
            &Self::year_dir(year).join(format!("VOLsink_{}.geojson", basin.sink_nr)),
            vec![basin.to_feature()],
        )
    }

    /// Every basin, for a year without ice.
    pub fn write_all_basins(&self, year: i32, basins: &BasinSet) -> Result<PathBuf> {
        self.write(
            &Self::year_dir(year).join("VOL_all_sinks.geojson"),
            basins.iter().map(Basin::to_feature).collect(),
        )
    }

    pub fn write_summary(&self, summary: &ScenarioSummary<'_>) -> Result<PathBuf> {
        let path = self.dir.join("summary.json");
        let text = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, text)?;
        Ok(path)
    }
}
