//! Lake volume against the basin TIN, with one repaired-geometry retry.

use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use glake_dem::{DemError, PolygonVolume, TinStore};
use thiserror::Error;

/// Grid the repaired polygon is snapped to (m).
const SNAP_TOLERANCE: f64 = 0.001;

/// Both volume attempts failed.
#[derive(Debug, Error)]
#[error("{primary} (retry: {alternate})")]
pub struct VolumeFailure {
    pub primary: DemError,
    pub alternate: DemError,
}

/// Volume of `lake` below `max` over the TIN of basin `sink_nr`.
pub fn try_compute_volume(
    store: &TinStore,
    sink_nr: u32,
    lake: &MultiPolygon<f64>,
    max: f64,
) -> Result<PolygonVolume, DemError> {
    store.with_tin(sink_nr, |tin| tin.polygon_volume(lake, max))?
}

/// Retry on a repaired copy of the polygon.
pub fn try_compute_volume_alternate(
    store: &TinStore,
    sink_nr: u32,
    lake: &MultiPolygon<f64>,
    max: f64,
) -> Result<PolygonVolume, DemError> {
    let repaired = repair_polygon(lake);
    try_compute_volume(store, sink_nr, &repaired, max)
}

/// Primary attempt, then one retry. The caller decides what a double
/// failure means for the run.
pub fn estimate_volume(
    store: &TinStore,
    sink_nr: u32,
    lake: &MultiPolygon<f64>,
    max: f64,
) -> Result<PolygonVolume, VolumeFailure> {
    let primary = match try_compute_volume(store, sink_nr, lake, max) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };
    tracing::warn!("Volume of basin {} failed ({}), retrying on repaired polygon", sink_nr, primary);

    try_compute_volume_alternate(store, sink_nr, lake, max)
        .map_err(|alternate| VolumeFailure { primary, alternate })
}

/// Copy of a polygon with non-finite and repeated vertices dropped,
/// coordinates snapped to [`SNAP_TOLERANCE`] and rings re-oriented.
/// Rings left with fewer than three distinct vertices are dropped.
pub fn repair_polygon(lake: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let polygons = lake
        .0
        .iter()
        .filter_map(|polygon| {
            let exterior = repair_ring(polygon.exterior())?;
            let interiors = polygon.interiors().iter().filter_map(repair_ring).collect();
            Some(Polygon::new(exterior, interiors))
        })
        .collect::<Vec<_>>();

    MultiPolygon::new(polygons).orient(Direction::Default)
}

fn repair_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let scale = SNAP_TOLERANCE.recip();
    let snap = |v: f64| (v * scale).round() / scale;

    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for c in ring.coords() {
        if !c.x.is_finite() || !c.y.is_finite() {
            continue;
        }
        let c = Coord {
            x: snap(c.x),
            y: snap(c.y),
        };
        if coords.last() != Some(&c) {
            coords.push(c);
        }
    }
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }
    coords.push(coords[0]);
    Some(LineString::new(coords))
}
