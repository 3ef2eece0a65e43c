//! Cutting a basin along a cross-section.

use crate::{CrossSection, GeometryError, Result};
use geo::{Area, BooleanOps, Coord, Distance, Euclidean, LineString, MultiPolygon, Point, Polygon};

/// Fragments smaller than this (m²) are treated as clipping noise.
const SLIVER_AREA: f64 = 1e-6;

/// The two sides of a basin cut by a cross-section.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinSplit {
    /// Part on the terminus side, in the flow direction.
    pub ahead: MultiPolygon<f64>,
    /// Part on the reference vertex side.
    pub behind: MultiPolygon<f64>,
}

/// Split `basin` along the infinite extension of `section`.
///
/// The cut uses a half-plane rectangle on the flow side of the section,
/// large enough to cover the whole basin. Fails with
/// [`GeometryError::NotSplit`] unless both sides keep a non-sliver area.
pub fn split_basin(basin: &MultiPolygon<f64>, section: &CrossSection) -> Result<BasinSplit> {
    let half_plane = MultiPolygon::new(vec![half_plane(basin, section)]);

    let ahead = drop_slivers(basin.intersection(&half_plane));
    let behind = drop_slivers(basin.difference(&half_plane));

    let sides = [&ahead, &behind]
        .iter()
        .filter(|side| !side.0.is_empty())
        .count();
    if sides < 2 {
        return Err(GeometryError::NotSplit { sides });
    }

    Ok(BasinSplit { ahead, behind })
}

/// Rectangle with one edge on the section line, extending in the flow
/// direction past every basin vertex.
fn half_plane(basin: &MultiPolygon<f64>, section: &CrossSection) -> Polygon<f64> {
    let flow = section.flow_direction();
    let center = section.center();

    // Reach is the larger of the section half-length and the farthest basin
    // vertex, so a short alternate section still cuts the whole basin
    let reach = crate::spanning_half_length(center, [basin]).max(section.half_length());

    let across = Coord {
        x: -flow.y * reach,
        y: flow.x * reach,
    };
    let ahead = Coord {
        x: flow.x * reach * 2.0,
        y: flow.y * reach * 2.0,
    };
    let c = Coord {
        x: center.x(),
        y: center.y(),
    };

    let a = c - across;
    let b = c + across;
    Polygon::new(LineString::new(vec![a, b, b + ahead, a + ahead, a]), vec![])
}

fn drop_slivers(parts: MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(
        parts
            .0
            .into_iter()
            .filter(|p| p.unsigned_area() > SLIVER_AREA)
            .collect(),
    )
}

/// Shortest distance from `point` to any polygon of a fragment.
///
/// Returns infinity for an empty fragment.
pub fn point_to_fragment_distance(point: Point<f64>, fragment: &MultiPolygon<f64>) -> f64 {
    fragment
        .0
        .iter()
        .map(|polygon| Euclidean.distance(&point, polygon))
        .fold(f64::INFINITY, f64::min)
}

/// Keep the side of a split that lies strictly farther from the reference
/// vertex. Equal distances are reported as [`GeometryError::ClipTie`].
pub fn keep_far_fragment(split: BasinSplit, reference: Point<f64>) -> Result<MultiPolygon<f64>> {
    let ahead = point_to_fragment_distance(reference, &split.ahead);
    let behind = point_to_fragment_distance(reference, &split.behind);

    if ahead > behind {
        Ok(split.ahead)
    } else if behind > ahead {
        Ok(split.behind)
    } else {
        Err(GeometryError::ClipTie { distance: ahead })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Centerline, ReferenceLine};
    use approx::assert_relative_eq;
    use geo::polygon;

    fn rectangle(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
        ]])
    }

    fn section_at(x: f64, basin: &MultiPolygon<f64>) -> (CrossSection, ReferenceLine) {
        let coords: Vec<(f64, f64)> = (0..=100).map(|i| (i as f64 * 10.0, 0.0)).collect();
        let line = Centerline::new(coords.into(), None).unwrap();
        let reference = ReferenceLine::through_terminus(&line, Point::new(x, 0.0), 5).unwrap();
        let half = crate::spanning_half_length(reference.terminus(), [basin]);
        (CrossSection::perpendicular(&reference, half), reference)
    }

    #[test]
    fn test_split_keeps_down_glacier_part() {
        let basin = rectangle(650.0, 760.0, -50.0, 50.0);
        let (section, reference) = section_at(700.0, &basin);

        let split = split_basin(&basin, &section).unwrap();
        assert_relative_eq!(split.ahead.unsigned_area(), 60.0 * 100.0, max_relative = 1e-9);
        assert_relative_eq!(split.behind.unsigned_area(), 50.0 * 100.0, max_relative = 1e-9);

        let kept = keep_far_fragment(split, reference.reference_point()).unwrap();
        assert_relative_eq!(kept.unsigned_area(), 6000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_section_missing_basin_is_not_split() {
        let basin = rectangle(650.0, 760.0, -50.0, 50.0);
        let (section, _) = section_at(900.0, &basin);

        assert!(matches!(
            split_basin(&basin, &section),
            Err(GeometryError::NotSplit { sides: 1 })
        ));
    }

    #[test]
    fn test_equidistant_fragments_tie() {
        // Two unit squares mirrored around a reference point
        let split = BasinSplit {
            ahead: rectangle(10.0, 11.0, -0.5, 0.5),
            behind: rectangle(-11.0, -10.0, -0.5, 0.5),
        };
        assert!(matches!(
            keep_far_fragment(split, Point::new(0.0, 0.0)),
            Err(GeometryError::ClipTie { .. })
        ));
    }

    #[test]
    fn test_fragment_distance() {
        let fragment = rectangle(10.0, 20.0, 0.0, 10.0);
        assert_relative_eq!(point_to_fragment_distance(Point::new(0.0, 5.0), &fragment), 10.0);
        assert_eq!(point_to_fragment_distance(Point::new(15.0, 5.0), &fragment), 0.0);
        assert!(point_to_fragment_distance(Point::new(0.0, 0.0), &MultiPolygon::new(vec![])).is_infinite());
    }
}
