//! Reference lines along the flow and cross-sections across it.

use crate::{Centerline, GeometryError, Result};
use geo::{Coord, CoordsIter, Intersects, Line, MultiPolygon, Point};

/// Two-point line from a centerline vertex to the terminus.
///
/// The start is normally the vertex a few positions up-glacier of the vertex
/// nearest to the terminus. Near the head, where that vertex does not exist,
/// the vertex the same number of positions down-glacier is used instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceLine {
    start: Point<f64>,
    end: Point<f64>,
    vertex_index: usize,
}

impl ReferenceLine {
    /// Build the reference line for a terminus point.
    pub fn through_terminus(centerline: &Centerline, terminus: Point<f64>, offset: usize) -> Result<Self> {
        let nearest = centerline.nearest_vertex(terminus);
        let count = centerline.vertex_count();

        let vertex_index = nearest
            .checked_sub(offset)
            .or_else(|| Some(nearest + offset).filter(|&i| i < count))
            .ok_or(GeometryError::NoReferenceVertex {
                nearest,
                offset,
                count,
            })?;

        let start = centerline
            .vertex(vertex_index)
            .ok_or(GeometryError::NoReferenceVertex {
                nearest,
                offset,
                count,
            })?;

        Self::new(start, terminus, vertex_index)
    }

    fn new(start: Point<f64>, end: Point<f64>, vertex_index: usize) -> Result<Self> {
        if !(start.x().is_finite() && start.y().is_finite() && end.x().is_finite() && end.y().is_finite()) {
            return Err(GeometryError::NonFinite("reference line"));
        }
        if start == end {
            return Err(GeometryError::ZeroLengthReference);
        }
        Ok(Self {
            start,
            end,
            vertex_index,
        })
    }

    /// The centerline vertex the line starts at.
    pub fn reference_point(&self) -> Point<f64> {
        self.start
    }

    /// The terminus end of the line.
    pub fn terminus(&self) -> Point<f64> {
        self.end
    }

    /// Index of the reference vertex on the centerline.
    pub fn vertex_index(&self) -> usize {
        self.vertex_index
    }

    /// Planar length.
    pub fn length(&self) -> f64 {
        (self.end.x() - self.start.x()).hypot(self.end.y() - self.start.y())
    }

    /// Unit vector from the reference vertex towards the terminus.
    pub fn direction(&self) -> Coord<f64> {
        let len = self.length();
        Coord {
            x: (self.end.x() - self.start.x()) / len,
            y: (self.end.y() - self.start.y()) / len,
        }
    }

    /// The same line with its terminus end moved `retreat` units towards
    /// the reference vertex.
    pub fn shortened(&self, retreat: f64) -> Result<Self> {
        let length = self.length();
        if length <= retreat {
            return Err(GeometryError::ReferenceTooShort { length, retreat });
        }

        let dir = self.direction();
        let remaining = length - retreat;
        let end = Point::new(
            self.start.x() + dir.x * remaining,
            self.start.y() + dir.y * remaining,
        );
        Self::new(self.start, end, self.vertex_index)
    }

    /// As a `geo` line.
    pub fn line(&self) -> Line<f64> {
        Line::new(self.start, self.end)
    }
}

/// Line perpendicular to a reference line, centered on its terminus end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSection {
    line: Line<f64>,
    center: Point<f64>,
    flow: Coord<f64>,
}

impl CrossSection {
    /// Build the cross-section through the terminus of `reference`,
    /// extending `half_length` to either side.
    pub fn perpendicular(reference: &ReferenceLine, half_length: f64) -> Self {
        let center = reference.terminus();
        let flow = reference.direction();
        let across = Coord {
            x: -flow.y * half_length,
            y: flow.x * half_length,
        };

        let line = Line::new(
            Coord {
                x: center.x() - across.x,
                y: center.y() - across.y,
            },
            Coord {
                x: center.x() + across.x,
                y: center.y() + across.y,
            },
        );

        Self { line, center, flow }
    }

    /// The cross-section line.
    pub fn line(&self) -> Line<f64> {
        self.line
    }

    /// The point the cross-section was built through.
    pub fn center(&self) -> Point<f64> {
        self.center
    }

    /// Midpoint of the line.
    pub fn midpoint(&self) -> Point<f64> {
        Point::new(
            (self.line.start.x + self.line.end.x) / 2.0,
            (self.line.start.y + self.line.end.y) / 2.0,
        )
    }

    /// Unit vector along the flow (reference vertex towards terminus).
    pub fn flow_direction(&self) -> Coord<f64> {
        self.flow
    }

    /// Half of the line length.
    pub fn half_length(&self) -> f64 {
        let d = self.line.delta();
        d.x.hypot(d.y) / 2.0
    }

    /// Whether the line touches or crosses a basin.
    pub fn intersects(&self, basin: &MultiPolygon<f64>) -> bool {
        self.line.intersects(basin)
    }
}

/// Half-length that lets a cross-section through `center` span every basin.
///
/// This is the largest distance from `center` to any basin vertex, plus a
/// small margin so the line ends strictly outside the basins.
pub fn spanning_half_length<'a>(
    center: Point<f64>,
    basins: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
) -> f64 {
    let farthest = basins
        .into_iter()
        .flat_map(|basin| basin.coords_iter())
        .map(|c| (c.x - center.x()).hypot(c.y - center.y()))
        .fold(0.0_f64, f64::max);

    farthest + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{line_string, polygon};

    /// Straight flowline along +x with a vertex every 10 m.
    fn straight(length: f64) -> Centerline {
        let n = (length / 10.0) as usize;
        let coords: Vec<(f64, f64)> = (0..=n).map(|i| (i as f64 * 10.0, 0.0)).collect();
        Centerline::new(coords.into(), None).unwrap()
    }

    #[test]
    fn test_reference_vertex_up_glacier() {
        let line = straight(1000.0);
        let reference = ReferenceLine::through_terminus(&line, Point::new(700.0, 0.0), 5).unwrap();

        assert_eq!(reference.vertex_index(), 65);
        assert_eq!(reference.reference_point(), Point::new(650.0, 0.0));
        assert_relative_eq!(reference.length(), 50.0);
    }

    #[test]
    fn test_reference_vertex_falls_back_down_glacier() {
        let line = straight(1000.0);
        let reference = ReferenceLine::through_terminus(&line, Point::new(20.0, 0.0), 5).unwrap();

        assert_eq!(reference.vertex_index(), 7);
        assert_eq!(reference.reference_point(), Point::new(70.0, 0.0));
    }

    #[test]
    fn test_no_reference_vertex() {
        let line = Centerline::new(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], None).unwrap();
        assert!(matches!(
            ReferenceLine::through_terminus(&line, Point::new(4.0, 0.0), 5),
            Err(GeometryError::NoReferenceVertex { nearest: 0, .. })
        ));
    }

    #[test]
    fn test_terminus_on_reference_vertex() {
        let line = straight(100.0);
        // Nearest vertex is 5, so the down-glacier fallback is vertex 10 at
        // (100, 0); a terminus there has no direction
        let result = ReferenceLine::through_terminus(&line, Point::new(100.0, 0.0), 10);
        assert!(matches!(result, Err(GeometryError::ZeroLengthReference)));
    }

    #[test]
    fn test_perpendicular_through_terminus() {
        let line = straight(1000.0);
        let reference = ReferenceLine::through_terminus(&line, Point::new(700.0, 0.0), 5).unwrap();
        let section = CrossSection::perpendicular(&reference, 120.0);

        let l = section.line();
        assert_relative_eq!(l.start.x, 700.0);
        assert_relative_eq!(l.end.x, 700.0);
        assert_relative_eq!((l.end.y - l.start.y).abs(), 240.0);
        assert_relative_eq!(section.half_length(), 120.0);
        assert_eq!(section.midpoint(), Point::new(700.0, 0.0));
        assert_eq!(section.flow_direction(), Coord { x: 1.0, y: 0.0 });
    }

    #[test]
    fn test_cross_section_is_idempotent() {
        let line = straight(1000.0);
        let terminus = line.point_at_distance(733.3);

        let a = CrossSection::perpendicular(
            &ReferenceLine::through_terminus(&line, terminus, 5).unwrap(),
            300.0,
        );
        let b = CrossSection::perpendicular(
            &ReferenceLine::through_terminus(&line, terminus, 5).unwrap(),
            300.0,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_shortened_moves_terminus_up_glacier() {
        let line = straight(1000.0);
        let reference = ReferenceLine::through_terminus(&line, Point::new(700.0, 0.0), 5).unwrap();

        let alternate = reference.shortened(20.0).unwrap();
        assert_eq!(alternate.reference_point(), reference.reference_point());
        assert_relative_eq!(alternate.terminus().x(), 680.0);

        assert!(matches!(
            reference.shortened(50.0),
            Err(GeometryError::ReferenceTooShort { .. })
        ));
    }

    #[test]
    fn test_spanning_half_length_and_intersects() {
        let basin = MultiPolygon::new(vec![polygon![
            (x: 650.0, y: -50.0),
            (x: 760.0, y: -50.0),
            (x: 760.0, y: 50.0),
            (x: 650.0, y: 50.0),
        ]]);
        let center = Point::new(700.0, 0.0);
        let half = spanning_half_length(center, [&basin]);
        assert_relative_eq!(half, 60.0_f64.hypot(50.0) + 1.0);

        let line = straight(1000.0);
        let reference = ReferenceLine::through_terminus(&line, center, 5).unwrap();
        assert!(CrossSection::perpendicular(&reference, half).intersects(&basin));

        let far = ReferenceLine::through_terminus(&line, Point::new(900.0, 0.0), 5).unwrap();
        assert!(!CrossSection::perpendicular(&far, half).intersects(&basin));
    }
}
