//! Glacier flowline.

use crate::{GeometryError, Result};
use geo::{Coord, LineString, Point};

/// A glacier centerline, ordered from the glacier head to the terminus.
///
/// Distances along the line are measured from the head, which is the same
/// end the ice-dynamics model measures glacier length from.
#[derive(Debug, Clone, PartialEq)]
pub struct Centerline {
    /// Glacier identifier carried by the flowline, if any.
    id: Option<String>,
    /// Vertices, head first. Consecutive duplicates are removed.
    vertices: Vec<Coord<f64>>,
    /// Cumulative distance from the head at each vertex.
    cumulative: Vec<f64>,
}

impl Centerline {
    /// Build a centerline from a line string.
    pub fn new(line: LineString<f64>, id: Option<String>) -> Result<Self> {
        let mut vertices: Vec<Coord<f64>> = Vec::with_capacity(line.0.len());
        for c in line.0 {
            if !c.x.is_finite() || !c.y.is_finite() {
                return Err(GeometryError::NonFinite("centerline"));
            }
            if vertices.last() != Some(&c) {
                vertices.push(c);
            }
        }
        if vertices.len() < 2 {
            return Err(GeometryError::ShortCenterline {
                vertices: vertices.len(),
            });
        }

        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in vertices.windows(2) {
            total += (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y);
            cumulative.push(total);
        }

        Ok(Self {
            id,
            vertices,
            cumulative,
        })
    }

    /// Glacier identifier, if the flowline carried one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Present-day glacier length along the flowline.
    pub fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex at `index`, if it exists.
    pub fn vertex(&self, index: usize) -> Option<Point<f64>> {
        self.vertices.get(index).map(|&c| Point::from(c))
    }

    /// The flowline as a line string.
    pub fn line_string(&self) -> LineString<f64> {
        LineString::new(self.vertices.clone())
    }

    /// Point at `distance` from the head, clamped to the line.
    pub fn point_at_distance(&self, distance: f64) -> Point<f64> {
        let d = distance.clamp(0.0, self.length());

        // First segment whose end lies at or beyond d
        let seg = self
            .cumulative
            .iter()
            .skip(1)
            .position(|&c| c >= d)
            .unwrap_or(self.vertices.len() - 2);

        let (a, b) = (self.vertices[seg], self.vertices[seg + 1]);
        let seg_len = self.cumulative[seg + 1] - self.cumulative[seg];
        let t = if seg_len > 0.0 {
            (d - self.cumulative[seg]) / seg_len
        } else {
            0.0
        };

        Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
    }

    /// Index of the vertex nearest to `point`.
    ///
    /// Ties resolve to the first vertex from the head.
    pub fn nearest_vertex(&self, point: Point<f64>) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, c) in self.vertices.iter().enumerate() {
            let d = (c.x - point.x()).hypot(c.y - point.y());
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    }
}
