//! Triangulated bedrock surfaces and polygon volume integration.
//!
//! A [`BedrockTin`] is a Delaunay triangulation of bedrock mass points. Each
//! triangle is a plane, so the volume between a horizontal reference plane
//! and the surface can be integrated exactly per triangle: clip the triangle
//! to the part below the plane, intersect it with the lake polygon, and use
//! `area * (h - z(centroid))`, which is exact for a linear integrand.

use crate::{DemError, Result};
use geo::{Area, BooleanOps, BoundingRect, Centroid, Coord, LineString, MultiPolygon, Polygon, Rect};
use spade::{DelaunayTriangulation, FloatTriangulation, HasPosition, Point2, Triangulation};
use std::path::Path;

/// Fragments smaller than this (in square map units) are treated as empty.
const MIN_PIECE_AREA: f64 = 1e-9;

/// A bedrock mass point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TinVertex {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
    /// Bedrock elevation.
    pub z: f64,
}

impl TinVertex {
    /// Create a new mass point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl HasPosition for TinVertex {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// Volume and submerged surface area of a polygon against a TIN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonVolume {
    /// Volume between the reference plane and the surface below it.
    pub volume: f64,
    /// 3-D area of the surface below the reference plane within the polygon.
    pub surface_area: f64,
}

/// A triangulated bedrock surface.
pub struct BedrockTin {
    triangulation: DelaunayTriangulation<TinVertex>,
    extent: Rect<f64>,
}

impl std::fmt::Debug for BedrockTin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockTin")
            .field("vertices", &self.triangulation.num_vertices())
            .field("triangles", &self.triangulation.num_inner_faces())
            .field("extent", &self.extent)
            .finish()
    }
}

/// A TIN triangle with its plane `z = z0 + gx * (x - x0) + gy * (y - y0)`.
struct Facet {
    corners: [TinVertex; 3],
    gx: f64,
    gy: f64,
}

impl Facet {
    fn new(corners: [TinVertex; 3]) -> Option<Self> {
        let [a, b, c] = corners;
        let (ux, uy, uz) = (b.x - a.x, b.y - a.y, b.z - a.z);
        let (vx, vy, vz) = (c.x - a.x, c.y - a.y, c.z - a.z);
        let det = ux * vy - uy * vx;
        if det.abs() < f64::EPSILON {
            return None;
        }

        Some(Self {
            corners,
            gx: (uz * vy - uy * vz) / det,
            gy: (ux * vz - uz * vx) / det,
        })
    }

    fn elevation(&self, x: f64, y: f64) -> f64 {
        let a = self.corners[0];
        a.z + self.gx * (x - a.x) + self.gy * (y - a.y)
    }

    /// Ratio of surface area to planar area.
    fn slope_factor(&self) -> f64 {
        (1.0 + self.gx * self.gx + self.gy * self.gy).sqrt()
    }

    fn polygon(&self) -> Polygon<f64> {
        ring(self.corners.iter().map(|v| Coord { x: v.x, y: v.y }).collect())
    }

    /// Part of the triangle lying at or below `height` (Sutherland-Hodgman
    /// against the plane, which stays convex).
    fn below(&self, height: f64) -> Vec<Coord<f64>> {
        let mut out = Vec::with_capacity(4);
        let mut s = self.corners[2];
        for &e in &self.corners {
            let ds = s.z - height;
            let de = e.z - height;
            if de <= 0.0 {
                if ds > 0.0 {
                    out.push(crossing(s, e, ds, de));
                }
                out.push(Coord { x: e.x, y: e.y });
            } else if ds <= 0.0 {
                out.push(crossing(s, e, ds, de));
            }
            s = e;
        }
        out
    }
}

fn crossing(s: TinVertex, e: TinVertex, ds: f64, de: f64) -> Coord<f64> {
    let t = ds / (ds - de);
    Coord {
        x: s.x + t * (e.x - s.x),
        y: s.y + t * (e.y - s.y),
    }
}

fn ring(mut coords: Vec<Coord<f64>>) -> Polygon<f64> {
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    Polygon::new(LineString::new(coords), vec![])
}

fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

impl BedrockTin {
    /// Triangulate a set of mass points.
    pub fn from_vertices(vertices: Vec<TinVertex>) -> Result<Self> {
        let count = vertices.len();
        let extent = vertices
            .iter()
            .map(|v| Coord { x: v.x, y: v.y })
            .collect::<LineString<f64>>()
            .bounding_rect()
            .ok_or(DemError::EmptySurface { vertices: count })?;

        let triangulation = DelaunayTriangulation::<TinVertex>::bulk_load_stable(vertices)
            .map_err(|e| DemError::Triangulation(format!("{:?}", e)))?;

        if triangulation.num_inner_faces() == 0 {
            return Err(DemError::EmptySurface { vertices: count });
        }

        Ok(Self {
            triangulation,
            extent,
        })
    }

    /// Load mass points from a text file with one `x,y,z` record per line.
    ///
    /// Fields may be separated by commas, semicolons or whitespace. A first
    /// line that does not parse as numbers is treated as a header.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut vertices = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();
            let parsed: std::result::Result<Vec<f64>, _> =
                fields.iter().take(3).map(|f| f.parse::<f64>()).collect();

            match parsed {
                Ok(values) if values.len() == 3 => {
                    vertices.push(TinVertex::new(values[0], values[1], values[2]));
                }
                Err(_) if idx == 0 => continue,
                _ => {
                    return Err(DemError::InvalidTinRecord {
                        path: path.display().to_string(),
                        line: idx + 1,
                        reason: format!("expected three numbers, got '{}'", line),
                    });
                }
            }
        }

        let tin = Self::from_vertices(vertices)?;
        tracing::debug!("Loaded TIN {} ({:?})", path.display(), tin);
        Ok(tin)
    }

    /// Number of mass points.
    pub fn num_vertices(&self) -> usize {
        self.triangulation.num_vertices()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangulation.num_inner_faces()
    }

    /// Bounding rectangle of the mass points.
    pub fn extent(&self) -> Rect<f64> {
        self.extent
    }

    /// Surface elevation at a coordinate, or `None` outside the convex hull.
    pub fn elevation_at(&self, x: f64, y: f64) -> Option<f64> {
        self.triangulation
            .barycentric()
            .interpolate(|v| v.data().z, Point2::new(x, y))
    }

    /// Integrate `reference_height - z` over the part of `lake` where the
    /// surface lies below `reference_height`.
    ///
    /// Fails if the polygon is degenerate or does not overlap the surface at
    /// all; a polygon that overlaps only ground above the plane has volume 0.
    pub fn polygon_volume(&self, lake: &MultiPolygon<f64>, reference_height: f64) -> Result<PolygonVolume> {
        check_integrable(lake, reference_height)?;

        let lake_rect = lake
            .bounding_rect()
            .ok_or_else(|| DemError::DegeneratePolygon("polygon has no extent".to_string()))?;

        let mut overlap = 0.0;
        let mut volume = 0.0;
        let mut surface_area = 0.0;

        for face in self.triangulation.inner_faces() {
            let corners = face.vertices().map(|v| *v.data());
            let Some(facet) = Facet::new(corners) else {
                continue;
            };

            let triangle = facet.polygon();
            if !triangle
                .bounding_rect()
                .is_some_and(|r| rects_overlap(&r, &lake_rect))
            {
                continue;
            }

            let inside = lake.intersection(&triangle);
            let inside_area = inside.unsigned_area();
            if inside_area <= MIN_PIECE_AREA {
                continue;
            }
            overlap += inside_area;

            let below = facet.below(reference_height);
            if below.len() < 3 {
                continue;
            }
            let submerged = if below.len() == 3 && corners.iter().all(|v| v.z <= reference_height) {
                inside
            } else {
                inside.intersection(&ring(below))
            };

            let area = submerged.unsigned_area();
            if area <= MIN_PIECE_AREA {
                continue;
            }
            let Some(centroid) = submerged.centroid() else {
                continue;
            };

            volume += area * (reference_height - facet.elevation(centroid.x(), centroid.y()));
            surface_area += area * facet.slope_factor();
        }

        if overlap <= MIN_PIECE_AREA {
            return Err(DemError::NoSurfaceOverlap {
                area: lake.unsigned_area(),
            });
        }

        Ok(PolygonVolume {
            volume: volume.max(0.0),
            surface_area,
        })
    }
}

fn check_integrable(lake: &MultiPolygon<f64>, reference_height: f64) -> Result<()> {
    if !reference_height.is_finite() {
        return Err(DemError::DegeneratePolygon(format!(
            "reference height {} is not finite",
            reference_height
        )));
    }
    if lake.0.is_empty() {
        return Err(DemError::DegeneratePolygon("polygon is empty".to_string()));
    }

    for polygon in &lake.0 {
        if polygon.exterior().0.len() < 4 {
            return Err(DemError::DegeneratePolygon(format!(
                "exterior ring has {} coordinates",
                polygon.exterior().0.len()
            )));
        }
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for ring in rings {
            if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
                return Err(DemError::DegeneratePolygon(
                    "ring contains non-finite coordinates".to_string(),
                ));
            }
        }
    }

    if lake.unsigned_area() <= MIN_PIECE_AREA {
        return Err(DemError::DegeneratePolygon("polygon has no area".to_string()));
    }

    Ok(())
}
