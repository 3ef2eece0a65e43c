//! Which basin the terminus opens up, and what is left of it as a lake.

use crate::locator::TerminusPoint;
use geo::{Intersects, MultiPolygon, Point};
use glake_dem::{BedrockRaster, PolygonVolume};
use glake_geometry::{
    keep_far_fragment, spanning_half_length, split_basin, Centerline, CrossSection, GeometryError,
    ReferenceLine,
};
use glake_model::{Basin, BasinSet, ResolverConfig};

/// Lake cut from the frontal basin for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLake {
    pub sink_nr: u32,
    /// Rim elevation used as the reference plane.
    pub max: f64,
    pub max_round: i64,
    pub polygon: MultiPolygon<f64>,
    /// Set once the volume has been computed; volume and area always come
    /// together.
    pub volume: Option<PolygonVolume>,
}

impl ResolvedLake {
    fn from_fragment(basin: &Basin, polygon: MultiPolygon<f64>) -> Self {
        Self {
            sink_nr: basin.sink_nr,
            max: basin.max,
            max_round: basin.max_round,
            polygon,
            volume: None,
        }
    }

    /// The lake with its computed volume.
    pub fn with_volume(self, volume: PolygonVolume) -> Self {
        Self {
            volume: Some(volume),
            ..self
        }
    }
}

/// Why a year produced no lake and no exposure.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Reference line, split or fragment choice failed.
    Geometry(String),
    /// No bedrock value at the sample point.
    BedrockUnavailable { x: f64, y: f64, message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Geometry(msg) => write!(f, "{}", msg),
            SkipReason::BedrockUnavailable { x, y, message } => {
                write!(f, "no bedrock at ({:.1}, {:.1}): {}", x, y, message)
            }
        }
    }
}

impl From<GeometryError> for SkipReason {
    fn from(err: GeometryError) -> Self {
        SkipReason::Geometry(err.to_string())
    }
}

/// Result of resolving one terminus.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The terminus sits on a basin and cuts a lake from it. `exposed`
    /// lists other basins with a lower rim.
    Lake { lake: ResolvedLake, exposed: Vec<u32> },
    /// No frontal basin; basins with a rim below the front are exposed.
    Exposed { altitude_front: i64, exposed: Vec<u32> },
    /// Nothing could be resolved this year.
    Skipped(SkipReason),
}

/// Per-year geometry and its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct YearResolution {
    /// Cross-section through the terminus, when a reference line exists.
    pub primary: Option<CrossSection>,
    /// Cross-section moved up-glacier, when the ice was thinner than the
    /// basin was deep.
    pub alternate: Option<CrossSection>,
    /// Frontal claim dropped because the shortened reference line missed
    /// the basin.
    pub retracted: bool,
    pub outcome: Resolution,
}

/// Cross-section chosen for a frontal basin.
enum SectionChoice {
    Primary,
    Alternate(CrossSection),
    /// The frontal claim is dropped. Carries the alternate section when one
    /// could be built.
    Retracted(Option<CrossSection>),
}

/// Resolves termini against the basins of one glacier.
pub struct BasinResolver<'a> {
    centerline: &'a Centerline,
    basins: &'a BasinSet,
    bedrock: &'a BedrockRaster,
    config: &'a ResolverConfig,
}

impl<'a> BasinResolver<'a> {
    pub fn new(
        centerline: &'a Centerline,
        basins: &'a BasinSet,
        bedrock: &'a BedrockRaster,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            centerline,
            basins,
            bedrock,
            config,
        }
    }

    fn bedrock_at(&self, point: Point<f64>) -> Result<f64, SkipReason> {
        self.bedrock
            .value_at(point.x(), point.y())
            .map(f64::from)
            .map_err(|e| SkipReason::BedrockUnavailable {
                x: point.x(),
                y: point.y(),
                message: e.to_string(),
            })
    }

    /// Resolve one terminus.
    ///
    /// `thickness` is the terminus ice thickness for the year; a missing or
    /// NaN value keeps the cross-section at the terminus.
    pub fn resolve(&self, terminus: &TerminusPoint, thickness: Option<f64>) -> YearResolution {
        let reference = match ReferenceLine::through_terminus(
            self.centerline,
            terminus.point,
            self.config.vertex_offset,
        ) {
            Ok(r) => r,
            Err(e) => {
                return YearResolution {
                    primary: None,
                    alternate: None,
                    retracted: false,
                    outcome: Resolution::Skipped(e.into()),
                }
            }
        };

        let half_length = spanning_half_length(terminus.point, self.basins.iter().map(|b| &b.polygon));
        let primary = CrossSection::perpendicular(&reference, half_length);
        let year = |alternate, retracted, outcome| YearResolution {
            primary: Some(primary),
            alternate,
            retracted,
            outcome,
        };

        let Some(basin) = self.basins.first_touching(terminus.point) else {
            tracing::debug!("{}: no basin at the front", terminus.year);
            return year(None, false, self.exposed_below(terminus.point));
        };

        let front_elevation = match self.bedrock_at(terminus.point) {
            Ok(z) => z,
            Err(reason) => return year(None, false, Resolution::Skipped(reason)),
        };

        match self.choose_section(basin, front_elevation, thickness, &reference, half_length) {
            SectionChoice::Primary => year(None, false, self.lake_outcome(basin, &primary, &reference)),
            SectionChoice::Alternate(alternate) => year(
                Some(alternate),
                false,
                self.lake_outcome(basin, &alternate, &reference),
            ),
            SectionChoice::Retracted(alternate) => {
                tracing::info!(
                    "{}: ice thinner than basin {} is deep, frontal claim retracted",
                    terminus.year,
                    basin.sink_nr
                );
                let sample = alternate.map_or(terminus.point, |a| a.midpoint());
                year(alternate, true, self.exposed_below(sample))
            }
        }
    }

    /// Keep the section at the terminus unless the ice there is thinner
    /// than the basin is deep, in which case move it up-glacier.
    fn choose_section(
        &self,
        basin: &Basin,
        front_elevation: f64,
        thickness: Option<f64>,
        reference: &ReferenceLine,
        half_length: f64,
    ) -> SectionChoice {
        let depth = basin.max_round as f64 - front_elevation;
        match thickness {
            Some(t) if t < depth => {}
            _ => return SectionChoice::Primary,
        }

        match reference.shortened(self.config.alternate_retreat) {
            Ok(alt_reference) => {
                let alternate = CrossSection::perpendicular(&alt_reference, half_length);
                // The shortened reference, not its perpendicular, must reach the basin
                if alt_reference.line().intersects(&basin.polygon) {
                    SectionChoice::Alternate(alternate)
                } else {
                    SectionChoice::Retracted(Some(alternate))
                }
            }
            Err(e) => {
                tracing::debug!("No alternate cross-section for basin {}: {}", basin.sink_nr, e);
                SectionChoice::Retracted(None)
            }
        }
    }

    fn lake_outcome(&self, basin: &Basin, section: &CrossSection, reference: &ReferenceLine) -> Resolution {
        match self.cut_lake(basin, section, reference) {
            Ok(lake) => {
                let exposed = self
                    .basins
                    .iter()
                    .filter(|b| b.sink_nr != basin.sink_nr && b.max_round < basin.max_round)
                    .map(|b| b.sink_nr)
                    .collect();
                Resolution::Lake { lake, exposed }
            }
            Err(e) => Resolution::Skipped(e.into()),
        }
    }

    fn cut_lake(
        &self,
        basin: &Basin,
        section: &CrossSection,
        reference: &ReferenceLine,
    ) -> Result<ResolvedLake, GeometryError> {
        let split = split_basin(&basin.polygon, section)?;
        let fragment = keep_far_fragment(split, reference.reference_point())?;
        Ok(ResolvedLake::from_fragment(basin, fragment))
    }

    fn exposed_below(&self, sample: Point<f64>) -> Resolution {
        match self.bedrock_at(sample) {
            Ok(z) => {
                let altitude_front = z.floor() as i64;
                Resolution::Exposed {
                    altitude_front,
                    exposed: self
                        .basins
                        .rims_below(altitude_front)
                        .map(|b| b.sink_nr)
                        .collect(),
                }
            }
            Err(reason) => Resolution::Skipped(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{polygon, Area};
    use glake_dem::RasterBounds;

    fn straight_1000() -> Centerline {
        let coords: Vec<(f64, f64)> = (0..=100).map(|i| (i as f64 * 10.0, 0.0)).collect();
        Centerline::new(coords.into(), None).unwrap()
    }

    fn rect_basin(sink_nr: u32, min_x: f64, max_x: f64, max_round: i64) -> Basin {
        Basin {
            sink_nr,
            max_round,
            max: max_round as f64 + 0.25,
            polygon: MultiPolygon::new(vec![polygon![
                (x: min_x, y: -50.0),
                (x: max_x, y: -50.0),
                (x: max_x, y: 50.0),
                (x: min_x, y: 50.0),
            ]]),
        }
    }

    /// Bedrock rising 0.1 m per metre along x from 0 at x = 0.
    fn ramp() -> BedrockRaster {
        let data: Vec<f32> = (0..2).flat_map(|_| (0..100).map(|i| i as f32 + 0.5)).collect();
        BedrockRaster::from_grid(
            data,
            100,
            2,
            RasterBounds {
                min_x: 0.0,
                max_x: 1000.0,
                min_y: -100.0,
                max_y: 100.0,
            },
            None,
        )
        .unwrap()
    }

    fn terminus(x: f64) -> TerminusPoint {
        TerminusPoint {
            year: 2040,
            distance: x,
            point: Point::new(x, 0.0),
        }
    }

    #[test]
    fn test_frontal_basin_cut_at_terminus() {
        let line = straight_1000();
        let basins = BasinSet::new(vec![rect_basin(1, 650.0, 760.0, 100), rect_basin(2, 100.0, 200.0, 90)]).unwrap();
        let bedrock = ramp();
        let config = ResolverConfig::default();
        let resolver = BasinResolver::new(&line, &basins, &bedrock, &config);

        // Ice thicker than the basin is deep (100 - 70.5)
        let year = resolver.resolve(&terminus(705.0), Some(40.0));
        assert!(year.alternate.is_none());
        let Resolution::Lake { lake, exposed } = year.outcome else {
            panic!("expected a lake, got {:?}", year.outcome);
        };
        assert_eq!(lake.sink_nr, 1);
        assert_eq!(lake.max, 100.25);
        assert!(lake.volume.is_none());
        assert_relative_eq!(lake.polygon.unsigned_area(), 55.0 * 100.0, max_relative = 1e-9);
        assert_eq!(exposed, vec![2]);
    }

    #[test]
    fn test_thin_ice_uses_alternate_section() {
        let line = straight_1000();
        let basins = BasinSet::new(vec![rect_basin(1, 650.0, 760.0, 100)]).unwrap();
        let bedrock = ramp();
        let config = ResolverConfig {
            alternate_retreat: 20.0,
            ..ResolverConfig::default()
        };
        let resolver = BasinResolver::new(&line, &basins, &bedrock, &config);

        let year = resolver.resolve(&terminus(705.0), Some(5.0));
        let alternate = year.alternate.unwrap();
        assert_relative_eq!(alternate.center().x(), 685.0);
        let Resolution::Lake { lake, .. } = year.outcome else {
            panic!("expected a lake");
        };
        assert_relative_eq!(lake.polygon.unsigned_area(), 75.0 * 100.0, max_relative = 1e-9);
    }

    #[test]
    fn test_alternate_missing_basin_retracts_claim() {
        let line = straight_1000();
        // Terminus 10 m inside the basin, alternate lands 40 m outside it
        let basins = BasinSet::new(vec![rect_basin(1, 695.0, 760.0, 100), rect_basin(2, 100.0, 150.0, 60)])
            .unwrap();
        let bedrock = ramp();
        let config = ResolverConfig::default();
        let resolver = BasinResolver::new(&line, &basins, &bedrock, &config);

        let year = resolver.resolve(&terminus(705.0), Some(1.0));
        assert!(year.retracted);
        // Bedrock at the alternate midpoint (655) floors to 65
        assert_eq!(
            year.outcome,
            Resolution::Exposed {
                altitude_front: 65,
                exposed: vec![2],
            }
        );
    }

    #[test]
    fn test_alternate_needs_reference_line_inside_basin() {
        let line = straight_1000();
        // The terminus sits in the eastern block; the western arm lies north
        // of the flowline, crossed by the alternate section but not by the
        // shortened reference line 650..655
        let l_shaped = Basin {
            sink_nr: 1,
            max_round: 100,
            max: 100.0,
            polygon: MultiPolygon::new(vec![polygon![
                (x: 700.0, y: -50.0),
                (x: 760.0, y: -50.0),
                (x: 760.0, y: 50.0),
                (x: 640.0, y: 50.0),
                (x: 640.0, y: 20.0),
                (x: 700.0, y: 20.0),
            ]]),
        };
        let basins = BasinSet::new(vec![l_shaped, rect_basin(2, 100.0, 150.0, 60)]).unwrap();
        let bedrock = ramp();
        let config = ResolverConfig::default();
        let resolver = BasinResolver::new(&line, &basins, &bedrock, &config);

        let year = resolver.resolve(&terminus(705.0), Some(1.0));
        let alternate = year.alternate.unwrap();
        assert!(alternate.intersects(&basins.get(1).unwrap().polygon));
        assert!(year.retracted);
        assert_eq!(
            year.outcome,
            Resolution::Exposed {
                altitude_front: 65,
                exposed: vec![2],
            }
        );
    }

    #[test]
    fn test_nan_thickness_keeps_primary() {
        let line = straight_1000();
        let basins = BasinSet::new(vec![rect_basin(1, 650.0, 760.0, 100)]).unwrap();
        let bedrock = ramp();
        let config = ResolverConfig::default();
        let resolver = BasinResolver::new(&line, &basins, &bedrock, &config);

        let year = resolver.resolve(&terminus(705.0), Some(f64::NAN));
        assert!(year.alternate.is_none());
        assert!(matches!(year.outcome, Resolution::Lake { .. }));
    }

    #[test]
    fn test_no_frontal_basin_uses_elevation() {
        let line = straight_1000();
        let basins = BasinSet::new(vec![
            rect_basin(1, 100.0, 200.0, 20),
            rect_basin(2, 250.0, 300.0, 60),
            rect_basin(3, 800.0, 900.0, 40),
        ])
        .unwrap();
        let bedrock = ramp();
        let config = ResolverConfig::default();
        let resolver = BasinResolver::new(&line, &basins, &bedrock, &config);

        let year = resolver.resolve(&terminus(505.0), None);
        assert!(year.primary.is_some());
        assert_eq!(
            year.outcome,
            Resolution::Exposed {
                altitude_front: 50,
                exposed: vec![1, 3],
            }
        );
    }

    #[test]
    fn test_bedrock_outside_raster_skips_year() {
        let line = Centerline::new(
            vec![(0.0, 500.0), (0.0, 600.0), (0.0, 700.0), (0.0, 800.0), (0.0, 900.0), (0.0, 1000.0), (0.0, 1100.0)].into(),
            None,
        )
        .unwrap();
        let basins = BasinSet::new(vec![]).unwrap();
        let bedrock = ramp();
        let config = ResolverConfig::default();
        let resolver = BasinResolver::new(&line, &basins, &bedrock, &config);

        let t = TerminusPoint {
            year: 2050,
            distance: 550.0,
            point: Point::new(0.0, 1050.0),
        };
        let year = resolver.resolve(&t, None);
        assert!(matches!(year.outcome, Resolution::Skipped(SkipReason::BedrockUnavailable { .. })));
    }
}
