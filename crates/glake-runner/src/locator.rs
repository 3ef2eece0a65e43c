//! Terminus positions along the flowline for each sampled year.

use geo::Point;
use glake_geometry::Centerline;
use glake_model::RetreatSeries;

/// Terminus of one sampled year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminusPoint {
    pub year: i32,
    /// Distance from the glacier head (m).
    pub distance: f64,
    pub point: Point<f64>,
}

/// What the retreat series says about one sampled year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminusEvent {
    /// The glacier is as long as today or longer; nothing to resolve.
    Stationary { year: i32, distance: f64 },
    /// The length sample for this year is NaN.
    MissingSample { year: i32 },
    /// The glacier is gone; every basin is exposed.
    AllExposed { year: i32 },
    /// A terminus on the flowline.
    Front(TerminusPoint),
}

impl TerminusEvent {
    pub fn year(&self) -> i32 {
        match self {
            TerminusEvent::Stationary { year, .. }
            | TerminusEvent::MissingSample { year }
            | TerminusEvent::AllExposed { year } => *year,
            TerminusEvent::Front(t) => t.year,
        }
    }
}

/// Walk the sampled years and place the terminus for each.
///
/// Each distance is derived from `centerline.length()` directly, so
/// rounding does not accumulate from year to year. The glacier-gone check
/// looks at the sample one step before the year's own length sample.
pub fn locate_termini(centerline: &Centerline, series: &RetreatSeries) -> Vec<TerminusEvent> {
    let current_length = centerline.length();

    (0..series.evaluable_years())
        .filter_map(|j| {
            let year = series.years[j];
            let distance = series.retreat_distance(current_length, j)?;

            if !distance.is_finite() {
                return Some(TerminusEvent::MissingSample { year });
            }
            if distance.round() >= current_length.round() {
                return Some(TerminusEvent::Stationary { year, distance });
            }
            if series.length[j] == 0.0 {
                return Some(TerminusEvent::AllExposed { year });
            }

            Some(TerminusEvent::Front(TerminusPoint {
                year,
                distance,
                point: centerline.point_at_distance(distance),
            }))
        })
        .collect()
}
