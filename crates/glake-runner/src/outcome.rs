//! Per-year records and the outcome of one scenario run.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened in one sampled year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum YearStatus {
    Stationary { distance: f64 },
    MissingSample,
    AllExposed,
    Lake {
        sink_nr: u32,
        volume: f64,
        surface_area: f64,
        exposed: Vec<u32>,
    },
    Exposed { altitude_front: i64, exposed: Vec<u32> },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRecord {
    pub year: i32,
    #[serde(flatten)]
    pub status: YearStatus,
}

/// Year records of a finished scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub years: Vec<YearRecord>,
}

impl ScenarioReport {
    pub fn push(&mut self, year: i32, status: YearStatus) {
        self.years.push(YearRecord { year, status });
    }

    /// Number of years that produced a lake.
    pub fn lake_count(&self) -> usize {
        self.years
            .iter()
            .filter(|r| matches!(r.status, YearStatus::Lake { .. }))
            .count()
    }
}

/// Why a climate-model run was abandoned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// The upstream series is unusable.
    Data { message: String },
    /// Both volume attempts failed.
    VolumeComputation {
        year: i32,
        sink_nr: u32,
        message: String,
    },
}

impl AbortReason {
    /// Error bucket the run's output is moved to.
    pub fn bucket(&self) -> &'static str {
        match self {
            AbortReason::Data { .. } => "GCM_error",
            AbortReason::VolumeComputation { .. } => "GCM_TIN_error",
        }
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::Data { message } => write!(f, "data error: {}", message),
            AbortReason::VolumeComputation {
                year,
                sink_nr,
                message,
            } => write!(f, "volume of basin {} in {} failed: {}", sink_nr, year, message),
        }
    }
}

/// Outcome of one scenario, matched on by the batch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(ScenarioReport),
    Aborted(AbortReason),
}

/// Contents of `summary.json`.
#[derive(Debug, Serialize)]
pub struct ScenarioSummary<'a> {
    pub glacier: &'a str,
    pub gcm: &'a str,
    pub scenario: &'a str,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<&'a AbortReason>,
    pub years: &'a [YearRecord],
}
