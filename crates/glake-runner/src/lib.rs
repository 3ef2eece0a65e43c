//! # glake-runner
//!
//! Projects future glacial lakes from glacier retreat. For every glacier,
//! climate model and scenario the runner:
//!
//! 1. samples the retreat series ([`glake_model::RetreatSeries`])
//! 2. places the terminus on the flowline for each sampled year
//!    ([`locate_termini`])
//! 3. resolves which basin the front opens and cuts the lake from it
//!    ([`BasinResolver`])
//! 4. integrates the lake volume over the basin's bedrock TIN
//!    ([`estimate_volume`])
//!
//! Runs that cannot be completed are reported as [`RunOutcome::Aborted`]
//! and their output is moved to an error bucket.

mod error;
pub mod locator;
pub mod outcome;
pub mod output;
pub mod pipeline;
pub mod resolver;
pub mod volume;

pub use error::RunnerError;
pub use locator::{locate_termini, TerminusEvent, TerminusPoint};
pub use outcome::{AbortReason, RunOutcome, ScenarioReport, YearRecord, YearStatus};
pub use output::{GlacierOutput, ScenarioOutput};
pub use pipeline::{BatchSummary, GlacierInputs, Pipeline};
pub use resolver::{BasinResolver, ResolvedLake, Resolution, SkipReason, YearResolution};
pub use volume::{estimate_volume, try_compute_volume, try_compute_volume_alternate, VolumeFailure};

/// Lake volume and submerged surface area.
pub use glake_dem::PolygonVolume as LakeVolume;

/// Result type for the runner.
pub type Result<T> = std::result::Result<T, RunnerError>;
