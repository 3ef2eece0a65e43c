//! Batch driver: glaciers, then climate models, then scenarios, then years.

use crate::locator::{locate_termini, TerminusEvent};
use crate::outcome::{AbortReason, RunOutcome, ScenarioReport, ScenarioSummary, YearStatus};
use crate::output::{GlacierOutput, ScenarioOutput};
use crate::resolver::{BasinResolver, Resolution, YearResolution};
use crate::volume::estimate_volume;
use crate::{Result, RunnerError};
use glake_dem::{BedrockRaster, TinStore};
use glake_geometry::Centerline;
use glake_model::{load_centerline, load_outline, BasinSet, RetreatSeries, RunConfig};
use std::path::{Path, PathBuf};

/// Static inputs of one glacier, shared by all of its runs.
pub struct GlacierInputs {
    pub id: String,
    pub centerline: Centerline,
    pub basins: BasinSet,
    pub bedrock: BedrockRaster,
    pub tins: TinStore,
}

impl GlacierInputs {
    /// Load a glacier directory.
    pub fn load(config: &RunConfig, glacier_dir: &Path, id: &str) -> Result<Self> {
        let layout = &config.layout;
        let required = |name: &str| {
            let path = glacier_dir.join(name);
            if path.exists() {
                Ok(path)
            } else {
                Err(RunnerError::MissingInput(path))
            }
        };

        let centerline = load_centerline(required(&layout.centerline)?)?;
        let mut basins = BasinSet::from_geojson(required(&layout.sinks)?)?;
        let outline_path = glacier_dir.join(&layout.outline);
        if outline_path.exists() {
            basins = basins.clip_to(&load_outline(&outline_path)?);
        }
        let bedrock = BedrockRaster::from_file(required(&layout.bedrock)?)?;
        let mut tins = TinStore::new();
        let indexed = tins.add_directory(glacier_dir.join(&layout.tins))?;

        tracing::info!(
            "{}: centerline {:.0} m, {} basins, {} TINs",
            id,
            centerline.length(),
            basins.len(),
            indexed
        );

        Ok(Self {
            id: id.to_string(),
            centerline,
            basins,
            bedrock,
            tins,
        })
    }
}

/// Totals over a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub glaciers: usize,
    pub glaciers_failed: usize,
    pub scenarios_completed: usize,
    pub lakes: usize,
    /// Climate-model runs moved to an error bucket.
    pub runs_relocated: usize,
}

/// Sorted sub-directory names of `dir`, optionally filtered by prefix.
fn sorted_dirs(dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(prefix) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Runs a [`RunConfig`] over the data root.
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Glacier directories under the data root, in name order.
    pub fn discover_glaciers(&self) -> Result<Vec<String>> {
        let root = &self.config.data_root;
        if !root.is_dir() {
            return Err(RunnerError::NoDataRoot(root.clone()));
        }
        sorted_dirs(root, &self.config.glacier_prefix)
    }

    /// Retreat files of one climate model with a configured scenario, in
    /// scenario order.
    fn scenario_files(&self, gcm_dir: &Path, gcm: &str) -> Result<Vec<(String, PathBuf)>> {
        let prefix = format!("{}_", gcm);
        let mut files = Vec::new();
        for entry in std::fs::read_dir(gcm_dir)? {
            let path = entry?.path();
            let Some(scenario) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|n| n.strip_suffix(".csv"))
            else {
                continue;
            };
            if self.config.wants_scenario(scenario) {
                files.push((scenario.to_string(), path.clone()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Process every glacier, or only `only` when it is not empty.
    ///
    /// A glacier whose inputs cannot be loaded is logged and skipped.
    pub fn run(&self, only: &[String]) -> Result<BatchSummary> {
        let mut glaciers = self.discover_glaciers()?;
        if !only.is_empty() {
            glaciers.retain(|g| only.contains(g));
        }

        let mut summary = BatchSummary::default();
        for glacier in &glaciers {
            summary.glaciers += 1;
            if let Err(e) = self.run_glacier(glacier, &mut summary) {
                tracing::error!("{}: skipped: {}", glacier, e);
                summary.glaciers_failed += 1;
            }
        }

        tracing::info!(
            "Processed {} glaciers ({} failed), {} scenarios, {} lakes, {} runs relocated",
            summary.glaciers,
            summary.glaciers_failed,
            summary.scenarios_completed,
            summary.lakes,
            summary.runs_relocated
        );
        Ok(summary)
    }

    /// Process all climate models of one glacier.
    pub fn run_glacier(&self, glacier_id: &str, summary: &mut BatchSummary) -> Result<()> {
        let glacier_dir = self.config.data_root.join(glacier_id);
        let inputs = GlacierInputs::load(&self.config, &glacier_dir, glacier_id)?;
        let output = GlacierOutput::new(
            self.config.output_root(),
            glacier_id,
            inputs.basins.crs().cloned(),
        );

        let runs_dir = glacier_dir.join(&self.config.layout.gcm_runs);
        if !runs_dir.is_dir() {
            tracing::warn!("{}: no {} directory", glacier_id, runs_dir.display());
            return Ok(());
        }

        for gcm in sorted_dirs(&runs_dir, "")? {
            for (scenario, csv) in self.scenario_files(&runs_dir.join(&gcm), &gcm)? {
                tracing::info!("{}: {} {}", glacier_id, gcm, scenario);
                let out = output.scenario(&gcm, &scenario)?;

                match self.run_scenario(&inputs, &out, &gcm, &scenario, &csv)? {
                    RunOutcome::Completed(report) => {
                        summary.scenarios_completed += 1;
                        summary.lakes += report.lake_count();
                    }
                    RunOutcome::Aborted(reason) => {
                        tracing::warn!("{}: {} {}: {}", glacier_id, gcm, scenario, reason);
                        output.relocate(&gcm, reason.bucket())?;
                        summary.runs_relocated += 1;
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Process one retreat file and write its summary.
    ///
    /// A retreat file that cannot be read or sampled aborts the run with
    /// [`AbortReason::Data`].
    pub fn run_scenario(
        &self,
        inputs: &GlacierInputs,
        out: &ScenarioOutput,
        gcm: &str,
        scenario: &str,
        csv: &Path,
    ) -> Result<RunOutcome> {
        let mut report = ScenarioReport::default();
        let aborted = match RetreatSeries::from_csv(csv, &self.config.sampling) {
            Ok(series) => self.run_years(inputs, out, &series, &mut report)?,
            Err(e) => Some(AbortReason::Data {
                message: e.to_string(),
            }),
        };

        out.write_summary(&ScenarioSummary {
            glacier: &inputs.id,
            gcm,
            scenario,
            finished_at: chrono::Utc::now(),
            aborted: aborted.as_ref(),
            years: &report.years,
        })?;

        Ok(match aborted {
            Some(reason) => RunOutcome::Aborted(reason),
            None => RunOutcome::Completed(report),
        })
    }

    /// Resolve every sampled year. Returns the abort reason when a volume
    /// cannot be computed.
    fn run_years(
        &self,
        inputs: &GlacierInputs,
        out: &ScenarioOutput,
        series: &RetreatSeries,
        report: &mut ScenarioReport,
    ) -> Result<Option<AbortReason>> {
        let resolver = BasinResolver::new(
            &inputs.centerline,
            &inputs.basins,
            &inputs.bedrock,
            &self.config.resolver,
        );

        for event in locate_termini(&inputs.centerline, series) {
            let year = event.year();
            let terminus = match event {
                TerminusEvent::Stationary { distance, .. } => {
                    tracing::info!("{}: glacier stationary or growing, skipped", year);
                    report.push(year, YearStatus::Stationary { distance });
                    continue;
                }
                TerminusEvent::MissingSample { .. } => {
                    tracing::warn!("{}: length sample is NaN, skipped", year);
                    report.push(year, YearStatus::MissingSample);
                    continue;
                }
                TerminusEvent::AllExposed { .. } => {
                    tracing::info!("{}: glacier gone, all basins exposed", year);
                    out.write_all_basins(year, &inputs.basins)?;
                    report.push(year, YearStatus::AllExposed);
                    continue;
                }
                TerminusEvent::Front(t) => t,
            };

            out.write_front_point(&terminus)?;
            let resolution = resolver.resolve(&terminus, series.thickness_for_year(year));
            self.write_sections(out, year, &resolution)?;

            match resolution.outcome {
                Resolution::Lake { lake, exposed } => {
                    let volume = match estimate_volume(&inputs.tins, lake.sink_nr, &lake.polygon, lake.max) {
                        Ok(v) => v,
                        Err(failure) => {
                            tracing::error!("{}: volume of basin {} failed: {}", year, lake.sink_nr, failure);
                            return Ok(Some(AbortReason::VolumeComputation {
                                year,
                                sink_nr: lake.sink_nr,
                                message: failure.to_string(),
                            }));
                        }
                    };
                    let lake = lake.with_volume(volume);
                    out.write_lake(year, &lake)?;
                    self.write_exposed(out, year, inputs, &exposed)?;

                    tracing::info!(
                        "{}: lake in basin {}, {:.0} m³ over {:.0} m²",
                        year,
                        lake.sink_nr,
                        volume.volume,
                        volume.surface_area
                    );
                    report.push(
                        year,
                        YearStatus::Lake {
                            sink_nr: lake.sink_nr,
                            volume: volume.volume,
                            surface_area: volume.surface_area,
                            exposed,
                        },
                    );
                }
                Resolution::Exposed {
                    altitude_front,
                    exposed,
                } => {
                    tracing::debug!(
                        "{}: front at {} m, {} basin(s) exposed",
                        year,
                        altitude_front,
                        exposed.len()
                    );
                    self.write_exposed(out, year, inputs, &exposed)?;
                    report.push(
                        year,
                        YearStatus::Exposed {
                            altitude_front,
                            exposed,
                        },
                    );
                }
                Resolution::Skipped(reason) => {
                    tracing::warn!("{}: skipped: {}", year, reason);
                    report.push(
                        year,
                        YearStatus::Skipped {
                            reason: reason.to_string(),
                        },
                    );
                }
            }
        }

        Ok(None)
    }

    fn write_sections(&self, out: &ScenarioOutput, year: i32, resolution: &YearResolution) -> Result<()> {
        if let Some(primary) = &resolution.primary {
            out.write_cross_section(year, primary, false)?;
        }
        if let Some(alternate) = &resolution.alternate {
            out.write_cross_section(year, alternate, true)?;
        }
        Ok(())
    }

    fn write_exposed(&self, out: &ScenarioOutput, year: i32, inputs: &GlacierInputs, exposed: &[u32]) -> Result<()> {
        for basin in exposed.iter().filter_map(|&nr| inputs.basins.get(nr)) {
            out.write_exposed_basin(year, basin)?;
        }
        Ok(())
    }
}
