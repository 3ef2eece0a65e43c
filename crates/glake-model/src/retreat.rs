//! Decadal retreat series sampled from ice-dynamics model output.

use crate::{DataError, ModelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const YEAR_COLUMN: &str = "calendar_year";
const LENGTH_COLUMN: &str = "length";
const THICKNESS_COLUMN: &str = "terminus_thick_0";

/// How annual model output is thinned to decadal samples.
///
/// Row indices count data rows from 0, header excluded. With the defaults a
/// run starting in 2019 yields years 2030..=2100 and lengths for
/// 2020..=2100, so year `years[j]` pairs with `length[j + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// First row used for the year samples.
    pub year_offset: usize,
    /// First row used for length and thickness samples.
    pub length_offset: usize,
    /// Row stride between samples.
    pub stride: usize,
    /// Maximum number of year samples.
    pub max_years: usize,
    /// Maximum number of length and thickness samples.
    pub max_lengths: usize,
    /// Years after this are dropped.
    pub last_year: i32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            year_offset: 11,
            length_offset: 1,
            stride: 10,
            max_years: 8,
            max_lengths: 9,
            last_year: 2100,
        }
    }
}

/// Sampled years, glacier lengths and terminus ice thickness of one
/// climate scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetreatSeries {
    /// Sampled calendar years.
    pub years: Vec<i32>,
    /// Glacier length samples (m). `length[0]` is the reference state.
    pub length: Vec<f64>,
    /// Terminus ice thickness samples (m), aligned with `length`.
    pub terminus_thickness: Vec<f64>,
    /// Row stride the series was sampled with.
    #[serde(skip)]
    stride: i32,
}

/// Parse a numeric cell; empty and `nan` cells become NaN.
fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim().trim_matches('"');
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

impl RetreatSeries {
    /// Load and sample a model output CSV.
    pub fn from_csv<P: AsRef<Path>>(path: P, sampling: &SamplingConfig) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, sampling, &path.display().to_string())
    }

    /// Sample CSV text. `source` names the input in error messages.
    ///
    /// Fields are split on every comma; quoted fields containing commas are
    /// not supported and show up as a field count mismatch.
    pub fn parse(content: &str, sampling: &SamplingConfig, source: &str) -> Result<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let header: Vec<String> = match lines.next() {
            Some((_, line)) => line
                .split(',')
                .map(|h| h.trim().trim_matches('"').to_string())
                .collect(),
            None => {
                return Err(ModelError::MissingColumn {
                    path: source.to_string(),
                    column: YEAR_COLUMN,
                })
            }
        };
        let column = |name: &'static str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ModelError::MissingColumn {
                    path: source.to_string(),
                    column: name,
                })
        };
        let year_col = column(YEAR_COLUMN)?;
        let length_col = column(LENGTH_COLUMN)?;
        let thick_col = column(THICKNESS_COLUMN)?;

        let mut rows: Vec<(f64, f64, f64)> = Vec::new();
        for (line_idx, line) in lines {
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() != header.len() {
                return Err(ModelError::InvalidRow {
                    path: source.to_string(),
                    line: line_idx + 1,
                    reason: format!("{} fields, header has {}", cells.len(), header.len()),
                });
            }
            let get = |col: usize, name: &str| {
                cells
                    .get(col)
                    .and_then(|c| parse_cell(c))
                    .ok_or_else(|| ModelError::InvalidRow {
                        path: source.to_string(),
                        line: line_idx + 1,
                        reason: format!("unreadable '{}' value", name),
                    })
            };
            rows.push((
                get(year_col, YEAR_COLUMN)?,
                get(length_col, LENGTH_COLUMN)?,
                get(thick_col, THICKNESS_COLUMN)?,
            ));
        }

        Self::from_rows(&rows, sampling)
    }

    /// Sample `(year, length, thickness)` rows.
    pub fn from_rows(rows: &[(f64, f64, f64)], sampling: &SamplingConfig) -> Result<Self> {
        let stride = sampling.stride.max(1);

        let mut years: Vec<i32> = Vec::with_capacity(sampling.max_years);
        for (row, r) in rows
            .iter()
            .enumerate()
            .skip(sampling.year_offset)
            .step_by(stride)
            .take(sampling.max_years)
        {
            if !r.0.is_finite() {
                return Err(DataError::NanYear { row }.into());
            }
            let year = r.0.round() as i32;
            if year > sampling.last_year {
                break;
            }
            years.push(year);
        }

        let sampled = || {
            rows.iter()
                .skip(sampling.length_offset)
                .step_by(stride)
                .take(sampling.max_lengths)
        };
        let length: Vec<f64> = sampled().map(|r| r.1).collect();
        let terminus_thickness: Vec<f64> = sampled().map(|r| r.2).collect();

        match length.first() {
            Some(first) if !first.is_nan() => {}
            _ => return Err(DataError::NanLength.into()),
        }

        Ok(Self {
            years,
            length,
            terminus_thickness,
            stride: stride as i32,
        })
    }

    /// Number of years that can be evaluated: each needs a year sample and
    /// the following length sample.
    pub fn evaluable_years(&self) -> usize {
        self.years.len().min(self.length.len().saturating_sub(1))
    }

    /// Length/thickness index for a sampled year.
    ///
    /// Computed as `(year - base_year) / stride` with the base one stride
    /// before the first sampled year. Returns `None` for years that are not
    /// part of the sampled sequence.
    pub fn sample_index(&self, year: i32) -> Option<usize> {
        let first = *self.years.first()?;
        let base_year = first - self.stride;
        let offset = year - base_year;
        if offset <= 0 || offset % self.stride != 0 {
            return None;
        }
        let index = (offset / self.stride) as usize;
        (self.years.get(index - 1) == Some(&year)).then_some(index)
    }

    /// Length lost between the reference state and sample `j + 1`.
    pub fn ablation(&self, j: usize) -> Option<f64> {
        Some(self.length.first()? - self.length.get(j + 1)?)
    }

    /// Distance of the terminus from the head for sample `j + 1`.
    pub fn retreat_distance(&self, current_length: f64, j: usize) -> Option<f64> {
        self.ablation(j).map(|a| current_length - a)
    }

    /// Terminus thickness for a sampled year.
    pub fn thickness_for_year(&self, year: i32) -> Option<f64> {
        self.sample_index(year)
            .and_then(|i| self.terminus_thickness.get(i).copied())
    }
}
