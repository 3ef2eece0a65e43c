//! Batch run configuration.
//!
//! A run is described by a small YAML file. Every field has a default, so
//! an empty document is a valid configuration:
//!
//! ```yaml
//! data_root: /data/hma
//! output_root: /scratch/hma-lakes
//! glacier_prefix: RGI60-
//! scenarios: [ssp126, ssp245, ssp370, ssp585]
//! sampling:
//!   stride: 10
//! resolver:
//!   vertex_offset: 5
//!   alternate_retreat: 50.0
//! ```

use crate::{Result, SamplingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters of the cross-section construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Centerline vertices between the terminus and the reference vertex.
    pub vertex_offset: usize,
    /// How far up-glacier the alternate cross-section is placed (m).
    pub alternate_retreat: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            vertex_offset: 5,
            alternate_retreat: 50.0,
        }
    }
}

/// File names inside a glacier directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub centerline: String,
    pub sinks: String,
    /// Optional glacier outline the basins are clipped to.
    pub outline: String,
    pub bedrock: String,
    pub tins: String,
    pub gcm_runs: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            centerline: "centerline.geojson".to_string(),
            sinks: "sinks.geojson".to_string(),
            outline: "glacier.geojson".to_string(),
            bedrock: "bedrock.tif".to_string(),
            tins: "tins".to_string(),
            gcm_runs: "GCM_runs".to_string(),
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Directory holding one sub-directory per glacier.
    pub data_root: PathBuf,
    /// Where results go. Defaults to `data_root`.
    pub output_root: Option<PathBuf>,
    /// Glacier directories must start with this.
    pub glacier_prefix: String,
    /// Scenario suffixes of the retreat files to process.
    pub scenarios: Vec<String>,
    pub sampling: SamplingConfig,
    pub resolver: ResolverConfig,
    pub layout: LayoutConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            output_root: None,
            glacier_prefix: "RGI60-".to_string(),
            scenarios: ["ssp126", "ssp245", "ssp370", "ssp585"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sampling: SamplingConfig::default(),
            resolver: ResolverConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Effective output root.
    pub fn output_root(&self) -> &Path {
        self.output_root.as_deref().unwrap_or(&self.data_root)
    }

    /// Whether a retreat file's scenario suffix is configured.
    pub fn wants_scenario(&self, scenario: &str) -> bool {
        self.scenarios.iter().any(|s| s == scenario)
    }
}
