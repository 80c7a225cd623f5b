//! Config fields definitions for cloudfactory fleet generation

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{GeneratorError, Result};
use crate::metrics::printer::FleetSummaryConfig;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    pub sim_name: String,
    pub seed: u64,
    #[serde(default)]
    pub temporality: Temporality,
    pub scenario: ScenarioPaths,
    /// Initial fleet objective, may be given on the command line instead
    pub objective: Option<Objective>,
    /// Fleet is written there as a json record list once generated
    pub export_path: Option<PathBuf>,
    /// If set, the fleet is reloaded from this record list instead of generated
    pub load_path: Option<PathBuf>,
    /// If not set default output of logs is stdout/stderr
    pub logs_filepath: Option<String>,
    pub fleet_summary: Option<FleetSummaryConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioPaths {
    pub distribution: PathBuf,
    pub usage: PathBuf,
    pub workload: PathBuf,
}

/// Time discretization of the experiment. Durations are in seconds.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Temporality {
    pub slice_duration: u64,
    pub scope_duration: u64,
    pub number_of_scopes: usize,
}

impl Default for Temporality {
    fn default() -> Self {
        // one virtual hour per slice, one virtual day per scope
        Self {
            slice_duration: 3600,
            scope_duration: 86400,
            number_of_scopes: 12,
        }
    }
}

impl Temporality {
    pub fn validate(&self) -> Result<()> {
        if self.slice_duration == 0 || self.number_of_scopes == 0 {
            return Err(GeneratorError::InvalidTemporality(
                "slice duration and number of scopes must be positive".to_string(),
            ));
        }
        if self.slice_duration > self.scope_duration {
            return Err(GeneratorError::InvalidTemporality(format!(
                "slice of {}s is longer than the {}s scope",
                self.slice_duration, self.scope_duration
            )));
        }
        if self.scope_duration % self.slice_duration != 0 {
            return Err(GeneratorError::InvalidTemporality(format!(
                "scope of {}s is not a multiple of the {}s slice",
                self.scope_duration, self.slice_duration
            )));
        }
        Ok(())
    }

    pub fn slices_per_scope(&self) -> usize {
        (self.scope_duration / self.slice_duration) as usize
    }

    /// Total number of slices of the experiment.
    pub fn horizon(&self) -> usize {
        self.slices_per_scope() * self.number_of_scopes
    }
}

/// What the initial fleet is sized on.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub enum Objective {
    /// Cores and memory (GB) to fill.
    Budget { cpu: u64, mem: f64 },
    VmCount { count: usize },
}

impl GeneratorConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.temporality.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }
}
