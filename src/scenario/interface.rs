//! Interface for the YAML scenario documents which drive generation.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Frequencies are compared with this slack so that sums like 0.1 + 0.2 + 0.7 are accepted.
pub const FREQUENCY_EPSILON: f64 = 1e-9;

// Any scenario document is parsed from YAML and then checked for consistency, so that a builder
// never receives a document it cannot work with.
pub trait ScenarioDocument: DeserializeOwned {
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn from_yaml_str(yaml: &str) -> Result<Self> {
        let document: Self = serde_yaml::from_str(yaml)?;
        document.validate()?;
        Ok(document)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }
}
