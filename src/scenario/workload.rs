//! Workload catalogue document: command templates and which VMs may run them.
//!
//! ```yaml
//! vm_workloads:
//!   acronyms:
//!     §folder: /opt/cloudfactory
//!   workloads:
//!     stress:
//!       command: §folder/stress.sh §cpu §target §time §half
//!       acronyms:
//!         §half: §time / 2
//!       constraint:
//!         freq: 0.5
//!         profile: [low, medium]
//!         cpu: {min: 1, max: 4}
//!         mem: {max: 8}
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{GeneratorError, Result};
use crate::scenario::interface::{ScenarioDocument, FREQUENCY_EPSILON};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WorkloadScenario {
    pub vm_workloads: VmWorkloads,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VmWorkloads {
    /// Static macros substituted once at load time.
    #[serde(default)]
    pub acronyms: BTreeMap<String, String>,
    pub workloads: BTreeMap<String, WorkloadSpec>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WorkloadSpec {
    pub command: String,
    /// Custom macros evaluated as arithmetic for every generated command.
    #[serde(default)]
    pub acronyms: BTreeMap<String, String>,
    pub constraint: ConstraintSpec,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConstraintSpec {
    pub freq: f64,
    pub profile: Option<Vec<String>>,
    pub cpu: Option<RangeSpec>,
    pub mem: Option<RangeSpec>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct RangeSpec {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeSpec {
    /// Bounds are inclusive.
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

impl ScenarioDocument for WorkloadScenario {
    fn validate(&self) -> Result<()> {
        let workloads = &self.vm_workloads.workloads;
        if workloads.is_empty() {
            return Err(GeneratorError::EmptyScenario("workload"));
        }
        let sum: f64 = workloads.values().map(|w| w.constraint.freq).sum();
        if sum > 1.0 + FREQUENCY_EPSILON {
            return Err(GeneratorError::FrequencyOverflow {
                document: "workload distribution",
                sum,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_bounds_are_inclusive() {
        let range = RangeSpec {
            min: Some(2.0),
            max: Some(4.0),
        };
        assert!(range.contains(2.0));
        assert!(range.contains(4.0));
        assert!(!range.contains(1.0));
        assert!(!range.contains(8.0));
        assert!(RangeSpec::default().contains(1e9));
    }

    #[test]
    fn test_parse_catalogue() {
        let scenario = WorkloadScenario::from_yaml_str(
            r#"
vm_workloads:
  acronyms:
    §folder: /opt/tools
  workloads:
    idle:
      command: sleep §time
      constraint:
        freq: 0.5
        cpu: {max: 2}
"#,
        )
        .unwrap();
        let idle = &scenario.vm_workloads.workloads["idle"];
        assert_eq!(idle.command, "sleep §time");
        assert!(idle.acronyms.is_empty());
        assert_eq!(idle.constraint.cpu.unwrap().max, Some(2.0));
        assert!(idle.constraint.profile.is_none());
        assert_eq!(scenario.vm_workloads.acronyms["§folder"], "/opt/tools");
    }
}
