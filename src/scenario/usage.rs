//! Usage profile document: categories of CPU usage and how VMs of each category come and go.
//!
//! ```yaml
//! vm_usage:
//!   low:
//!     avg: {min: 1, max: 10}
//!     per: {min: 5, max: 30}
//!     rate: {arrival: 0.1, departure: 0.2, periodicity: 0.5}
//!     freq: 0.6
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};
use crate::scenario::interface::{ScenarioDocument, FREQUENCY_EPSILON};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UsageScenario {
    pub vm_usage: BTreeMap<String, UsageProfileSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

/// Rates are shares of the profile population, missing ones default to 0.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct Rates {
    #[serde(default)]
    pub arrival: f64,
    #[serde(default)]
    pub departure: f64,
    #[serde(default)]
    pub periodicity: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UsageProfileSpec {
    pub avg: Bounds,
    pub per: Bounds,
    #[serde(default)]
    pub rate: Rates,
    pub freq: f64,
}

impl ScenarioDocument for UsageScenario {
    fn validate(&self) -> Result<()> {
        if self.vm_usage.is_empty() {
            return Err(GeneratorError::EmptyScenario("usage profile"));
        }
        let sum: f64 = self.vm_usage.values().map(|profile| profile.freq).sum();
        if sum > 1.0 + FREQUENCY_EPSILON {
            return Err(GeneratorError::FrequencyOverflow {
                document: "usage distribution",
                sum,
            });
        }
        for (name, profile) in self.vm_usage.iter() {
            if profile.avg.min > profile.avg.max || profile.per.min > profile.per.max {
                return Err(GeneratorError::InvalidBounds(format!(
                    "profile {:?} has min above max",
                    name
                )));
            }
            if profile.per.max < profile.avg.min {
                return Err(GeneratorError::InvalidBounds(format!(
                    "profile {:?} percentile cannot exceed its average",
                    name
                )));
            }
            let rates = [
                profile.rate.arrival,
                profile.rate.departure,
                profile.rate.periodicity,
            ];
            if rates.iter().any(|rate| !(0.0..=1.0).contains(rate)) {
                return Err(GeneratorError::InvalidBounds(format!(
                    "profile {:?} rates must be within [0, 1]",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_rates_default_to_zero() {
        let scenario = UsageScenario::from_yaml_str(
            r#"
vm_usage:
  idle:
    avg: {min: 1, max: 2}
    per: {min: 2, max: 5}
    freq: 1.0
"#,
        )
        .unwrap();
        assert_eq!(scenario.vm_usage["idle"].rate, Rates::default());
    }

    #[test]
    fn test_frequency_overflow_is_rejected() {
        let result = UsageScenario::from_yaml_str(
            r#"
vm_usage:
  low:
    avg: {min: 1, max: 2}
    per: {min: 2, max: 5}
    freq: 0.7
  high:
    avg: {min: 50, max: 60}
    per: {min: 70, max: 90}
    freq: 0.4
"#,
        );
        assert!(matches!(
            result,
            Err(GeneratorError::FrequencyOverflow { .. })
        ));
    }
}
