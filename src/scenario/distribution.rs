//! Flavor distribution document: how often each CPU core count and memory size appears.
//!
//! ```yaml
//! vm_distribution:
//!   config_cpu:
//!     1: 0.5
//!     2: 0.3
//!     4: 0.2
//!   config_mem:
//!     1.75: 0.6
//!     3.5: 0.4
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;

use log::warn;
use ordered_float::OrderedFloat;
use serde::Deserialize;

use crate::error::{GeneratorError, Result};
use crate::scenario::interface::ScenarioDocument;

pub type MemFlavor = OrderedFloat<f64>;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DistributionScenario {
    pub vm_distribution: VmDistribution,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VmDistribution {
    pub config_cpu: BTreeMap<u32, f64>,
    pub config_mem: BTreeMap<MemFlavor, f64>,
}

impl ScenarioDocument for DistributionScenario {
    fn validate(&self) -> Result<()> {
        let distribution = &self.vm_distribution;
        if !distribution.config_cpu.values().any(|freq| *freq > 0.0) {
            return Err(GeneratorError::EmptyScenario("cpu flavor"));
        }
        if !distribution.config_mem.values().any(|freq| *freq > 0.0) {
            return Err(GeneratorError::EmptyScenario("memory flavor"));
        }
        if distribution.config_cpu.contains_key(&0) {
            return Err(GeneratorError::InvalidBounds(
                "cpu flavor must be positive".to_string(),
            ));
        }
        if distribution.config_mem.keys().any(|mem| mem.0 <= 0.0) {
            return Err(GeneratorError::InvalidBounds(
                "memory flavor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn round_to_hundredth(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Brings a frequency table summing over 1 back to 1 by lowering the largest flavors first:
/// each one is zeroed until the excess is absorbed, the last one touched only partially.
/// Returns true if the table was changed.
pub fn reduce_frequencies_to_one<K: Ord + Copy + Display>(
    frequencies: &mut BTreeMap<K, f64>,
    table_name: &str,
) -> bool {
    let mut delta = round_to_hundredth(frequencies.values().sum::<f64>() - 1.0);
    if delta <= 0.0 {
        return false;
    }
    warn!("{} distribution frequency exceeded 1, reducing it", table_name);

    let original = frequencies.clone();
    for (flavor, freq) in frequencies.iter_mut().rev() {
        if delta <= 0.0 {
            break;
        }
        if delta > *freq {
            delta -= *freq;
            *freq = 0.0;
        } else {
            *freq -= delta;
            delta = 0.0;
        }
        warn!("{} flavor {}: {} -> {}", table_name, flavor, original[flavor], freq);
    }
    true
}
