//! Per-slice CPU usage targets of a VM, drawn from the bounds of its usage profile.

use std::collections::BTreeMap;

use crate::core::distribution_generator::truncated_gaussian;
use crate::core::usage_profile::UsageProfile;
use crate::core::vm::Vm;
use crate::error::{GeneratorError, Result};
use crate::random::Random;

pub const MIN_USAGE: u32 = 1;
pub const MAX_USAGE: u32 = 100;

pub struct VmUsageBuilder {
    slices_per_scope: usize,
}

impl VmUsageBuilder {
    pub fn new(slices_per_scope: usize) -> Self {
        Self { slices_per_scope }
    }

    /// Draws the average/percentile pair of `vm` and one usage value per occupied slice.
    pub fn build_and_set_usage(
        &self,
        vm: &mut Vm,
        profiles: &BTreeMap<String, UsageProfile>,
        random: &mut Random,
    ) -> Result<()> {
        let label = vm
            .profile()
            .ok_or_else(|| GeneratorError::MissingParameter(format!("profile of {}", vm.name())))?;
        let profile = profiles
            .get(label)
            .ok_or_else(|| GeneratorError::UnknownProfile(label.to_string()))?;

        let (avg, per) = draw_avg_and_per(profile, random);
        vm.set_avg_and_per(avg, per);
        let table = truncated_gaussian(random, avg as f64, per as f64);

        let usage = if vm.is_periodic() {
            let per_slot: Vec<u32> = (0..self.slices_per_scope)
                .map(|_| pick(&table, random))
                .collect();
            vm.timesheet()
                .values()
                .flat_map(|slices| {
                    slices
                        .iter()
                        .enumerate()
                        .filter(|(_, present)| **present)
                        .map(|(slot, _)| per_slot[slot])
                        .collect::<Vec<u32>>()
                })
                .collect()
        } else {
            (0..vm.occupied_slices())
                .map(|_| pick(&table, random))
                .collect()
        };
        vm.set_usage(usage);
        Ok(())
    }
}

/// Average drawn uniformly within the profile bounds, percentile within its own bounds but never
/// under the average.
fn draw_avg_and_per(profile: &UsageProfile, random: &mut Random) -> (u32, u32) {
    let (avg_min, avg_max) = profile.average_bounds();
    let (per_min, per_max) = profile.percentile_bounds();

    let avg_low = avg_min.ceil().max(0.0) as u32;
    let avg_high = u32::max(avg_max.floor().max(0.0) as u32, avg_low);
    let avg = random.gen_range(avg_low..=avg_high);

    let per_low = u32::max(avg, per_min.ceil().max(0.0) as u32);
    let per_high = u32::max(per_max.floor().max(0.0) as u32, per_low);
    let per = random.gen_range(per_low..=per_high);
    (avg, per)
}

fn pick(table: &[f64], random: &mut Random) -> u32 {
    let value = table[random.choose_index(table.len())].round();
    (value as u32).clamp(MIN_USAGE, MAX_USAGE)
}
