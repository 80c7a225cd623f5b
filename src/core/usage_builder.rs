//! Attributes usage profiles to VMs, then their lifecycle, timesheet and per-slice usage.

use std::collections::BTreeMap;

use log::debug;

use crate::core::distribution_generator::heavy_tail_spread;
use crate::core::usage_profile::UsageProfile;
use crate::core::vm::Vm;
use crate::core::vm_usage_builder::VmUsageBuilder;
use crate::error::Result;
use crate::random::Random;
use crate::scenario::usage::UsageScenario;

pub struct UsageBuilder {
    profiles: BTreeMap<String, UsageProfile>,
    vm_usage_builder: VmUsageBuilder,
    slices_per_scope: usize,
}

impl UsageBuilder {
    pub fn new(scenario: UsageScenario, slices_per_scope: usize, number_of_scopes: usize) -> Self {
        let profiles = scenario
            .vm_usage
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    UsageProfile::new(name.clone(), spec, slices_per_scope, number_of_scopes),
                )
            })
            .collect();
        Self {
            profiles,
            vm_usage_builder: VmUsageBuilder::new(slices_per_scope),
            slices_per_scope,
        }
    }

    pub fn profiles(&self) -> &BTreeMap<String, UsageProfile> {
        &self.profiles
    }

    /// Labels every VM of `vms` with a profile, then sets lifecycle, periodicity, timesheet and
    /// usage. `postponed_scope_start` is the scope in which these VMs are created.
    pub fn attribute_usage_to_vm_list(
        &mut self,
        vms: &mut [Vm],
        postponed_scope_start: usize,
        random: &mut Random,
    ) -> Result<()> {
        self.attribute_profile_to_vm_list(vms, random);
        let mut starts = self.postponed_starts_per_profile(vms, postponed_scope_start, random);
        for (name, profile) in self.profiles.iter_mut() {
            let profile_starts = starts.remove(name).unwrap_or_default();
            profile.generate_and_apply_usage(vms, &profile_starts, random);
        }
        for vm in vms.iter_mut() {
            self.vm_usage_builder
                .build_and_set_usage(vm, &self.profiles, random)?;
        }
        Ok(())
    }

    /// Number of VMs to create on each later scope, summed over profiles.
    pub fn overall_count_to_create(&self) -> Result<usize> {
        let mut count = 0;
        for profile in self.profiles.values() {
            count += profile.count_to_create()?;
        }
        Ok(count)
    }

    fn attribute_profile_to_vm_list(&self, vms: &mut [Vm], random: &mut Random) {
        let labels = self.profile_list(vms.len(), random);
        for (vm, label) in vms.iter_mut().zip(labels.into_iter()) {
            vm.set_profile(label);
        }
    }

    /// Shuffled list of exactly `size` profile labels following the profile frequencies.
    pub fn profile_list(&self, size: usize, random: &mut Random) -> Vec<String> {
        let mut labels = vec![];
        for (name, count) in self.profile_counts(size) {
            labels.extend(std::iter::repeat(name).take(count));
        }
        random.shuffle(&mut labels);
        labels
    }

    /// Ceiling counts per profile. Overshoot is taken back from the profiles rounded up the most,
    /// a shortfall (frequencies summing under 1) is handed out round-robin.
    fn profile_counts(&self, size: usize) -> Vec<(String, usize)> {
        if self.profiles.is_empty() {
            return vec![];
        }
        let exact: Vec<f64> = self
            .profiles
            .values()
            .map(|profile| profile.freq() * size as f64)
            .collect();
        let mut counts: Vec<usize> = exact.iter().map(|value| value.ceil() as usize).collect();
        let mut total: usize = counts.iter().sum();

        while total > size {
            let victim = (0..counts.len())
                .filter(|idx| counts[*idx] > 0)
                .max_by(|a, b| {
                    let overshoot_a = counts[*a] as f64 - exact[*a];
                    let overshoot_b = counts[*b] as f64 - exact[*b];
                    overshoot_a.total_cmp(&overshoot_b)
                });
            match victim {
                Some(idx) => {
                    counts[idx] -= 1;
                    total -= 1;
                }
                None => break,
            }
        }

        let mut idx = 0;
        while total < size {
            counts[idx % self.profiles.len()] += 1;
            total += 1;
            idx += 1;
        }

        self.profiles.keys().cloned().zip(counts.into_iter()).collect()
    }

    /// Start slice of every VM, grouped per profile in fleet order. VMs of the first scope start
    /// at 0, later ones follow a heavy tail spread over the slices of their scope.
    fn postponed_starts_per_profile(
        &mut self,
        vms: &[Vm],
        postponed_scope_start: usize,
        random: &mut Random,
    ) -> BTreeMap<String, Vec<usize>> {
        let mut starts = BTreeMap::new();
        if postponed_scope_start == 0 {
            for (name, profile) in self.profiles.iter_mut() {
                starts.insert(name.clone(), vec![0; profile.count(vms)]);
            }
            return starts;
        }

        let spread = heavy_tail_spread(random, vms.len(), self.slices_per_scope);
        debug!("Deployments per slice of scope {}: {:?}", postponed_scope_start, spread);

        let mut profile_list = vec![];
        for (name, profile) in self.profiles.iter_mut() {
            starts.insert(name.clone(), vec![]);
            profile_list.extend(std::iter::repeat(name.clone()).take(profile.count(vms)));
        }
        random.shuffle(&mut profile_list);

        let peak = spread
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let mut remaining = spread;
        for name in profile_list {
            let mut valid: Vec<usize> = (0..remaining.len())
                .filter(|idx| remaining[*idx] > 0)
                .collect();
            // rounding may leave fewer slots than VMs: extra VMs go to the peak
            if valid.is_empty() {
                valid.push(peak);
            }
            let chosen = valid[random.choose_index(valid.len())];
            if let Some(slot) = remaining.get_mut(chosen) {
                *slot = slot.saturating_sub(1);
            }
            if let Some(profile_starts) = starts.get_mut(&name) {
                profile_starts.push(chosen + postponed_scope_start * self.slices_per_scope);
            }
        }
        starts
    }
}
