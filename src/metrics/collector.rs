//! Aggregated figures of a generated fleet: counters per category and usage statistics.

use std::collections::BTreeMap;

use average::{concatenate, Estimate, Max, Mean, Min, Variance};

use crate::core::vm::Vm;

concatenate!(
    Estimator,
    [Min, min],
    [Max, max],
    [Mean, mean],
    [Variance, population_variance]
);

#[derive(Debug, Default)]
pub struct EstimatorWrapper {
    estimator: Estimator,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("mean", &self.mean)
            .field("population_variance", &self.population_variance)
            .finish()
    }
}

impl EstimatorWrapper {
    pub fn add(&mut self, value: f64) {
        self.estimator.add(value);
    }

    pub fn min(&self) -> f64 {
        self.estimator.min()
    }

    pub fn max(&self) -> f64 {
        self.estimator.max()
    }

    pub fn mean(&self) -> f64 {
        self.estimator.mean()
    }

    pub fn population_variance(&self) -> f64 {
        self.estimator.population_variance()
    }
}

impl PartialEq for EstimatorWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.min() == other.min()
            && self.max() == other.max()
            && self.mean() == other.mean()
            && self.population_variance() == other.population_variance()
    }
}

#[derive(Debug, Default)]
pub struct FleetSummary {
    pub vm_count: u64,
    pub total_vcpu: u64,
    pub total_mem: f64,
    /// VMs repeating their usage every scope.
    pub periodic_vms: u64,
    /// VMs living less than a scope.
    pub short_lived_vms: u64,
    /// VMs appearing after the first scope.
    pub postponed_vms: u64,
    /// VMs no workload constraint admitted.
    pub unassigned_vms: u64,
    pub vms_per_profile: BTreeMap<String, u64>,
    pub vms_per_workload: BTreeMap<String, u64>,

    /// Estimations over every per-slice usage target of the fleet.
    pub usage_stats: EstimatorWrapper,
    /// Estimations over the lifetime of short lived VMs, in slices.
    pub lifetime_stats: EstimatorWrapper,
}

impl FleetSummary {
    pub fn collect(fleet: &[Vm]) -> Self {
        let mut summary = Self::default();
        for vm in fleet.iter() {
            summary.vm_count += 1;
            summary.total_vcpu += vm.cpu() as u64;
            summary.total_mem += vm.mem();
            if vm.is_periodic() {
                summary.periodic_vms += 1;
            }
            if vm.lifetime() > 0 {
                summary.short_lived_vms += 1;
                summary.lifetime_stats.add(vm.lifetime() as f64);
            }
            if vm.postponed_start() > 0 {
                summary.postponed_vms += 1;
            }
            if let Some(profile) = vm.profile() {
                *summary
                    .vms_per_profile
                    .entry(profile.to_string())
                    .or_default() += 1;
            }
            match vm.workload() {
                Some(workload) => {
                    *summary
                        .vms_per_workload
                        .entry(workload.to_string())
                        .or_default() += 1
                }
                None => summary.unassigned_vms += 1,
            }
            for usage in vm.usage() {
                summary.usage_stats.add(*usage as f64);
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vm::VmIdAllocator;

    #[test]
    fn test_collect() {
        let mut allocator = VmIdAllocator::new();
        let mut first = Vm::new(2, 4.0, &mut allocator).unwrap();
        first.set_profile("low".to_string());
        first.set_workload("idle".to_string());
        first.set_usage(vec![10, 20, 30]);
        first.set_periodicity(true);
        let mut second = Vm::new(1, 1.5, &mut allocator).unwrap();
        second.set_profile("low".to_string());
        second.set_lifetime(3);
        second.set_postponed_start(30);
        second.set_usage(vec![40]);

        let summary = FleetSummary::collect(&[first, second]);
        assert_eq!(summary.vm_count, 2);
        assert_eq!(summary.total_vcpu, 3);
        assert_eq!(summary.total_mem, 5.5);
        assert_eq!(summary.periodic_vms, 1);
        assert_eq!(summary.short_lived_vms, 1);
        assert_eq!(summary.postponed_vms, 1);
        assert_eq!(summary.unassigned_vms, 1);
        assert_eq!(summary.vms_per_profile["low"], 2);
        assert_eq!(summary.vms_per_workload["idle"], 1);
        assert_eq!(summary.usage_stats.min(), 10.0);
        assert_eq!(summary.usage_stats.max(), 40.0);
        assert_eq!(summary.usage_stats.mean(), 25.0);
        assert!((summary.usage_stats.population_variance() - 125.0).abs() < 1e-9);
        assert_eq!(summary.lifetime_stats.mean(), 3.0);
    }
}
