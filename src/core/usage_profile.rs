//! A usage profile is an abstracted category of CPU usage. It decides how long the VMs of its
//! category live, whether their usage repeats every scope, and how many newcomers each scope gets.

use log::debug;

use crate::core::vm::{build_timesheet, Vm};
use crate::error::{GeneratorError, Result};
use crate::random::Random;
use crate::scenario::usage::{Bounds, Rates, UsageProfileSpec};

#[derive(Debug, Clone)]
pub struct UsageProfile {
    name: String,
    freq: f64,
    average: Bounds,
    percentile: Bounds,
    rates: Rates,
    slices_per_scope: usize,
    number_of_scopes: usize,
    /// Population seen by the first filtering of a run, base of arrival based growth.
    initial_vm_count: Option<usize>,
}

impl UsageProfile {
    pub fn new(
        name: String,
        spec: &UsageProfileSpec,
        slices_per_scope: usize,
        number_of_scopes: usize,
    ) -> Self {
        Self {
            name,
            freq: spec.freq,
            average: spec.avg,
            percentile: spec.per,
            rates: spec.rate,
            slices_per_scope,
            number_of_scopes,
            initial_vm_count: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    pub fn average_bounds(&self) -> (f64, f64) {
        (self.average.min, self.average.max)
    }

    pub fn percentile_bounds(&self) -> (f64, f64) {
        (self.percentile.min, self.percentile.max)
    }

    pub fn initial_vm_count(&self) -> Option<usize> {
        self.initial_vm_count
    }

    /// Applies lifetime, start, timesheet and periodicity to the VMs of this profile.
    /// `postponed_start` holds one start slice per VM of this profile, in fleet order.
    pub fn generate_and_apply_usage(
        &mut self,
        vms: &mut [Vm],
        postponed_start: &[usize],
        random: &mut Random,
    ) {
        let filtered = self.filter(vms);
        debug!("Profile {:?} applies to {} vm", self.name, filtered.len());
        self.apply_lifetime(vms, &filtered, postponed_start, random);
        self.apply_periodicity(vms, &filtered, random);
    }

    /// A VM living more than a scope is very likely to live long, so lifetime is binary: short
    /// lived VMs (departure rate) stay less than a scope, the others until the experiment end.
    fn apply_lifetime(
        &self,
        vms: &mut [Vm],
        filtered: &[usize],
        postponed_start: &[usize],
        random: &mut Random,
    ) {
        let short_count = (self.rates.departure * filtered.len() as f64).floor() as usize;
        let mut short_lived = vec![true; short_count];
        short_lived.resize(filtered.len(), false);
        random.shuffle(&mut short_lived);

        let horizon = self.slices_per_scope * self.number_of_scopes;
        for (count, idx) in filtered.iter().enumerate() {
            let start = postponed_start.get(count).copied().unwrap_or(0);
            let lifetime = if short_lived[count] {
                let drawn = random.gen_range(1..=self.slices_per_scope);
                // a VM cannot outlive the experiment
                usize::min(drawn, horizon.saturating_sub(start).max(1))
            } else {
                0
            };

            let vm = &mut vms[*idx];
            vm.set_postponed_start(start);
            vm.set_lifetime(lifetime);
            vm.set_timesheet(build_timesheet(
                start,
                lifetime,
                self.slices_per_scope,
                self.number_of_scopes,
            ));
        }
    }

    fn apply_periodicity(&self, vms: &mut [Vm], filtered: &[usize], random: &mut Random) {
        let periodic_count = (self.rates.periodicity * filtered.len() as f64).floor() as usize;
        let mut periodic = vec![true; periodic_count];
        periodic.resize(filtered.len(), false);
        random.shuffle(&mut periodic);

        for (count, idx) in filtered.iter().enumerate() {
            vms[*idx].set_periodicity(periodic[count]);
        }
    }

    /// Number of VMs to create on each later scope, from the arrival rate.
    pub fn count_to_create(&self) -> Result<usize> {
        match self.initial_vm_count {
            Some(initial) => Ok((self.rates.arrival * initial as f64).floor() as usize),
            None => Err(GeneratorError::ProfileNotObserved(self.name.clone())),
        }
    }

    /// Indices of the VMs labeled with this profile. The first call of a run records the initial
    /// population.
    fn filter(&mut self, vms: &[Vm]) -> Vec<usize> {
        let filtered: Vec<usize> = vms
            .iter()
            .enumerate()
            .filter(|(_, vm)| vm.profile() == Some(self.name.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        if self.initial_vm_count.is_none() {
            self.initial_vm_count = Some(filtered.len());
        }
        filtered
    }

    pub fn count(&mut self, vms: &[Vm]) -> usize {
        self.filter(vms).len()
    }
}
