//! Builds the VM flavors of a fleet from the flavor distribution document, either for a given VM
//! count or for a CPU/memory budget.

use std::collections::BTreeMap;

use log::info;

use crate::core::optimizer::BudgetProblem;
use crate::core::vm::{Vm, VmIdAllocator};
use crate::error::Result;
use crate::scenario::distribution::{reduce_frequencies_to_one, DistributionScenario, MemFlavor};

pub struct FlavorDistributionBuilder {
    config_cpu: BTreeMap<u32, f64>,
    config_mem: BTreeMap<MemFlavor, f64>,
}

impl FlavorDistributionBuilder {
    pub fn new(scenario: DistributionScenario) -> Self {
        let mut config_cpu = scenario.vm_distribution.config_cpu;
        let mut config_mem = scenario.vm_distribution.config_mem;
        reduce_frequencies_to_one(&mut config_cpu, "CPU");
        reduce_frequencies_to_one(&mut config_mem, "Mem");
        Self {
            config_cpu,
            config_mem,
        }
    }

    pub fn config_cpu(&self) -> &BTreeMap<u32, f64> {
        &self.config_cpu
    }

    /// Generates exactly `vm_count` VMs following the CPU and memory frequencies.
    pub fn generate_from_count(
        &self,
        vm_count: usize,
        allocator: &mut VmIdAllocator,
    ) -> Result<Vec<Vm>> {
        let cpu_counts = self.cpu_counts_for_vm_count(vm_count);
        let vms = self.build_vms(&cpu_counts, allocator)?;
        self.display(&vms, None, None);
        Ok(vms)
    }

    /// Generates VMs using as much of `cpu_budget` as possible while keeping the CPU flavor shares
    /// close to the distribution. `mem_budget` is only reported against.
    pub fn generate_from_budget(
        &self,
        cpu_budget: u64,
        mem_budget: f64,
        allocator: &mut VmIdAllocator,
    ) -> Result<Vec<Vm>> {
        let problem = BudgetProblem::new(
            self.config_cpu
                .iter()
                .map(|(cpu, freq)| (*cpu, *freq))
                .collect(),
            cpu_budget,
        );
        let (counts, report) = problem.solve();
        info!(
            "Flavor optimizer: {} iterations, converged={}",
            report.iterations, report.converged
        );

        let cpu_counts: Vec<(u32, usize)> = self
            .config_cpu
            .keys()
            .cloned()
            .zip(counts.into_iter())
            .collect();
        let vms = self.build_vms(&cpu_counts, allocator)?;
        self.display(&vms, Some(cpu_budget), Some(mem_budget));
        Ok(vms)
    }

    /// Floors every `freq / total_freq * vm_count`, then hands the leftover VMs, at most one per
    /// flavor, to the flavors with the largest fractional parts so that the counts add up to
    /// `vm_count`.
    fn cpu_counts_for_vm_count(&self, vm_count: usize) -> Vec<(u32, usize)> {
        let total_freq: f64 = self.config_cpu.values().sum();
        let exact: Vec<(u32, f64)> = self
            .config_cpu
            .iter()
            .map(|(cpu, freq)| {
                let share = if total_freq > 0.0 { freq / total_freq } else { 0.0 };
                (*cpu, share * vm_count as f64)
            })
            .collect();
        let mut counts: Vec<(u32, usize)> = exact
            .iter()
            .map(|(cpu, exact)| (*cpu, exact.floor() as usize))
            .collect();

        let mut by_remainder: Vec<(usize, f64)> = exact
            .iter()
            .enumerate()
            .filter(|(_, (_, exact))| *exact > 0.0)
            .map(|(idx, (_, exact))| (idx, exact - exact.floor()))
            .collect();
        by_remainder.sort_by(|a, b| b.1.total_cmp(&a.1));

        let assigned: usize = counts.iter().map(|(_, count)| count).sum();
        let leftover = vm_count.saturating_sub(assigned);
        for (idx, _) in by_remainder.into_iter().take(leftover) {
            counts[idx].1 += 1;
        }
        counts
    }

    /// Splits `group_size` VMs over the memory flavors in ascending order. The last flavor with a
    /// positive frequency takes whatever rounding left over.
    pub fn memory_split(&self, group_size: usize) -> Vec<(f64, usize)> {
        let last_positive = self
            .config_mem
            .iter()
            .rev()
            .find(|(_, freq)| **freq > 0.0)
            .map(|(mem, _)| *mem);

        let mut split = vec![];
        let mut remaining = group_size;
        for (mem, freq) in self.config_mem.iter() {
            let count = if Some(*mem) == last_positive {
                remaining
            } else {
                usize::min((freq * group_size as f64).round() as usize, remaining)
            };
            remaining -= count;
            split.push((mem.0, count));
            if Some(*mem) == last_positive {
                break;
            }
        }
        split
    }

    fn build_vms(
        &self,
        cpu_counts: &[(u32, usize)],
        allocator: &mut VmIdAllocator,
    ) -> Result<Vec<Vm>> {
        let mut vms = Vec::with_capacity(cpu_counts.iter().map(|(_, count)| count).sum());
        for (cpu, count) in cpu_counts.iter() {
            for (mem, mem_count) in self.memory_split(*count) {
                for _ in 0..mem_count {
                    vms.push(Vm::new(*cpu, mem, allocator)?);
                }
            }
        }
        Ok(vms)
    }

    fn display(&self, vms: &[Vm], cpu_objective: Option<u64>, mem_objective: Option<f64>) {
        let mut per_flavor: BTreeMap<(u32, MemFlavor), usize> = BTreeMap::new();
        for vm in vms.iter() {
            *per_flavor
                .entry((vm.cpu(), MemFlavor::from(vm.mem())))
                .or_default() += 1;
        }

        let mut cpu_total = 0;
        let mut mem_total = 0.0;
        for ((cpu, mem), count) in per_flavor.iter() {
            info!("{}c-{}gb: {} vm", cpu, mem, count);
            cpu_total += *cpu as u64 * *count as u64;
            mem_total += mem.0 * *count as f64;
        }
        info!("Total VM {}", vms.len());
        match cpu_objective {
            Some(objective) => info!("Total vcpu {} / {}", cpu_total, objective),
            None => info!("Total vcpu {}", cpu_total),
        }
        match mem_objective {
            Some(objective) => info!("Total mem {} / {}", mem_total, objective),
            None => info!("Total mem {}", mem_total),
        }
    }
}
