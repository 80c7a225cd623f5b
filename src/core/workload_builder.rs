//! Attributes a workload to every VM, most constrained workload first, then generates the VM
//! commands from their usage.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::core::vm::Vm;
use crate::core::workload_profile::WorkloadProfile;
use crate::error::Result;
use crate::random::Random;
use crate::scenario::interface::FREQUENCY_EPSILON;
use crate::scenario::workload::WorkloadScenario;

/// Upper bound on assignment passes over the VMs left without a workload.
pub const MAX_ASSIGNMENT_PASSES: usize = 32;

pub struct WorkloadBuilder {
    acronyms: BTreeMap<String, String>,
    workloads: BTreeMap<String, WorkloadProfile>,
}

impl WorkloadBuilder {
    pub fn new(scenario: WorkloadScenario, slice_duration: u64) -> Result<Self> {
        let acronyms = scenario.vm_workloads.acronyms;
        let mut workloads = BTreeMap::new();
        for (name, spec) in scenario.vm_workloads.workloads.iter() {
            let profile = WorkloadProfile::new(name.clone(), spec, &acronyms, slice_duration)?;
            workloads.insert(name.clone(), profile);
        }
        Ok(Self {
            acronyms,
            workloads,
        })
    }

    pub fn workloads(&self) -> &BTreeMap<String, WorkloadProfile> {
        &self.workloads
    }

    /// Global acronym value, `acronym` given with or without its leading `§`.
    pub fn context(&self, acronym: &str) -> Option<&str> {
        let key = if acronym.starts_with('§') {
            acronym.to_string()
        } else {
            format!("§{}", acronym)
        };
        self.acronyms.get(&key).map(String::as_str)
    }

    /// Attributes workloads to the VMs without one, then sets the commands of every VM with a
    /// workload. VMs need their usage beforehand.
    pub fn attribute_workload_commands_to_vm_list(
        &self,
        vms: &mut [Vm],
        random: &mut Random,
    ) -> Result<()> {
        self.attribute_workloads_to_vm_list(vms, random);
        for vm in vms.iter_mut() {
            let workload = match vm.workload().and_then(|name| self.workloads.get(name)) {
                Some(workload) => workload,
                None => continue,
            };
            let commands = workload.generate_commands(vm)?;
            vm.set_commands(commands);
        }
        Ok(())
    }

    /// Repeats assignment passes over the VMs still lacking a workload until every VM has one,
    /// a pass assigns nothing or the pass limit is reached.
    fn attribute_workloads_to_vm_list(&self, vms: &mut [Vm], random: &mut Random) {
        let mut pending: BTreeSet<usize> = (0..vms.len())
            .filter(|idx| vms[*idx].workload().is_none())
            .collect();

        for pass in 0..MAX_ASSIGNMENT_PASSES {
            if pending.is_empty() {
                break;
            }
            let candidates: Vec<usize> = pending.iter().cloned().collect();
            let assigned = self.assignment_pass(vms, &candidates, pass, random);
            if assigned.is_empty() {
                break;
            }
            pending.retain(|idx| !assigned.contains(idx));
        }

        if !pending.is_empty() {
            warn!(
                "{} vm left without workload, no workload constraint admits them",
                pending.len()
            );
        }
    }

    /// One greedy pass: the workload admitting the fewest VMs picks first. Returns the indices of
    /// the VMs given a workload.
    fn assignment_pass(
        &self,
        vms: &mut [Vm],
        candidates: &[usize],
        pass: usize,
        random: &mut Random,
    ) -> BTreeSet<usize> {
        let total = candidates.len();
        let mut treated_vms = BTreeSet::new();
        let mut remaining: Vec<&WorkloadProfile> = self.workloads.values().collect();

        while !remaining.is_empty() {
            let mut most_constrained: Option<(usize, Vec<usize>)> = None;
            for (position, workload) in remaining.iter().enumerate() {
                let eligible: Vec<usize> = candidates
                    .iter()
                    .cloned()
                    .filter(|idx| !treated_vms.contains(idx))
                    .filter(|idx| workload.does_vm_verify_constraints(&vms[*idx]))
                    .collect();
                if eligible.is_empty() {
                    continue;
                }
                // strict comparison keeps the first workload in name order on ties
                if most_constrained
                    .as_ref()
                    .map_or(true, |(_, best)| eligible.len() < best.len())
                {
                    most_constrained = Some((position, eligible));
                }
            }
            let (position, eligible) = match most_constrained {
                Some(found) => found,
                None => break,
            };
            let workload = remaining.remove(position);

            let required = (workload.freq() * total as f64 - FREQUENCY_EPSILON)
                .ceil()
                .max(0.0) as usize;
            if eligible.len() < required {
                let message = format!(
                    "Workload {:?} under-fulfilled: {} vm required, {} eligible",
                    workload.name(),
                    required,
                    eligible.len()
                );
                if pass == 0 {
                    warn!("{}", message);
                } else {
                    debug!("{}", message);
                }
            }

            let attributed = usize::min(required, eligible.len());
            let mut flags = vec![true; attributed];
            flags.resize(eligible.len(), false);
            random.shuffle(&mut flags);
            for (idx, is_attributed) in eligible.into_iter().zip(flags.into_iter()) {
                if is_attributed {
                    vms[idx].set_workload(workload.name().to_string());
                    treated_vms.insert(idx);
                }
            }
        }
        treated_vms
    }
}
