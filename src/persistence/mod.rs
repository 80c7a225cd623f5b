//! Flat json record list of a fleet, used to save a generated fleet and reload it later.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::core::vm::{Timesheet, Vm, VmIdAllocator};
use crate::error::Result;

/// One VM, field for field.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VmRecord {
    pub id: u64,
    pub name: String,
    pub cpu: u32,
    pub mem: f64,
    #[serde(default)]
    pub postponed_start: usize,
    #[serde(default)]
    pub lifetime: usize,
    #[serde(default)]
    pub timesheet: Timesheet,
    pub profile: Option<String>,
    #[serde(default)]
    pub periodicity: bool,
    pub avg: Option<u32>,
    pub per: Option<u32>,
    #[serde(default)]
    pub usage: Vec<u32>,
    pub workload: Option<String>,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl From<&Vm> for VmRecord {
    fn from(vm: &Vm) -> Self {
        Self {
            id: vm.id(),
            name: vm.name().to_string(),
            cpu: vm.cpu(),
            mem: vm.mem(),
            postponed_start: vm.postponed_start(),
            lifetime: vm.lifetime(),
            timesheet: vm.timesheet().clone(),
            profile: vm.profile().map(str::to_string),
            periodicity: vm.is_periodic(),
            avg: vm.avg(),
            per: vm.per(),
            usage: vm.usage().to_vec(),
            workload: vm.workload().map(str::to_string),
            commands: vm.commands().to_vec(),
        }
    }
}

impl VmRecord {
    pub fn into_vm(self) -> Result<Vm> {
        let mut vm = Vm::with_identity(self.id, self.name, self.cpu, self.mem)?;
        vm.set_postponed_start(self.postponed_start);
        vm.set_lifetime(self.lifetime);
        vm.set_timesheet(self.timesheet);
        if let Some(profile) = self.profile {
            vm.set_profile(profile);
        }
        vm.set_periodicity(self.periodicity);
        if let (Some(avg), Some(per)) = (self.avg, self.per) {
            vm.set_avg_and_per(avg, per);
        }
        vm.set_usage(self.usage);
        if let Some(workload) = self.workload {
            vm.set_workload(workload);
        }
        vm.set_commands(self.commands);
        Ok(vm)
    }
}

pub fn fleet_to_records(fleet: &[Vm]) -> Vec<VmRecord> {
    fleet.iter().map(VmRecord::from).collect()
}

/// Rebuilds a fleet and makes `allocator` continue after the highest reloaded id.
pub fn fleet_from_records(
    records: Vec<VmRecord>,
    allocator: &mut VmIdAllocator,
) -> Result<Vec<Vm>> {
    let mut fleet = Vec::with_capacity(records.len());
    for record in records {
        allocator.observe(record.id);
        fleet.push(record.into_vm()?);
    }
    Ok(fleet)
}

pub fn export_fleet(path: &Path, fleet: &[Vm]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &fleet_to_records(fleet))?;
    writer.flush()?;
    info!("Exported {} vm to {:?}", fleet.len(), path);
    Ok(())
}

pub fn import_fleet(path: &Path, allocator: &mut VmIdAllocator) -> Result<Vec<Vm>> {
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<VmRecord> = serde_json::from_reader(reader)?;
    let fleet = fleet_from_records(records, allocator)?;
    info!("Imported {} vm from {:?}", fleet.len(), path);
    Ok(fleet)
}
