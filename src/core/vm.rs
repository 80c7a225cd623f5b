//! Type definition for the VM entity which flows through every generation stage.

use std::collections::BTreeMap;

use crate::error::{GeneratorError, Result};

/// Presence flags of a VM: scope index -> one flag per slice of that scope.
pub type Timesheet = BTreeMap<usize, Vec<bool>>;

/// Macro left in generated commands, resolved by exporters to a local name or a remote address.
pub const IDENTITY_MACRO: &str = "§name";

/// Exporters NAT each VM behind `HOST_PORT_BASE + id` to stay away from common ports.
pub const HOST_PORT_BASE: u64 = 11000;

/// Hands out process-unique, monotonically increasing VM ids.
#[derive(Debug, Default, Clone)]
pub struct VmIdAllocator {
    next: u64,
}

impl VmIdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Makes sure later allocations never collide with an externally provided id.
    pub fn observe(&mut self, id: u64) {
        if id >= self.next {
            self.next = id + 1;
        }
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vm {
    id: u64,
    name: String,
    cpu: u32,
    mem: f64,
    /// Slice index (over the whole experiment) at which the VM appears.
    postponed_start: usize,
    /// Number of slices the VM lives, 0 meaning until the end of the experiment.
    lifetime: usize,
    timesheet: Timesheet,
    profile: Option<String>,
    periodicity: bool,
    avg: Option<u32>,
    per: Option<u32>,
    /// CPU usage targets in percent, one per occupied slice.
    usage: Vec<u32>,
    workload: Option<String>,
    commands: Vec<String>,
}

impl Vm {
    /// Creates a VM named after the id taken from `allocator`.
    pub fn new(cpu: u32, mem: f64, allocator: &mut VmIdAllocator) -> Result<Self> {
        let id = allocator.allocate();
        Self::with_identity(id, format!("vm{}", id), cpu, mem)
    }

    pub fn with_identity(id: u64, name: String, cpu: u32, mem: f64) -> Result<Self> {
        if cpu == 0 {
            return Err(GeneratorError::MissingParameter("cpu".to_string()));
        }
        if mem.is_nan() || mem <= 0.0 {
            return Err(GeneratorError::MissingParameter("mem".to_string()));
        }
        Ok(Self {
            id,
            name,
            cpu,
            mem,
            postponed_start: 0,
            lifetime: 0,
            timesheet: Default::default(),
            profile: None,
            periodicity: false,
            avg: None,
            per: None,
            usage: vec![],
            workload: None,
            commands: vec![],
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu(&self) -> u32 {
        self.cpu
    }

    pub fn mem(&self) -> f64 {
        self.mem
    }

    pub fn host_port(&self) -> u64 {
        HOST_PORT_BASE + self.id
    }

    pub fn postponed_start(&self) -> usize {
        self.postponed_start
    }

    pub fn set_postponed_start(&mut self, postponed_start: usize) {
        self.postponed_start = postponed_start;
    }

    pub fn lifetime(&self) -> usize {
        self.lifetime
    }

    pub fn set_lifetime(&mut self, lifetime: usize) {
        self.lifetime = lifetime;
    }

    pub fn timesheet(&self) -> &Timesheet {
        &self.timesheet
    }

    pub fn set_timesheet(&mut self, timesheet: Timesheet) {
        self.timesheet = timesheet;
    }

    /// Count of slices flagged as present, over all scopes.
    pub fn occupied_slices(&self) -> usize {
        self.timesheet
            .values()
            .map(|slices| slices.iter().filter(|present| **present).count())
            .sum()
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn set_profile(&mut self, profile: String) {
        self.profile = Some(profile);
    }

    pub fn is_periodic(&self) -> bool {
        self.periodicity
    }

    pub fn set_periodicity(&mut self, periodicity: bool) {
        self.periodicity = periodicity;
    }

    pub fn avg(&self) -> Option<u32> {
        self.avg
    }

    pub fn per(&self) -> Option<u32> {
        self.per
    }

    pub fn set_avg_and_per(&mut self, avg: u32, per: u32) {
        self.avg = Some(avg);
        self.per = Some(per);
    }

    pub fn usage(&self) -> &[u32] {
        &self.usage
    }

    pub fn set_usage(&mut self, usage: Vec<u32>) {
        self.usage = usage;
    }

    pub fn workload(&self) -> Option<&str> {
        self.workload.as_deref()
    }

    pub fn set_workload(&mut self, workload: String) {
        self.workload = Some(workload);
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn set_commands(&mut self, commands: Vec<String>) {
        self.commands = commands;
    }

    /// Commands with the identity macro replaced by `identifier`, as an exporter needs them.
    pub fn commands_with_identity(&self, identifier: &str) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| command.replace(IDENTITY_MACRO, identifier))
            .collect()
    }

    pub fn reset_workload(&mut self) {
        self.workload = None;
        self.commands.clear();
    }
}

/// Builds the presence flags of a VM starting at `postponed_start` and living `lifetime` slices
/// (0 = until the experiment end) over `number_of_scopes` scopes of `slices_per_scope` slices.
pub fn build_timesheet(
    postponed_start: usize,
    lifetime: usize,
    slices_per_scope: usize,
    number_of_scopes: usize,
) -> Timesheet {
    let horizon = slices_per_scope * number_of_scopes;
    let end = if lifetime > 0 {
        usize::min(postponed_start + lifetime, horizon)
    } else {
        horizon
    };

    let mut timesheet = Timesheet::new();
    for scope in 0..number_of_scopes {
        let first_slice = scope * slices_per_scope;
        let flags = (first_slice..first_slice + slices_per_scope)
            .map(|slice| slice >= postponed_start && slice < end)
            .collect();
        timesheet.insert(scope, flags);
    }
    timesheet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_names_vms_in_order() {
        let mut allocator = VmIdAllocator::new();
        let first = Vm::new(2, 4.0, &mut allocator).unwrap();
        let second = Vm::new(1, 1.0, &mut allocator).unwrap();

        assert_eq!(first.id(), 0);
        assert_eq!(first.name(), "vm0");
        assert_eq!(second.id(), 1);
        assert_eq!(second.name(), "vm1");
    }

    #[test]
    fn test_allocator_skips_observed_ids() {
        let mut allocator = VmIdAllocator::new();
        allocator.observe(41);
        assert_eq!(allocator.allocate(), 42);
        allocator.observe(3);
        assert_eq!(allocator.allocate(), 43);
    }

    #[test]
    fn test_construction_requires_flavor() {
        assert!(Vm::with_identity(0, "vm0".to_string(), 0, 1.0).is_err());
        assert!(Vm::with_identity(0, "vm0".to_string(), 1, 0.0).is_err());
    }

    #[test]
    fn test_defaults() {
        let vm = Vm::with_identity(99, "custom".to_string(), 1, 2.0).unwrap();
        assert_eq!(vm.lifetime(), 0);
        assert_eq!(vm.postponed_start(), 0);
        assert!(vm.timesheet().is_empty());
        assert!(vm.profile().is_none());
        assert!(!vm.is_periodic());
        assert!(vm.usage().is_empty());
        assert!(vm.workload().is_none());
        assert!(vm.commands().is_empty());
        assert_eq!(vm.host_port(), 11099);
    }

    #[test]
    fn test_timesheet_with_lifetime() {
        let timesheet = build_timesheet(3, 4, 4, 3);
        assert_eq!(timesheet[&0], vec![false, false, false, true]);
        assert_eq!(timesheet[&1], vec![true, true, true, false]);
        assert_eq!(timesheet[&2], vec![false, false, false, false]);
    }

    #[test]
    fn test_timesheet_until_end() {
        let timesheet = build_timesheet(5, 0, 4, 2);
        assert_eq!(timesheet[&0], vec![false; 4]);
        assert_eq!(timesheet[&1], vec![false, true, true, true]);
    }

    #[test]
    fn test_commands_with_identity() {
        let mut vm = Vm::with_identity(1, "vm1".to_string(), 1, 1.0).unwrap();
        vm.set_commands(vec!["ssh §name stress".to_string()]);
        assert_eq!(
            vm.commands_with_identity("${remoteip}:11001"),
            vec!["ssh ${remoteip}:11001 stress".to_string()]
        );
        assert_eq!(vm.commands()[0], "ssh §name stress");
    }
}
