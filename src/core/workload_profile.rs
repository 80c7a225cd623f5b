//! A workload profile is a command template with the constraints a VM must verify to run it.

use std::collections::BTreeMap;

use crate::core::expression::{check_syntax, evaluate, format_number};
use crate::core::vm::Vm;
use crate::error::Result;
use crate::scenario::workload::{ConstraintSpec, WorkloadSpec};

pub const TIME_MACRO: &str = "§time";
pub const CPU_MACRO: &str = "§cpu";
pub const MEM_MACRO: &str = "§mem";
pub const TARGET_MACRO: &str = "§target";

#[derive(Debug, Clone)]
pub struct WorkloadProfile {
    name: String,
    /// Template with the global acronyms already substituted.
    command: String,
    custom_acronyms: BTreeMap<String, String>,
    constraint: ConstraintSpec,
    slice_duration: u64,
}

impl WorkloadProfile {
    pub fn new(
        name: String,
        spec: &WorkloadSpec,
        global_acronyms: &BTreeMap<String, String>,
        slice_duration: u64,
    ) -> Result<Self> {
        // reverse order puts `§folder` before its prefix `§f`
        let command = global_acronyms
            .iter()
            .rev()
            .fold(spec.command.clone(), |command, (acronym, replacement)| {
                command.replace(acronym.as_str(), replacement)
            });

        // built-ins bound to 1 to reject malformed expressions before generation starts
        for expression in spec.acronyms.values() {
            check_syntax(&replace_builtins(expression, 1, 1, 1.0, 1))?;
        }

        Ok(Self {
            name,
            command,
            custom_acronyms: spec.acronyms.clone(),
            constraint: spec.constraint.clone(),
            slice_duration,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn freq(&self) -> f64 {
        self.constraint.freq
    }

    pub fn does_vm_verify_constraints(&self, vm: &Vm) -> bool {
        if let Some(profiles) = &self.constraint.profile {
            match vm.profile() {
                Some(profile) if profiles.iter().any(|p| p == profile) => {}
                _ => return false,
            }
        }
        if let Some(mem) = &self.constraint.mem {
            if !mem.contains(vm.mem()) {
                return false;
            }
        }
        if let Some(cpu) = &self.constraint.cpu {
            if !cpu.contains(vm.cpu() as f64) {
                return false;
            }
        }
        true
    }

    /// One command per usage target of `vm`. The identity macro is kept for exporters.
    pub fn generate_commands(&self, vm: &Vm) -> Result<Vec<String>> {
        vm.usage()
            .iter()
            .map(|target| self.generate_command(vm, *target))
            .collect()
    }

    fn generate_command(&self, vm: &Vm, target: u32) -> Result<String> {
        let command = replace_builtins(
            &self.command,
            self.slice_duration,
            vm.cpu(),
            vm.mem(),
            target,
        );

        let mut evaluated = Vec::with_capacity(self.custom_acronyms.len());
        for (acronym, expression) in self.custom_acronyms.iter() {
            let expression =
                replace_builtins(expression, self.slice_duration, vm.cpu(), vm.mem(), target);
            evaluated.push((acronym, format_number(evaluate(&expression)?)));
        }
        // reverse name order substitutes `§halftime` before `§half`
        Ok(evaluated
            .into_iter()
            .rev()
            .fold(command, |command, (acronym, value)| {
                command.replace(acronym.as_str(), &value)
            }))
    }
}

fn replace_builtins(
    template: &str,
    slice_duration: u64,
    cpu: u32,
    mem: f64,
    target: u32,
) -> String {
    template
        .replace(TIME_MACRO, &slice_duration.to_string())
        .replace(CPU_MACRO, &cpu.to_string())
        .replace(MEM_MACRO, &mem.to_string())
        .replace(TARGET_MACRO, &target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vm::{VmIdAllocator, IDENTITY_MACRO};
    use crate::error::GeneratorError;
    use crate::scenario::workload::RangeSpec;

    fn spec(command: &str, acronyms: &[(&str, &str)], constraint: ConstraintSpec) -> WorkloadSpec {
        WorkloadSpec {
            command: command.to_string(),
            acronyms: acronyms
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            constraint,
        }
    }

    fn constraint() -> ConstraintSpec {
        ConstraintSpec {
            freq: 1.0,
            profile: None,
            cpu: None,
            mem: None,
        }
    }

    fn vm(cpu: u32, mem: f64, profile: &str) -> Vm {
        let mut vm = Vm::new(cpu, mem, &mut VmIdAllocator::new()).unwrap();
        vm.set_profile(profile.to_string());
        vm
    }

    #[test]
    fn test_constraints() {
        let mut constraint = constraint();
        constraint.profile = Some(vec!["low".to_string(), "medium".to_string()]);
        constraint.cpu = Some(RangeSpec {
            min: Some(2.0),
            max: Some(4.0),
        });
        constraint.mem = Some(RangeSpec {
            min: None,
            max: Some(8.0),
        });
        let workload = WorkloadProfile::new(
            "w".to_string(),
            &spec("run", &[], constraint),
            &BTreeMap::new(),
            3600,
        )
        .unwrap();

        assert!(workload.does_vm_verify_constraints(&vm(2, 8.0, "low")));
        assert!(workload.does_vm_verify_constraints(&vm(4, 1.0, "medium")));
        assert!(!workload.does_vm_verify_constraints(&vm(1, 1.0, "low")));
        assert!(!workload.does_vm_verify_constraints(&vm(2, 16.0, "low")));
        assert!(!workload.does_vm_verify_constraints(&vm(2, 1.0, "high")));
        assert!(!workload.does_vm_verify_constraints(
            &Vm::new(2, 1.0, &mut VmIdAllocator::new()).unwrap()
        ));
    }

    #[test]
    fn test_command_expansion() {
        let globals = BTreeMap::from([("§folder".to_string(), "/opt/tools".to_string())]);
        let spec = spec(
            "ssh §name §folder/stress §cpu §mem §target §half §halftime",
            &[("§half", "§time / 2"), ("§halftime", "§time / 2 + 0.5")],
            constraint(),
        );
        let workload = WorkloadProfile::new("stress".to_string(), &spec, &globals, 3600).unwrap();
        assert_eq!(
            workload.command(),
            "ssh §name /opt/tools/stress §cpu §mem §target §half §halftime"
        );

        let mut vm = vm(2, 1.75, "low");
        vm.set_usage(vec![30, 45]);
        let commands = workload.generate_commands(&vm).unwrap();
        assert_eq!(
            commands,
            vec![
                format!("ssh {} /opt/tools/stress 2 1.75 30 1800 1800.5", IDENTITY_MACRO),
                format!("ssh {} /opt/tools/stress 2 1.75 45 1800 1800.5", IDENTITY_MACRO),
            ]
        );
    }

    #[test]
    fn test_overlapping_global_acronyms() {
        let globals = BTreeMap::from([
            ("§f".to_string(), "fast".to_string()),
            ("§folder".to_string(), "/opt/tools".to_string()),
        ]);
        let workload = WorkloadProfile::new(
            "run".to_string(),
            &spec("§folder/run.sh §f", &[], constraint()),
            &globals,
            60,
        )
        .unwrap();
        assert_eq!(workload.command(), "/opt/tools/run.sh fast");
    }

    #[test]
    fn test_malformed_acronym_is_rejected_at_load() {
        let spec = spec("run §x", &[("§x", "§cpu +")], constraint());
        let result = WorkloadProfile::new("bad".to_string(), &spec, &BTreeMap::new(), 60);
        assert!(matches!(result, Err(GeneratorError::InvalidExpression { .. })));
    }
}
