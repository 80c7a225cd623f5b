use cloudfactory::config::Objective;
use cloudfactory::core::usage_builder::UsageBuilder;
use cloudfactory::core::vm::{Vm, VmIdAllocator};
use cloudfactory::random::Random;
use cloudfactory::scenario::interface::ScenarioDocument;
use cloudfactory::scenario::usage::UsageScenario;

use cloudfactory::test_util::helpers::{
    default_test_generator, default_test_generator_config, DEFAULT_USAGE,
};

/// Indices over the whole experiment of the slices a VM is present on.
fn present_slices(vm: &Vm) -> Vec<usize> {
    vm.timesheet()
        .values()
        .flatten()
        .enumerate()
        .filter(|(_, present)| **present)
        .map(|(slice, _)| slice)
        .collect()
}

fn generated_fleet() -> (Vec<Vm>, usize, usize) {
    let config = default_test_generator_config(None);
    let slices_per_scope = config.temporality.slices_per_scope();
    let horizon = config.temporality.horizon();
    let mut generator = default_test_generator(config);
    let fleet = generator
        .generate(Some(&Objective::VmCount { count: 200 }))
        .unwrap();
    (fleet, slices_per_scope, horizon)
}

#[test]
fn test_timesheet_follows_lifecycle() {
    let (fleet, _, horizon) = generated_fleet();
    for vm in fleet.iter() {
        let end = if vm.lifetime() > 0 {
            vm.postponed_start() + vm.lifetime()
        } else {
            horizon
        };
        assert!(end <= horizon);
        assert_eq!(
            present_slices(vm),
            (vm.postponed_start()..end).collect::<Vec<usize>>(),
            "{} starts at {} and lives {}",
            vm.name(),
            vm.postponed_start(),
            vm.lifetime()
        );
    }
}

#[test]
fn test_one_usage_and_command_per_present_slice() {
    let (fleet, _, _) = generated_fleet();
    for vm in fleet.iter() {
        assert_eq!(vm.usage().len(), vm.occupied_slices());
        if vm.workload().is_some() {
            assert_eq!(vm.commands().len(), vm.usage().len());
        } else {
            assert!(vm.commands().is_empty());
        }
        assert!(vm.usage().iter().all(|usage| (1..=100).contains(usage)));
    }
}

#[test]
fn test_short_lifetime_stays_within_a_scope() {
    let (fleet, slices_per_scope, _) = generated_fleet();
    let short_lived: Vec<&Vm> = fleet.iter().filter(|vm| vm.lifetime() > 0).collect();
    assert!(!short_lived.is_empty());
    for vm in short_lived {
        assert!(vm.lifetime() <= slices_per_scope);
    }
}

#[test]
fn test_newcomers_start_in_their_scope() {
    let (fleet, slices_per_scope, _) = generated_fleet();
    assert!(fleet.iter().take(200).all(|vm| vm.postponed_start() == 0));

    let newcomers: Vec<&Vm> = fleet.iter().skip(200).collect();
    assert!(!newcomers.is_empty());
    let per_scope = newcomers.len() / 2;
    for (position, vm) in newcomers.iter().enumerate() {
        let scope = 1 + position / per_scope;
        assert!(vm.postponed_start() >= scope * slices_per_scope);
        assert!(vm.postponed_start() < (scope + 1) * slices_per_scope);
    }
}

#[test]
fn test_periodic_usage_repeats_across_scopes() {
    let (fleet, slices_per_scope, _) = generated_fleet();
    let periodic_long_lived: Vec<&Vm> = fleet
        .iter()
        .filter(|vm| vm.is_periodic() && vm.lifetime() == 0 && vm.postponed_start() == 0)
        .collect();
    assert!(!periodic_long_lived.is_empty());

    for vm in periodic_long_lived {
        let usage = vm.usage();
        for slot in 0..slices_per_scope {
            assert_eq!(usage[slot], usage[slot + slices_per_scope]);
            assert_eq!(usage[slot], usage[slot + 2 * slices_per_scope]);
        }
    }
}

#[test]
fn test_profile_shares() {
    let scenario = UsageScenario::from_yaml_str(DEFAULT_USAGE).unwrap();
    let mut builder = UsageBuilder::new(scenario, 24, 1);
    let mut allocator = VmIdAllocator::new();
    let mut vms: Vec<Vm> = (0..100)
        .map(|_| Vm::new(1, 1.0, &mut allocator).unwrap())
        .collect();
    builder
        .attribute_usage_to_vm_list(&mut vms, 0, &mut Random::new(17))
        .unwrap();

    let count = |profile: &str| vms.iter().filter(|vm| vm.profile() == Some(profile)).count();
    assert_eq!(count("idle"), 50);
    assert_eq!(count("medium"), 30);
    assert_eq!(count("intensive"), 20);
    // floor(0.05 * 50) + floor(0.1 * 30) + floor(0.05 * 20)
    assert_eq!(builder.overall_count_to_create().unwrap(), 6);
}
