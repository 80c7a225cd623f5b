use std::collections::BTreeMap;

use cloudfactory::core::flavor_builder::FlavorDistributionBuilder;
use cloudfactory::core::vm::{Vm, VmIdAllocator};
use cloudfactory::scenario::distribution::DistributionScenario;
use cloudfactory::scenario::interface::ScenarioDocument;

use cloudfactory::test_util::helpers::DEFAULT_DISTRIBUTION;

fn default_builder() -> FlavorDistributionBuilder {
    FlavorDistributionBuilder::new(
        DistributionScenario::from_yaml_str(DEFAULT_DISTRIBUTION).unwrap(),
    )
}

fn count_per_flavor(vms: &[Vm]) -> BTreeMap<(u32, String), usize> {
    let mut counts = BTreeMap::new();
    for vm in vms {
        *counts.entry((vm.cpu(), vm.mem().to_string())).or_default() += 1;
    }
    counts
}

#[test]
fn test_count_follows_frequencies() {
    let builder = default_builder();
    let mut allocator = VmIdAllocator::new();
    let vms = builder.generate_from_count(100, &mut allocator).unwrap();

    assert_eq!(vms.len(), 100);
    let counts = count_per_flavor(&vms);
    let expected = BTreeMap::from([
        ((1, "1.75".to_string()), 30),
        ((1, "3.5".to_string()), 20),
        ((2, "1.75".to_string()), 18),
        ((2, "3.5".to_string()), 12),
        ((4, "1.75".to_string()), 12),
        ((4, "3.5".to_string()), 8),
    ]);
    assert_eq!(counts, expected);
}

#[test]
fn test_count_is_exact_whatever_the_rounding() {
    let builder = default_builder();
    let mut allocator = VmIdAllocator::new();
    for n in [0, 1, 3, 7, 13, 99, 101] {
        let vms = builder.generate_from_count(n, &mut allocator).unwrap();
        assert_eq!(vms.len(), n);
        for vm in vms.iter() {
            assert!([1, 2, 4].contains(&vm.cpu()));
            assert!(vm.mem() == 1.75 || vm.mem() == 3.5);
        }
    }
}

#[test]
fn test_ids_are_unique_across_calls() {
    let builder = default_builder();
    let mut allocator = VmIdAllocator::new();
    let mut vms = builder.generate_from_count(10, &mut allocator).unwrap();
    vms.extend(builder.generate_from_count(10, &mut allocator).unwrap());

    let mut ids: Vec<u64> = vms.iter().map(|vm| vm.id()).collect();
    ids.dedup();
    assert_eq!(ids, (0..20).collect::<Vec<u64>>());
    assert_eq!(vms[15].name(), "vm15");
}

#[test]
fn test_budget_fills_cpu() {
    let builder = default_builder();
    let mut allocator = VmIdAllocator::new();
    let vms = builder.generate_from_budget(190, 300.0, &mut allocator).unwrap();

    let total_cpu: u64 = vms.iter().map(|vm| vm.cpu() as u64).sum();
    let total_mem: f64 = vms.iter().map(|vm| vm.mem()).sum();
    assert_eq!(total_cpu, 190);
    assert_eq!(vms.len(), 100);
    assert!(total_mem > 0.0);
}

#[test]
fn test_budget_never_overshoots_by_more_than_a_flavor() {
    let builder = default_builder();
    let mut allocator = VmIdAllocator::new();
    for budget in [8, 17, 50, 123, 1000] {
        let vms = builder.generate_from_budget(budget, 1.0, &mut allocator).unwrap();
        let total_cpu: u64 = vms.iter().map(|vm| vm.cpu() as u64).sum();
        assert!(!vms.is_empty());
        assert!(total_cpu <= budget + 4, "{} cpu for a {} budget", total_cpu, budget);
    }
}

#[test]
fn test_overflowing_distribution_is_reduced() {
    let builder = FlavorDistributionBuilder::new(
        DistributionScenario::from_yaml_str(
            r#"
vm_distribution:
  config_cpu: {1: 0.6, 2: 0.6}
  config_mem: {2.0: 1.0}
"#,
        )
        .unwrap(),
    );
    assert_eq!(builder.config_cpu()[&1], 0.6);
    assert!((builder.config_cpu()[&2] - 0.4).abs() < 1e-9);

    let mut allocator = VmIdAllocator::new();
    let vms = builder.generate_from_count(10, &mut allocator).unwrap();
    assert_eq!(vms.iter().filter(|vm| vm.cpu() == 1).count(), 6);
    assert_eq!(vms.iter().filter(|vm| vm.cpu() == 2).count(), 4);
}

#[test]
fn test_partial_distribution_keeps_relative_shares() {
    let builder = FlavorDistributionBuilder::new(
        DistributionScenario::from_yaml_str(
            r#"
vm_distribution:
  config_cpu: {1: 0.6, 2: 0.2}
  config_mem: {2.0: 1.0}
"#,
        )
        .unwrap(),
    );
    let mut allocator = VmIdAllocator::new();
    let vms = builder.generate_from_count(100, &mut allocator).unwrap();
    assert_eq!(vms.len(), 100);
    assert_eq!(vms.iter().filter(|vm| vm.cpu() == 1).count(), 75);
    assert_eq!(vms.iter().filter(|vm| vm.cpu() == 2).count(), 25);

    let builder = FlavorDistributionBuilder::new(
        DistributionScenario::from_yaml_str(
            r#"
vm_distribution:
  config_cpu: {1: 0.7, 2: 0.1}
  config_mem: {2.0: 1.0}
"#,
        )
        .unwrap(),
    );
    for vm_count in [7, 40, 100, 333] {
        let vms = builder.generate_from_count(vm_count, &mut allocator).unwrap();
        assert_eq!(vms.len(), vm_count);
        for (cpu, share) in [(1, 0.875), (2, 0.125)] {
            let count = vms.iter().filter(|vm| vm.cpu() == cpu).count() as f64;
            let expected = share * vm_count as f64;
            assert!(
                (count - expected).abs() < 1.0,
                "{} VMs of {} cpu out of {}",
                count,
                cpu,
                vm_count
            );
        }
    }
}
