use cloudfactory::config::{GeneratorConfig, Objective};
use cloudfactory::core::vm::Vm;
use cloudfactory::generator::ExperimentGenerator;
use cloudfactory::metrics::collector::FleetSummary;
use cloudfactory::test_util::helpers::{default_test_generator, default_test_generator_config};

fn run_generation(seed: u64, objective: Objective) -> Vec<Vm> {
    let mut config: GeneratorConfig = default_test_generator_config(None);
    // fixing seed
    config.seed = seed;
    let mut generator: ExperimentGenerator = default_test_generator(config);
    generator.generate(Some(&objective)).unwrap()
}

#[test]
pub fn test_generation_determinism() {
    let objective = Objective::VmCount { count: 120 };
    let first_fleet = run_generation(46, objective);
    let first_summary = FleetSummary::collect(&first_fleet);

    for _ in 0..5 {
        let current = run_generation(46, objective);
        assert_eq!(first_fleet, current);

        let summary = FleetSummary::collect(&current);
        assert_eq!(first_summary.usage_stats, summary.usage_stats);
        assert_eq!(first_summary.vms_per_workload, summary.vms_per_workload);
    }
}

#[test]
pub fn test_budget_generation_determinism() {
    let objective = Objective::Budget { cpu: 300, mem: 600.0 };
    assert_eq!(run_generation(7, objective), run_generation(7, objective));
}

#[test]
pub fn test_seed_changes_the_fleet() {
    let objective = Objective::VmCount { count: 120 };
    let first = run_generation(1, objective);
    let second = run_generation(2, objective);

    // flavors only depend on the distribution, usage on the seed
    let flavors = |fleet: &[Vm]| {
        fleet
            .iter()
            .take(120)
            .map(|vm| (vm.cpu(), vm.mem()))
            .collect::<Vec<_>>()
    };
    assert_eq!(flavors(&first), flavors(&second));
    let usages = |fleet: &[Vm]| fleet.iter().map(|vm| vm.usage().to_vec()).collect::<Vec<_>>();
    assert_ne!(usages(&first), usages(&second));
}
