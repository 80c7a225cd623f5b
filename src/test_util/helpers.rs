use crate::config::GeneratorConfig;
use crate::generator::ExperimentGenerator;
use crate::scenario::distribution::DistributionScenario;
use crate::scenario::interface::ScenarioDocument;
use crate::scenario::usage::UsageScenario;
use crate::scenario::workload::WorkloadScenario;

pub const DEFAULT_DISTRIBUTION: &str = r#"
vm_distribution:
  config_cpu:
    1: 0.5
    2: 0.3
    4: 0.2
  config_mem:
    1.75: 0.6
    3.5: 0.4
"#;

pub const DEFAULT_USAGE: &str = r#"
vm_usage:
  idle:
    avg: {min: 1, max: 5}
    per: {min: 5, max: 15}
    rate: {arrival: 0.05, departure: 0.1, periodicity: 0.5}
    freq: 0.5
  medium:
    avg: {min: 20, max: 40}
    per: {min: 40, max: 70}
    rate: {arrival: 0.1, departure: 0.2, periodicity: 0.25}
    freq: 0.3
  intensive:
    avg: {min: 60, max: 80}
    per: {min: 80, max: 100}
    rate: {arrival: 0.05, departure: 0.5}
    freq: 0.2
"#;

pub const DEFAULT_WORKLOAD: &str = r#"
vm_workloads:
  acronyms:
    §folder: /opt/cloudfactory
  workloads:
    stress:
      command: §folder/stress.sh §name §cpu §target §time
      constraint:
        freq: 0.4
        profile: [medium, intensive]
    idle:
      command: sleep §time
      constraint:
        freq: 0.4
        profile: [idle]
    memory:
      command: §folder/mem.sh §name §mem §half
      acronyms:
        §half: §time / 2
      constraint:
        freq: 0.2
        cpu: {min: 2}
        mem: {min: 3.5}
"#;

pub fn default_test_generator_config(with_suffix: Option<&str>) -> GeneratorConfig {
    let mut default = r#"
    sim_name: "test_cloudfactory"
    seed: 123
    temporality:
      slice_duration: 3600
      scope_duration: 86400
      number_of_scopes: 3
    scenario:
      distribution: scenarios/distribution.yml
      usage: scenarios/usage.yml
      workload: scenarios/workload.yml
    "#
    .to_string();

    if let Some(suffix) = with_suffix {
        default.push_str(suffix);
    }

    GeneratorConfig::from_yaml_str(&default).unwrap()
}

/// Generator over the default scenarios, without touching the filesystem.
pub fn default_test_generator(config: GeneratorConfig) -> ExperimentGenerator {
    test_generator(config, DEFAULT_DISTRIBUTION, DEFAULT_USAGE, DEFAULT_WORKLOAD)
}

pub fn test_generator(
    config: GeneratorConfig,
    distribution: &str,
    usage: &str,
    workload: &str,
) -> ExperimentGenerator {
    ExperimentGenerator::new(
        config,
        DistributionScenario::from_yaml_str(distribution).unwrap(),
        UsageScenario::from_yaml_str(usage).unwrap(),
        WorkloadScenario::from_yaml_str(workload).unwrap(),
    )
    .unwrap()
}
