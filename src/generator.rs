//! Represents entry point for fleet generation and the scope by scope growth of the fleet.

use std::time::Instant;

use log::info;

use crate::config::{GeneratorConfig, Objective, Temporality};
use crate::core::flavor_builder::FlavorDistributionBuilder;
use crate::core::usage_builder::UsageBuilder;
use crate::core::vm::{Vm, VmIdAllocator};
use crate::core::workload_builder::WorkloadBuilder;
use crate::error::{GeneratorError, Result};
use crate::metrics::collector::FleetSummary;
use crate::metrics::printer::print_fleet_summary;
use crate::persistence::{export_fleet, import_fleet};
use crate::random::Random;
use crate::scenario::distribution::DistributionScenario;
use crate::scenario::interface::ScenarioDocument;
use crate::scenario::usage::UsageScenario;
use crate::scenario::workload::WorkloadScenario;

pub struct ExperimentGenerator {
    pub config: GeneratorConfig,
    pub random: Random,
    pub allocator: VmIdAllocator,

    flavor_builder: FlavorDistributionBuilder,
    usage_scenario: UsageScenario,
    workload_builder: WorkloadBuilder,
}

impl ExperimentGenerator {
    pub fn new(
        config: GeneratorConfig,
        distribution: DistributionScenario,
        usage: UsageScenario,
        workload: WorkloadScenario,
    ) -> Result<Self> {
        config.temporality.validate()?;
        let workload_builder = WorkloadBuilder::new(workload, config.temporality.slice_duration)?;
        Ok(Self {
            random: Random::new(config.seed),
            allocator: VmIdAllocator::new(),
            flavor_builder: FlavorDistributionBuilder::new(distribution),
            usage_scenario: usage,
            workload_builder,
            config,
        })
    }

    /// Loads the three scenario documents the config points to.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        info!("Loading flavor distribution from {:?}", config.scenario.distribution);
        let distribution = DistributionScenario::from_file(&config.scenario.distribution)?;
        info!("Loading usage profiles from {:?}", config.scenario.usage);
        let usage = UsageScenario::from_file(&config.scenario.usage)?;
        info!("Loading workload catalogue from {:?}", config.scenario.workload);
        let workload = WorkloadScenario::from_file(&config.scenario.workload)?;
        Self::new(config.clone(), distribution, usage, workload)
    }

    pub fn temporality(&self) -> &Temporality {
        &self.config.temporality
    }

    pub fn flavor_builder(&self) -> &FlavorDistributionBuilder {
        &self.flavor_builder
    }

    pub fn workload_builder(&self) -> &WorkloadBuilder {
        &self.workload_builder
    }

    /// Builds the initial fleet from `objective`, then grows it scope after scope with the VMs
    /// the usage profiles ask for.
    pub fn generate(&mut self, objective: Option<&Objective>) -> Result<Vec<Vm>> {
        let objective = objective.ok_or_else(|| {
            GeneratorError::MissingParameter("objective (cpu/mem budget or vm count)".to_string())
        })?;
        let temporality = self.config.temporality;
        let start = Instant::now();

        // initial populations are captured per run
        let mut usage_builder = UsageBuilder::new(
            self.usage_scenario.clone(),
            temporality.slices_per_scope(),
            temporality.number_of_scopes,
        );

        let mut fleet = match *objective {
            Objective::Budget { cpu, mem } => {
                self.flavor_builder
                    .generate_from_budget(cpu, mem, &mut self.allocator)?
            }
            Objective::VmCount { count } => self
                .flavor_builder
                .generate_from_count(count, &mut self.allocator)?,
        };
        usage_builder.attribute_usage_to_vm_list(&mut fleet, 0, &mut self.random)?;
        self.workload_builder
            .attribute_workload_commands_to_vm_list(&mut fleet, &mut self.random)?;

        let additional = usage_builder.overall_count_to_create()?;
        if additional == 0 {
            info!("No arrival expected, fleet stays on a single scope");
        } else {
            for scope in 1..temporality.number_of_scopes {
                let mut newcomers = self
                    .flavor_builder
                    .generate_from_count(additional, &mut self.allocator)?;
                usage_builder.attribute_usage_to_vm_list(&mut newcomers, scope, &mut self.random)?;
                self.workload_builder
                    .attribute_workload_commands_to_vm_list(&mut newcomers, &mut self.random)?;
                info!("Scope {}: {} vm added", scope, newcomers.len());
                fleet.extend(newcomers);
            }
        }

        info!(
            "Generated {} vm over {} scopes in {:.2?}",
            fleet.len(),
            temporality.number_of_scopes,
            start.elapsed()
        );
        Ok(fleet)
    }

    /// Reloads or generates the fleet, then exports it and writes its summary when configured.
    pub fn run(&mut self) -> Result<Vec<Vm>> {
        let fleet = match self.config.load_path.clone() {
            Some(path) => import_fleet(&path, &mut self.allocator)?,
            None => {
                let objective = self.config.objective;
                self.generate(objective.as_ref())?
            }
        };

        if let Some(path) = &self.config.export_path {
            export_fleet(path, &fleet)?;
        }
        if let Some(summary_config) = &self.config.fleet_summary {
            print_fleet_summary(&FleetSummary::collect(&fleet), summary_config)?;
        }
        Ok(fleet)
    }
}
