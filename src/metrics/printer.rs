use std::collections::BTreeMap;
use std::str::FromStr;
use std::{fs::File, io::Write};

use log::info;
use prettytable::{row, Table};
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};
use crate::metrics::collector::{EstimatorWrapper, FleetSummary};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    #[default]
    Json,
    PrettyTable,
}

impl FromStr for OutputFormat {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::PrettyTable),
            other => Err(GeneratorError::InvalidOutputTarget(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FleetSummaryConfig {
    /// `json` or `table`
    pub format: String,
    pub output_file: std::path::PathBuf,
}

pub fn print_fleet_summary(summary: &FleetSummary, config: &FleetSummaryConfig) -> Result<()> {
    let format = OutputFormat::from_str(&config.format)?;
    let mut summary_file = File::create(&config.output_file)?;
    match format {
        OutputFormat::PrettyTable => {
            print_fleet_summary_as_pretty_table(summary, &mut summary_file)?
        }
        OutputFormat::Json => print_fleet_summary_as_json(summary, &mut summary_file)?,
    }
    info!("Fleet summary written to {:?}", config.output_file);
    Ok(())
}

pub fn print_fleet_summary_as_pretty_table(
    summary: &FleetSummary,
    output: &mut impl Write,
) -> Result<()> {
    let mut aggregated_table = Table::new();
    aggregated_table.add_row(row!["Metric", "Count"]);
    aggregated_table.add_row(row!["Total VMs", summary.vm_count]);
    aggregated_table.add_row(row!["Total vcpu", summary.total_vcpu]);
    aggregated_table.add_row(row!["Total memory (GB)", summary.total_mem]);
    aggregated_table.add_row(row!["Periodic VMs", summary.periodic_vms]);
    aggregated_table.add_row(row!["Short lived VMs", summary.short_lived_vms]);
    aggregated_table.add_row(row!["Postponed VMs", summary.postponed_vms]);
    aggregated_table.add_row(row!["VMs without workload", summary.unassigned_vms]);

    let mut categories_table = Table::new();
    categories_table.add_row(row!["Category", "Name", "VMs"]);
    for (profile, count) in summary.vms_per_profile.iter() {
        categories_table.add_row(row!["Profile", profile, count]);
    }
    for (workload, count) in summary.vms_per_workload.iter() {
        categories_table.add_row(row!["Workload", workload, count]);
    }

    let mut stats_table = Table::new();
    stats_table.add_row(row!["Metric", "Min", "Max", "Mean", "Variance"]);
    for (name, stats) in [
        ("Usage target (%)", &summary.usage_stats),
        ("Short lifetime (slices)", &summary.lifetime_stats),
    ] {
        stats_table.add_row(row![
            name,
            stats.min(),
            stats.max(),
            stats.mean(),
            stats.population_variance()
        ]);
    }

    aggregated_table.print(output)?;
    categories_table.print(output)?;
    stats_table.print(output)?;
    Ok(())
}

#[derive(Serialize)]
struct FleetSummaryJSON<'a> {
    counters: Counters<'a>,
    stats: Stats,
}

#[derive(Serialize)]
struct Counters<'a> {
    vm_count: u64,
    total_vcpu: u64,
    total_mem: f64,
    periodic_vms: u64,
    short_lived_vms: u64,
    postponed_vms: u64,
    unassigned_vms: u64,
    vms_per_profile: &'a BTreeMap<String, u64>,
    vms_per_workload: &'a BTreeMap<String, u64>,
}

#[derive(Serialize)]
struct Stats {
    usage: EstimationStats,
    short_lifetime: EstimationStats,
}

#[derive(Serialize)]
struct EstimationStats {
    min: f64,
    max: f64,
    mean: f64,
    variance: f64,
}

impl From<&EstimatorWrapper> for EstimationStats {
    fn from(stats: &EstimatorWrapper) -> Self {
        Self {
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            variance: stats.population_variance(),
        }
    }
}

pub fn print_fleet_summary_as_json(summary: &FleetSummary, output: &mut impl Write) -> Result<()> {
    let json = FleetSummaryJSON {
        counters: Counters {
            vm_count: summary.vm_count,
            total_vcpu: summary.total_vcpu,
            total_mem: summary.total_mem,
            periodic_vms: summary.periodic_vms,
            short_lived_vms: summary.short_lived_vms,
            postponed_vms: summary.postponed_vms,
            unassigned_vms: summary.unassigned_vms,
            vms_per_profile: &summary.vms_per_profile,
            vms_per_workload: &summary.vms_per_workload,
        },
        stats: Stats {
            usage: EstimationStats::from(&summary.usage_stats),
            short_lifetime: EstimationStats::from(&summary.lifetime_stats),
        },
    };

    let serialized_json = serde_json::to_string_pretty(&json)?;
    output.write_all(serialized_json.as_bytes())?;
    Ok(())
}
