use clap::Parser;
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use cloudfactory::config::{GeneratorConfig, Objective};
use cloudfactory::generator::ExperimentGenerator;

/// Log files are rotated past this size.
const LOG_FILE_MAX_BYTES: usize = 10 * 1024 * 1024;
const LOG_FILES_KEPT: usize = 3;

#[derive(Parser)]
#[clap(about = "Generates a fleet of VM descriptors from scenario documents")]
struct Args {
    #[clap(short, long)]
    config_file: PathBuf,
    /// Overrides the seed of the config file
    #[clap(short, long)]
    seed: Option<u64>,
    /// CPU budget (cores) of the initial fleet, to use with --mem
    #[clap(long, requires = "mem", conflicts_with = "vm")]
    cpu: Option<u64>,
    /// Memory budget (GB) of the initial fleet, to use with --cpu
    #[clap(long, requires = "cpu")]
    mem: Option<f64>,
    /// VM count of the initial fleet
    #[clap(long)]
    vm: Option<usize>,
    /// Json file the fleet is exported to
    #[clap(long)]
    export: Option<PathBuf>,
    /// Json file a fleet is reloaded from instead of being generated
    #[clap(long)]
    load: Option<PathBuf>,
}

fn init_logger(logs_filepath: Option<&str>) {
    // log level INFO by default
    let mut env_logger_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        env_logger_builder.filter_level(log::LevelFilter::Info);
    }
    if let Some(path) = logs_filepath {
        let log_file = FileRotate::new(
            path,
            AppendCount::new(LOG_FILES_KEPT),
            ContentLimit::Bytes(LOG_FILE_MAX_BYTES),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        env_logger_builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    env_logger_builder.init();
}

fn apply_overrides(config: &mut GeneratorConfig, args: &Args) {
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let (Some(cpu), Some(mem)) = (args.cpu, args.mem) {
        config.objective = Some(Objective::Budget { cpu, mem });
    }
    if let Some(count) = args.vm {
        config.objective = Some(Objective::VmCount { count });
    }
    if args.export.is_some() {
        config.export_path = args.export.clone();
    }
    if args.load.is_some() {
        config.load_path = args.load.clone();
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match GeneratorConfig::from_file(&args.config_file) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("could not load config file {:?}: {}", args.config_file, err);
            return ExitCode::FAILURE;
        }
    };
    apply_overrides(&mut config, &args);
    init_logger(config.logs_filepath.as_deref());

    info!("Path to config file: {:?}", args.config_file);
    info!("Experiment {:?} with seed {}", config.sim_name, config.seed);

    let result =
        ExperimentGenerator::from_config(&config).and_then(|mut generator| generator.run());
    match result {
        Ok(fleet) => {
            info!("Fleet of {} vm ready", fleet.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
