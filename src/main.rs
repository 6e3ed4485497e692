use std::cell::RefCell;
use std::env;
use std::error::Error;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use log::info;

use kubernetriks_provisioner::config::{read_yaml, ProvisionerConfig};
use kubernetriks_provisioner::metrics::collector::MetricsCollector;
use kubernetriks_provisioner::metrics::printer::{print_decision, print_metrics};
use kubernetriks_provisioner::provisioner::{Catalog, SchedulingEngine, SchedulingInput};

#[derive(Parser)]
struct Args {
    #[clap(short, long)]
    config_file: std::path::PathBuf,
    #[clap(long)]
    catalog_file: std::path::PathBuf,
    #[clap(short, long)]
    input_file: std::path::PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    // log level INFO by default
    let mut env_logger_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        env_logger_builder.filter_level(log::LevelFilter::Info);
    }
    env_logger_builder.init();

    let args = Args::parse();

    info!("Path to config file: {:?}", args.config_file);
    info!("Path to catalog file: {:?}", args.catalog_file);
    info!("Path to input file: {:?}", args.input_file);

    let config = ProvisionerConfig::from_file(&args.config_file)?;
    let catalog: Catalog = read_yaml(&args.catalog_file)?;
    let mut input: SchedulingInput = read_yaml(&args.input_file)?;
    input.options = config.options.clone();

    let metrics = Rc::new(RefCell::new(MetricsCollector::new()));
    let engine = SchedulingEngine::new(Arc::new(catalog), &config, metrics.clone())?;
    let decision = engine.compute_scheduling_decision(&input)?;

    print_decision(&decision, config.decision_format, &mut std::io::stdout())?;
    if let Some(printer_config) = config.metrics_printer.as_ref() {
        print_metrics(&metrics.borrow(), printer_config)?;
    }
    Ok(())
}
