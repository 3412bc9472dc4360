//! Dry-run a job file against the simulated machine
//!
//! Every required part gets an unlimited feeder, the head carries the
//! requested number of nozzles, and boards are located at their nominal
//! origin. Recoverable failures either take the first offered recovery
//! action (`--skip-on-error`) or abort the job.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use pnp_sequencer::config::{validate_config, AppConfig, ConfigLoader, LogFormat, ENV_PREFIX};
use pnp_sequencer::machine::sim::{
    OperationLog, SimAlignment, SimFeeder, SimFiducialLocator, SimHead, SimNozzle,
    SimulatedMachine,
};
use pnp_sequencer::metrics::{self, init_tracing, MetricsCollector};
use pnp_sequencer::types::{Job, Location};
use pnp_sequencer::JobEngine;

/// PnP sequencer dry run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Job file (JSON)
    job: PathBuf,

    /// Configuration file (TOML, YAML or JSON); environment overrides still apply
    #[arg(long)]
    config: Option<PathBuf>,

    /// Nozzles on the simulated head
    #[arg(long, default_value = "2")]
    nozzles: usize,

    /// Take the first recovery action instead of aborting on recoverable failures
    #[arg(long)]
    skip_on_error: bool,

    /// Print the Prometheus exposition after the run
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::from_file_with_env(path, ENV_PREFIX)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConfigLoader::from_env().unwrap_or_else(|_| AppConfig::default()),
    };
    validate_config(&config)?;

    let collector = Arc::new(MetricsCollector::new());
    let format = match config.logging.format {
        LogFormat::Pretty => metrics::LogFormat::Pretty,
        LogFormat::Json => metrics::LogFormat::Json,
    };
    init_tracing(collector.clone(), &config.logging.level, format)?;

    let content = std::fs::read_to_string(&args.job)
        .with_context(|| format!("reading job {}", args.job.display()))?;
    let job: Job = serde_json::from_str(&content).context("parsing job file")?;

    let log = OperationLog::new();
    let machine = simulated_machine(&job, args.nozzles, &log);

    let mut engine = JobEngine::new(Arc::new(machine)).with_config(config.engine.clone());
    if config.metrics.enabled {
        engine = engine.with_metrics(collector.clone());
    }
    engine.initialize(job).await?;

    loop {
        match engine.next().await {
            Ok(true) => {}
            Ok(false) => break,
            Err(failure) => {
                let action = failure.actions.first().filter(|_| args.skip_on_error).cloned();
                match action {
                    Some(action) => {
                        warn!(error = %failure.error, action = %action, "recovering");
                        engine.next_with(Some(action)).await?;
                    }
                    None => {
                        engine.abort().await?;
                        return Err(failure).context("job aborted");
                    }
                }
            }
        }
    }

    let summary = engine.summary();
    info!(
        placed = summary.placed,
        skipped = summary.skipped,
        operations = log.entries().len(),
        "dry run finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.print_metrics {
        println!("{}", collector.export_metrics()?);
    }
    Ok(())
}

fn simulated_machine(job: &Job, nozzles: usize, log: &OperationLog) -> SimulatedMachine {
    let nozzles = (1..=nozzles.max(1))
        .map(|i| Arc::new(SimNozzle::new(format!("N{i}"), log)))
        .collect();
    let head = Arc::new(SimHead::new("H1", nozzles, log));

    let mut machine = SimulatedMachine::new(log)
        .with_head(head)
        .with_alignment(Arc::new(SimAlignment::new(log)))
        .with_fiducial_locator(Arc::new(SimFiducialLocator::new(log)));
    for (i, part) in job.required_parts().into_iter().enumerate() {
        let location = Location::xy(-20.0, 8.0 * i as f64);
        machine = machine.with_feeder(Arc::new(SimFeeder::new(
            format!("F{}", i + 1),
            part,
            location,
            log,
        )));
    }
    machine
}
