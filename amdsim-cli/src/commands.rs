use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use amdsim_config::{EngineType, ProtocolSpecification, RunConfig, RunParameters};
use amdsim_engine::{ResultsSummary, SimulationResults, SimulationRunner};
use amdsim_telemetry::{EventLogger, MetricsRecorder};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use opentelemetry::KeyValue;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "amdsim", version, about)]
pub struct Cli {
    /// Run configuration file (defaults, then this file, then AMDSIM_* variables)
    #[arg(long, global = true, default_value = amdsim_config::run::DEFAULT_RUN_CONFIG)]
    pub config: PathBuf,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one simulation and write results and audit trail
    Simulate(SimulateArgs),
    /// Validate a protocol document
    Validate(ProtocolArgs),
    /// Write the canonical form of a protocol document
    ExportProtocol(ExportArgs),
    /// Run a protocol over a range of seeds in parallel
    Sweep(SweepArgs),
}

/// Run parameters that override the run configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// `abs` (agent-based) or `des` (discrete-event)
    #[arg(long)]
    pub engine: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub patients: Option<i64>,
    #[arg(long)]
    pub years: Option<f64>,
    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProtocolArgs {
    /// Protocol YAML document
    pub protocol: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    pub protocol: PathBuf,
    #[command(flatten)]
    pub run: RunOverrides,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Fail unless the result fingerprint equals this value
    #[arg(long)]
    pub expect_fingerprint: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    pub protocol: PathBuf,
    /// Destination file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    pub protocol: PathBuf,
    #[command(flatten)]
    pub run: RunOverrides,
    /// First seed of the sweep
    #[arg(long, default_value_t = 1)]
    pub first_seed: u64,
    /// Number of consecutive seeds
    #[arg(long, default_value_t = 10)]
    pub seeds: u64,
    /// Run both engines per seed and require identical fingerprints
    #[arg(long)]
    pub compare_engines: bool,
    /// Parallel workers; defaults to the number of CPUs
    #[arg(long)]
    pub workers: Option<usize>,
}

pub fn init_logging(json: bool) -> anyhow::Result<()> {
    let result = if json {
        EventLogger::init_json()
    } else {
        EventLogger::init()
    };
    result.map_err(|err| CliError::Logging(err.to_string()).into())
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let metrics = MetricsRecorder::new().context("creating metrics registry")?;
    let run_config = RunConfig::load_from(&cli.config)
        .with_context(|| format!("loading run configuration {}", cli.config.display()))?;

    match cli.command {
        Commands::Simulate(args) => {
            simulate(args, &run_config, metrics.clone())?;
        }
        Commands::Validate(args) => validate(&args.protocol)?,
        Commands::ExportProtocol(args) => export_protocol(&args)?,
        Commands::Sweep(args) => {
            sweep(args, &run_config, metrics.clone()).await?;
        }
    }

    if cli.metrics {
        println!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

fn load_protocol(path: &Path) -> anyhow::Result<Arc<ProtocolSpecification>> {
    let spec = ProtocolSpecification::load(path)
        .with_context(|| format!("loading protocol {}", path.display()))?;
    Ok(Arc::new(spec))
}

/// Applies command line overrides on top of the run configuration.
fn resolve(
    config: &RunConfig,
    overrides: &RunOverrides,
    seed: Option<u64>,
) -> anyhow::Result<(RunParameters, PathBuf)> {
    let engine = overrides.engine.as_deref().unwrap_or(&config.engine);
    let params = RunParameters::new(
        engine.parse::<EngineType>()?,
        overrides.patients.unwrap_or(config.n_patients),
        overrides.years.unwrap_or(config.duration_years),
        seed.unwrap_or(config.seed),
        config.start_date,
    )?;
    let output = overrides
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));
    Ok((params, output))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn print_summary(summary: &ResultsSummary) {
    println!(
        "{engine} seed={seed} patients={patients} visits={visits} injections={injections} \
         final_vision={mean:.1}±{std:.1} discontinued={rate:.1}% fingerprint={fp}",
        engine = summary.engine,
        seed = summary.seed,
        patients = summary.patient_count,
        visits = summary.total_visits,
        injections = summary.total_injections,
        mean = summary.final_vision_mean,
        std = summary.final_vision_std,
        rate = summary.discontinuation_rate * 100.0,
        fp = summary.fingerprint.get(..16).unwrap_or(&summary.fingerprint),
    );
}

pub fn simulate(
    args: SimulateArgs,
    config: &RunConfig,
    metrics: MetricsRecorder,
) -> anyhow::Result<SimulationResults> {
    let spec = load_protocol(&args.protocol)?;
    let (params, output) = resolve(config, &args.run, args.seed)?;

    let mut runner = SimulationRunner::new(spec)?
        .with_metrics(metrics)
        .with_start_date(params.start_date);
    let results = runner.run_with(params)?;

    let stem = format!("{}_{}", params.engine, params.seed);
    write_json(&output.join(format!("results_{stem}.json")), &results)?;
    write_json(&output.join(format!("summary_{stem}.json")), &results.summary())?;
    let audit_path = output.join(format!("audit_{stem}.json"));
    fs::create_dir_all(&output)?;
    fs::write(&audit_path, runner.audit().to_json()?)?;
    info!(output = %output.display(), "Results written");

    print_summary(&results.summary());
    if let Some(expected) = args.expect_fingerprint {
        anyhow::ensure!(
            expected == results.fingerprint(),
            "fingerprint mismatch: expected {expected}, got {}",
            results.fingerprint()
        );
    }
    Ok(results)
}

pub fn validate(path: &Path) -> anyhow::Result<()> {
    let spec = load_protocol(path)?;
    let params = spec.parameters();
    println!("{} is valid", path.display());
    println!("  protocol : {} v{} by {}", params.name, params.version, params.author);
    println!(
        "  intervals: {}-{} days (+{} / -{})",
        params.min_interval_days,
        params.max_interval_days,
        params.extension_days,
        params.shortening_days
    );
    println!("  overlays : {:?}", spec.clinical_improvements().enabled_names());
    println!("  checksum : {}", spec.checksum());
    EventLogger::log_event(
        "protocol_validated",
        vec![
            KeyValue::new("protocol", params.name.clone()),
            KeyValue::new("checksum", spec.checksum().to_string()),
        ],
    );
    Ok(())
}

pub fn export_protocol(args: &ExportArgs) -> anyhow::Result<()> {
    let spec = load_protocol(&args.protocol)?;
    match &args.output {
        Some(path) => spec.save(path)?,
        None => print!("{}", spec.to_yaml()?),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub protocol: String,
    pub checksum: String,
    pub runs: Vec<ResultsSummary>,
}

pub async fn sweep(
    args: SweepArgs,
    config: &RunConfig,
    metrics: MetricsRecorder,
) -> anyhow::Result<SweepReport> {
    let spec = load_protocol(&args.protocol)?;
    let (params, output) = resolve(config, &args.run, Some(args.first_seed))?;
    let workers = args.workers.unwrap_or_else(num_cpus::get).max(1);
    let permits = Arc::new(Semaphore::new(workers));
    info!(seeds = args.seeds, workers, "Starting sweep");

    let engines: Vec<EngineType> = if args.compare_engines {
        vec![EngineType::Abs, EngineType::Des]
    } else {
        vec![params.engine]
    };

    let mut handles = Vec::new();
    for seed in args.first_seed..args.first_seed.saturating_add(args.seeds) {
        let permit = permits.clone().acquire_owned().await?;
        let spec = spec.clone();
        let metrics = metrics.clone();
        let engines = engines.clone();
        handles.push(tokio::task::spawn_blocking(
            move || -> anyhow::Result<Vec<ResultsSummary>> {
                let _permit = permit;
                let mut runner = SimulationRunner::new(spec)?
                    .with_metrics(metrics)
                    .with_start_date(params.start_date);
                let mut summaries = Vec::new();
                for engine in engines {
                    let results = runner.run_with(RunParameters {
                        engine,
                        ..params.with_seed(seed)
                    })?;
                    summaries.push(results.summary());
                }
                Ok(summaries)
            },
        ));
    }

    let mut runs = Vec::new();
    for handle in handles {
        let summaries = handle.await.map_err(CliError::from)??;
        if let [abs, des] = summaries.as_slice() {
            if abs.fingerprint != des.fingerprint {
                warn!(seed = abs.seed, "Engine fingerprints differ");
                return Err(CliError::EngineMismatch {
                    seed: abs.seed,
                    abs: abs.fingerprint.clone(),
                    des: des.fingerprint.clone(),
                }
                .into());
            }
        }
        runs.extend(summaries);
    }

    for summary in &runs {
        print_summary(summary);
    }
    let report = SweepReport {
        protocol: spec.name().to_string(),
        checksum: spec.checksum().to_string(),
        runs,
    };
    write_json(&output.join("sweep.json"), &report)?;
    Ok(report)
}
