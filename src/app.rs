//! Top-level application orchestration.
//!
//! `src/main.rs` only maps errors to exit codes; this module sets up logging,
//! parses the CLI and hands each subcommand to its pipeline.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, LgbArgs, ProphetArgs, SampleArgs};
use crate::data::{SampleConfig, generate_demand};
use crate::error::AppError;
use crate::report::format_metric;

pub mod pipeline;

/// Entry point for the `pjme` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Lgb(args) => handle_lgb(args),
        Command::Prophet(args) => handle_prophet(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Logs go to stderr; stdout is reserved for the metric.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_lgb(args: LgbArgs) -> Result<(), AppError> {
    let config = args.common.experiment_config();
    let output = pipeline::run_lgb(&config, &args.feature_options(), &args.gbdt_params())?;
    finish(&config, &output)
}

fn handle_prophet(args: ProphetArgs) -> Result<(), AppError> {
    let config = args.common.experiment_config();
    let output = pipeline::run_prophet(&config, &args.prophet_params())?;
    finish(&config, &output)
}

fn finish(config: &crate::domain::ExperimentConfig, output: &pipeline::ExperimentOutput) -> Result<(), AppError> {
    if let Some(path) = &config.export {
        crate::io::export::write_predictions_csv(path, &output.predictions)?;
        info!(path = %path.display(), rows = output.predictions.len(), "wrote predictions");
    }
    println!("{}", format_metric(output.score));
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig::new(args.start.and_time(chrono::NaiveTime::MIN), args.hours, args.seed);
    let points = generate_demand(&config)?;
    crate::io::export::write_demand_csv(&args.out, &points)?;
    println!("wrote {} rows to {}", points.len(), args.out.display());
    Ok(())
}
