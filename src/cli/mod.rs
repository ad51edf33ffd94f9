//! Command-line parsing for the PJME forecasting experiments.
//!
//! Parsing stays separate from the pipelines: subcommand args are turned into
//! plain config structs (`ExperimentConfig`, `GbdtParams`, `ProphetParams`)
//! before anything is loaded.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{ExperimentConfig, FeatureOptions, Metric, default_split_boundary};
use crate::gbdt::GbdtParams;
use crate::prophet::{ProphetParams, SeasonalityMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pjme", version, about = "PJM East hourly demand forecasting experiments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gradient-boosted trees on calendar (and optional holiday/temperature) features.
    // `-h` belongs to the holiday flag, so help is long-only here.
    #[command(disable_help_flag = true)]
    Lgb(LgbArgs),
    /// Additive trend + seasonality model on the raw series.
    Prophet(ProphetArgs),
    /// Write a synthetic PJME-shaped demand CSV.
    Sample(SampleArgs),
}

/// Options shared by both experiments.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Directory holding `PJME_hourly.csv` and `temperature/chicago.csv`.
    #[arg(long, env = "PJME_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// First day of the test window; rows at or before its midnight are training rows.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub split_date: Option<NaiveDate>,

    /// Accuracy metric printed on stdout.
    #[arg(long, value_enum, default_value_t = Metric::Mae)]
    pub metric: Metric,

    /// Write `timestamp,actual,predicted` for the test rows.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

impl CommonArgs {
    pub fn split_boundary(&self) -> NaiveDateTime {
        self.split_date
            .map(|d| d.and_time(chrono::NaiveTime::MIN))
            .unwrap_or_else(default_split_boundary)
    }

    pub fn experiment_config(&self) -> ExperimentConfig {
        ExperimentConfig {
            data_dir: self.data_dir.clone(),
            split_boundary: self.split_boundary(),
            metric: self.metric,
            export: self.export.clone(),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct LgbArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Add the US federal holiday indicator.
    #[arg(short = 'h', long)]
    pub add_holiday_feats: bool,

    /// Add daily high/low temperature columns.
    #[arg(short = 't', long = "add-temerature-feats", alias = "add-temperature-feats")]
    pub add_temperature_feats: bool,

    /// Number of boosting rounds.
    #[arg(long, default_value_t = 100)]
    pub n_estimators: usize,

    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,

    /// Maximum leaves per tree.
    #[arg(long, default_value_t = 31)]
    pub num_leaves: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Worker threads for training; -1 uses every core.
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub n_jobs: i32,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl LgbArgs {
    pub fn feature_options(&self) -> FeatureOptions {
        FeatureOptions {
            add_holiday_feats: self.add_holiday_feats,
            add_temperature_feats: self.add_temperature_feats,
        }
    }

    pub fn gbdt_params(&self) -> GbdtParams {
        GbdtParams {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            num_leaves: self.num_leaves,
            seed: self.seed,
            n_jobs: self.n_jobs,
            ..GbdtParams::default()
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ProphetArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Fourier order of the yearly seasonality (0 disables).
    #[arg(long, default_value_t = 2)]
    pub yearly_order: u32,

    /// Fourier order of the weekly seasonality (0 disables).
    #[arg(long, default_value_t = 1)]
    pub weekly_order: u32,
}

impl ProphetArgs {
    pub fn prophet_params(&self) -> ProphetParams {
        ProphetParams {
            yearly_seasonality: SeasonalityMode::Order(self.yearly_order),
            weekly_seasonality: SeasonalityMode::Order(self.weekly_order),
            ..ProphetParams::default()
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV", default_value = "data/PJME_hourly.csv")]
    pub out: PathBuf,

    /// First timestamp (`YYYY-MM-DD`, midnight).
    #[arg(long, default_value = "2012-01-01")]
    pub start: NaiveDate,

    /// Number of hourly rows.
    #[arg(long, default_value_t = 24 * 365 * 4)]
    pub hours: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
