//! Shared experiment pipelines.
//!
//! Both experiments run the same steps:
//! load CSV -> (features) -> split at the boundary -> fit -> predict the test
//! window -> score. Printing and exports are left to the caller.

use tracing::info;

use crate::domain::{DemandSeries, ExperimentConfig, FeatureOptions, PredictionRow};
use crate::error::AppError;
use crate::features::engineer_features;
use crate::gbdt::{GbdtParams, GbdtRegressor};
use crate::io::ingest::{load_demand_csv, load_temperature_csv};
use crate::prophet::{ProphetModel, ProphetParams};
use crate::report::{evaluate, format_importance, format_run_summary};
use crate::split::{ensure_non_empty, split_non_empty};

/// Result of one experiment run.
#[derive(Debug, Clone)]
pub struct ExperimentOutput {
    pub score: f64,
    pub train_rows: usize,
    pub predictions: Vec<PredictionRow>,
}

/// Gradient-boosted trees on engineered features.
pub fn run_lgb(
    config: &ExperimentConfig,
    options: &FeatureOptions,
    params: &GbdtParams,
) -> Result<ExperimentOutput, AppError> {
    let series = load_demand_csv(&config.demand_csv())?.series;
    let temperature = if options.add_temperature_feats {
        Some(load_temperature_csv(&config.temperature_csv())?)
    } else {
        None
    };

    let frame = engineer_features(&series, options, temperature.as_deref())?;
    let split = split_non_empty(&frame, config.split_boundary)?;

    let mut model = GbdtRegressor::new(params.clone());
    model.fit_frame(&split.train)?;
    let predicted = model.predict_frame(&split.test)?;
    let score = evaluate(config.metric, &split.test.target, &predicted)?;

    info!(
        "{}",
        format_run_summary(
            "lgb",
            &split.train.timestamps,
            &split.test.timestamps,
            &split.train.feature_names(),
            config.metric,
            score,
        )
    );
    info!("split gain: {}", format_importance(&model.feature_importance()));

    Ok(ExperimentOutput {
        score,
        train_rows: split.train.len(),
        predictions: prediction_rows(&split.test.timestamps, &split.test.target, &predicted),
    })
}

/// Additive trend + seasonality model on the raw series.
pub fn run_prophet(config: &ExperimentConfig, params: &ProphetParams) -> Result<ExperimentOutput, AppError> {
    let series = load_demand_csv(&config.demand_csv())?.series;
    let (train, test) = series.split_at(config.split_boundary);
    ensure_non_empty(train.len(), test.len(), config.split_boundary)?;

    let model = ProphetModel::fit(&train, params)?;
    let test_timestamps = timestamps(&test);
    let actual: Vec<f64> = test.points().iter().map(|p| p.mw).collect();
    let predicted: Vec<f64> = model.predict(&test_timestamps)?.iter().map(|f| f.yhat).collect();
    let score = evaluate(config.metric, &actual, &predicted)?;

    info!(
        "{}",
        format_run_summary(
            "prophet",
            &timestamps(&train),
            &test_timestamps,
            &["ds".to_string()],
            config.metric,
            score,
        )
    );

    Ok(ExperimentOutput {
        score,
        train_rows: train.len(),
        predictions: prediction_rows(&test_timestamps, &actual, &predicted),
    })
}

fn timestamps(series: &DemandSeries) -> Vec<chrono::NaiveDateTime> {
    series.points().iter().map(|p| p.timestamp).collect()
}

fn prediction_rows(
    timestamps: &[chrono::NaiveDateTime],
    actual: &[f64],
    predicted: &[f64],
) -> Vec<PredictionRow> {
    timestamps
        .iter()
        .zip(actual.iter().zip(predicted))
        .map(|(&timestamp, (&actual, &predicted))| PredictionRow {
            timestamp,
            actual,
            predicted,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleConfig, generate_demand};
    use crate::domain::Metric;
    use crate::prophet::SeasonalityMode;
    use crate::io::export::write_demand_csv;
    use chrono::{Duration, NaiveDate};
    use std::fmt::Write as _;
    use std::path::PathBuf;

    /// Fresh data directory with ~18 months of synthetic demand around the default boundary.
    fn data_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pjme-pipeline-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("temperature")).unwrap();

        let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let points = generate_demand(&SampleConfig::new(start, 24 * 540, 3)).unwrap();
        write_demand_csv(&dir.join("PJME_hourly.csv"), &points).unwrap();

        let mut temps = String::from("DATE,NAME,high,low\n");
        for d in 0..540 {
            let date = start.date() + Duration::days(d);
            // Leave a gap so forward fill is exercised.
            if d % 17 == 5 {
                continue;
            }
            writeln!(temps, "{date},CHICAGO,{},{}", 40 + d % 50, 20 + d % 40).unwrap();
        }
        std::fs::write(dir.join("temperature").join("chicago.csv"), temps).unwrap();
        dir
    }

    fn config(dir: PathBuf, metric: Metric) -> ExperimentConfig {
        ExperimentConfig {
            data_dir: dir,
            split_boundary: crate::domain::default_split_boundary(),
            metric,
            export: None,
        }
    }

    #[test]
    fn lgb_with_all_features_beats_a_flat_forecast() {
        let dir = data_dir("lgb");
        let cfg = config(dir.clone(), Metric::Mae);
        let options = FeatureOptions {
            add_holiday_feats: true,
            add_temperature_feats: true,
        };
        let params = GbdtParams {
            n_estimators: 40,
            ..GbdtParams::default()
        };
        let out = run_lgb(&cfg, &options, &params).unwrap();

        // 2014-01-01 00:00 through 2015-01-01 00:00 inclusive.
        assert_eq!(out.train_rows, 365 * 24 + 1);
        assert_eq!(out.predictions.len(), 540 * 24 - out.train_rows);
        assert!(out.predictions.iter().all(|r| r.timestamp > cfg.split_boundary));

        let mean = out.predictions.iter().map(|r| r.actual).sum::<f64>() / out.predictions.len() as f64;
        let flat = out.predictions.iter().map(|r| (r.actual - mean).abs()).sum::<f64>()
            / out.predictions.len() as f64;
        assert!(out.score < flat, "score={} flat={flat}", out.score);

        // Same seed, same data: same score.
        let again = run_lgb(&cfg, &options, &params).unwrap();
        assert_eq!(out.score, again.score);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn prophet_tracks_the_synthetic_cycles() {
        let dir = data_dir("prophet");
        let params = ProphetParams {
            yearly_seasonality: SeasonalityMode::Order(2),
            weekly_seasonality: SeasonalityMode::Order(1),
            ..ProphetParams::default()
        };
        let out = run_prophet(&config(dir.clone(), Metric::Rmse), &params).unwrap();
        assert_eq!(out.train_rows, 365 * 24 + 1);
        // Hourly noise is 800 MW; the daily and weekly cycles are several thousand.
        assert!(out.score < 3_000.0, "rmse={}", out.score);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_files_and_empty_windows_map_to_exit_codes() {
        let missing = std::env::temp_dir().join("pjme-pipeline-does-not-exist");
        let err = run_prophet(&config(missing, Metric::Mae), &ProphetParams::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let dir = data_dir("empty-test");
        let mut cfg = config(dir.clone(), Metric::Mae);
        cfg.split_boundary = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(run_prophet(&cfg, &ProphetParams::default()).unwrap_err().exit_code(), 3);
        assert_eq!(
            run_lgb(&cfg, &FeatureOptions::default(), &GbdtParams::default()).unwrap_err().exit_code(),
            3
        );
        let _ = std::fs::remove_dir_all(dir);
    }
}
