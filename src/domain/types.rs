//! Shared domain types.
//!
//! Everything here is plain data: loading lives in `io`, derivations in `features`,
//! and models only ever see a `FeatureFrame` (or a `DemandSeries` for the additive model).

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Boundary between the training and test windows: rows at or before it train.
pub fn default_split_boundary() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2015, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// One hourly demand observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandPoint {
    pub timestamp: NaiveDateTime,
    pub mw: f64,
}

/// Hourly demand sorted ascending by timestamp, one row per timestamp.
#[derive(Debug, Clone, Default)]
pub struct DemandSeries {
    points: Vec<DemandPoint>,
}

impl DemandSeries {
    /// Sort by timestamp and drop repeated timestamps.
    ///
    /// The sort is stable, so the surviving row for a duplicated timestamp is the
    /// one that appeared first in the input. Returns the series and the number of
    /// dropped rows.
    pub fn from_unsorted(mut points: Vec<DemandPoint>) -> (Self, usize) {
        let before = points.len();
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);
        let dropped = before - points.len();
        (Self { points }, dropped)
    }

    pub fn points(&self) -> &[DemandPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Rows with `timestamp <= boundary` and rows with `timestamp > boundary`.
    pub fn split_at(&self, boundary: NaiveDateTime) -> (DemandSeries, DemandSeries) {
        let (train, test): (Vec<DemandPoint>, Vec<DemandPoint>) =
            self.points.iter().copied().partition(|p| p.timestamp <= boundary);
        (Self { points: train }, Self { points: test })
    }
}

/// Daily temperature high/low. Either reading may be missing in the source file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub date: NaiveDate,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

/// A named feature column. `None` marks a null cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Column-oriented model input: one row per timestamp plus the demand target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    pub timestamps: Vec<NaiveDateTime>,
    pub target: Vec<f64>,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureFrame {
    /// Start a frame with no feature columns from a demand series.
    pub fn from_series(series: &DemandSeries) -> Self {
        Self {
            timestamps: series.points().iter().map(|p| p.timestamp).collect(),
            target: series.points().iter().map(|p| p.mw).collect(),
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Append a column, replacing an existing column of the same name in place.
    ///
    /// Replacing keeps the column order stable when a derivation runs twice.
    pub fn set_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), AppError> {
        if values.len() != self.len() {
            return Err(AppError::input(format!(
                "Column '{name}' has {} values but the frame has {} rows.",
                values.len(),
                self.len()
            )));
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(FeatureColumn {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    /// Keep only the rows for which `keep` returns true, preserving order.
    pub fn filter_rows(&self, keep: impl Fn(NaiveDateTime) -> bool) -> FeatureFrame {
        let idx: Vec<usize> = self
            .timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| keep(ts).then_some(i))
            .collect();

        FeatureFrame {
            timestamps: idx.iter().map(|&i| self.timestamps[i]).collect(),
            target: idx.iter().map(|&i| self.target[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| FeatureColumn {
                    name: c.name.clone(),
                    values: idx.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }

    /// Row-major feature matrix with nulls encoded as `NaN`.
    pub fn to_row_major(&self) -> Vec<f64> {
        let n_cols = self.columns.len();
        let mut out = vec![f64::NAN; self.len() * n_cols];
        for (j, col) in self.columns.iter().enumerate() {
            for (i, v) in col.values.iter().enumerate() {
                if let Some(v) = v {
                    out[i * n_cols + j] = *v;
                }
            }
        }
        out
    }
}

/// Accuracy metric printed at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Mae,
    Rmse,
}

impl Metric {
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Mae => "MAE",
            Metric::Rmse => "RMSE",
        }
    }
}

/// Optional feature groups for the tree experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureOptions {
    pub add_holiday_feats: bool,
    pub add_temperature_feats: bool,
}

/// Settings shared by every experiment.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub data_dir: PathBuf,
    pub split_boundary: NaiveDateTime,
    pub metric: Metric,
    pub export: Option<PathBuf>,
}

impl ExperimentConfig {
    pub fn demand_csv(&self) -> PathBuf {
        self.data_dir.join("PJME_hourly.csv")
    }

    pub fn temperature_csv(&self) -> PathBuf {
        self.data_dir.join("temperature").join("chicago.csv")
    }
}

/// One exported test-window prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRow {
    pub timestamp: NaiveDateTime,
    pub actual: f64,
    pub predicted: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn series_sorts_and_drops_duplicate_timestamps() {
        let points = vec![
            DemandPoint { timestamp: ts(2014, 1, 1, 2), mw: 3.0 },
            DemandPoint { timestamp: ts(2014, 1, 1, 1), mw: 1.0 },
            DemandPoint { timestamp: ts(2014, 1, 1, 2), mw: 9.0 },
        ];
        let (series, dropped) = DemandSeries::from_unsorted(points);
        assert_eq!(dropped, 1);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].mw, 1.0);
        assert_eq!(series.points()[1].mw, 3.0);
    }

    #[test]
    fn set_column_replaces_in_place() {
        let (series, _) = DemandSeries::from_unsorted(vec![
            DemandPoint { timestamp: ts(2014, 1, 1, 0), mw: 1.0 },
            DemandPoint { timestamp: ts(2014, 1, 1, 1), mw: 2.0 },
        ]);
        let mut frame = FeatureFrame::from_series(&series);
        frame.set_column("a", vec![Some(1.0), None]).unwrap();
        frame.set_column("b", vec![Some(2.0), Some(2.0)]).unwrap();
        frame.set_column("a", vec![Some(5.0), Some(6.0)]).unwrap();
        assert_eq!(frame.feature_names(), vec!["a", "b"]);
        assert_eq!(frame.column("a").unwrap().values, vec![Some(5.0), Some(6.0)]);
        assert!(frame.set_column("c", vec![Some(1.0)]).is_err());
    }

    #[test]
    fn row_major_encodes_nulls_as_nan() {
        let (series, _) = DemandSeries::from_unsorted(vec![
            DemandPoint { timestamp: ts(2014, 1, 1, 0), mw: 1.0 },
            DemandPoint { timestamp: ts(2014, 1, 1, 1), mw: 2.0 },
        ]);
        let mut frame = FeatureFrame::from_series(&series);
        frame.set_column("a", vec![Some(1.0), None]).unwrap();
        frame.set_column("b", vec![Some(3.0), Some(4.0)]).unwrap();
        let m = frame.to_row_major();
        assert_eq!(m[0], 1.0);
        assert_eq!(m[1], 3.0);
        assert!(m[2].is_nan());
        assert_eq!(m[3], 4.0);
    }
}
