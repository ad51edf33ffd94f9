//! CSV writers: test-window predictions and synthetic demand files.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{DemandPoint, PredictionRow};
use crate::error::AppError;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Demand row in the same shape the ingest reads.
#[derive(Debug, Serialize)]
struct DemandRecord {
    #[serde(rename = "Datetime")]
    datetime: String,
    #[serde(rename = "PJME_MW")]
    mw: f64,
}

/// Write `timestamp,actual,predicted` rows to `path`.
pub fn write_predictions_csv(path: &Path, rows: &[PredictionRow]) -> Result<(), AppError> {
    let file = create(path)?;
    write_predictions(file, rows)
}

pub fn write_predictions<W: Write>(writer: W, rows: &[PredictionRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::input(format!("Failed to write predictions row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush predictions CSV: {e}")))
}

/// Write a demand series as `Datetime,PJME_MW`.
pub fn write_demand_csv(path: &Path, points: &[DemandPoint]) -> Result<(), AppError> {
    let file = create(path)?;
    write_demand(file, points)
}

pub fn write_demand<W: Write>(writer: W, points: &[DemandPoint]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(writer);
    for p in points {
        let record = DemandRecord {
            datetime: p.timestamp.format(DATETIME_FORMAT).to_string(),
            mw: p.mw,
        };
        writer
            .serialize(record)
            .map_err(|e| AppError::input(format!("Failed to write demand row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush demand CSV: {e}")))
}

fn create(path: &Path) -> Result<File, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    File::create(path).map_err(|e| AppError::input(format!("Failed to create '{}': {e}", path.display())))
}
