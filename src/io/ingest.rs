//! CSV ingest for the demand series and the daily temperature table.
//!
//! Demand files carry `Datetime,PJME_MW`; temperature files carry
//! `DATE,NAME,high,low`. Header matching is case-insensitive and tolerant of a
//! UTF-8 BOM. A malformed row aborts the load with its line number.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{DemandPoint, DemandSeries, TemperatureReading};
use crate::error::AppError;

const DEMAND_TIME_COLUMN: &str = "datetime";
const DEMAND_VALUE_COLUMN: &str = "pjme_mw";
const TEMPERATURE_DATE_COLUMN: &str = "date";

/// Loaded demand plus bookkeeping about what the file contained.
#[derive(Debug, Clone)]
pub struct IngestedDemand {
    pub series: DemandSeries,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
}

/// Load the hourly demand CSV at `path`.
pub fn load_demand_csv(path: &Path) -> Result<IngestedDemand, AppError> {
    let file = open(path)?;
    read_demand(file, &path.display().to_string())
}

/// Parse hourly demand rows from any reader. `source` is only used in messages.
pub fn read_demand<R: Read>(reader: R, source: &str) -> Result<IngestedDemand, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader, source)?;
    let ts_idx = require_column(&header_map, DEMAND_TIME_COLUMN, "Datetime", source)?;
    let mw_idx = require_column(&header_map, DEMAND_VALUE_COLUMN, "PJME_MW", source)?;

    let mut points = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, and CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| row_error(source, line, format!("CSV parse error: {e}")))?;

        let timestamp = field(&record, ts_idx)
            .ok_or_else(|| row_error(source, line, "Missing `Datetime` value."))
            .and_then(|s| parse_datetime(s).map_err(|e| row_error(source, line, e)))?;
        let mw = field(&record, mw_idx)
            .and_then(parse_f64)
            .ok_or_else(|| row_error(source, line, "Missing/invalid `PJME_MW` value."))?;

        points.push(DemandPoint { timestamp, mw });
    }

    let rows_read = points.len();
    let (series, duplicates_dropped) = DemandSeries::from_unsorted(points);
    if duplicates_dropped > 0 {
        warn!(duplicates_dropped, source, "dropped rows with repeated timestamps");
    }
    debug!(rows_read, rows_kept = series.len(), source, "loaded demand series");

    Ok(IngestedDemand {
        series,
        rows_read,
        duplicates_dropped,
    })
}

/// Load the daily temperature CSV at `path`.
pub fn load_temperature_csv(path: &Path) -> Result<Vec<TemperatureReading>, AppError> {
    let file = open(path)?;
    read_temperature(file, &path.display().to_string())
}

/// Parse daily temperature rows from any reader.
///
/// Empty `high`/`low` cells become `None`; they are filled later by the join.
pub fn read_temperature<R: Read>(reader: R, source: &str) -> Result<Vec<TemperatureReading>, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader, source)?;
    let date_idx = require_column(&header_map, TEMPERATURE_DATE_COLUMN, "DATE", source)?;
    let high_idx = require_column(&header_map, "high", "high", source)?;
    let low_idx = require_column(&header_map, "low", "low", source)?;

    let mut out = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| row_error(source, line, format!("CSV parse error: {e}")))?;

        let date = field(&record, date_idx)
            .ok_or_else(|| row_error(source, line, "Missing `DATE` value."))
            .and_then(|s| parse_datetime(s).map_err(|e| row_error(source, line, e)))?
            .date();
        let high = parse_optional_reading(field(&record, high_idx), "high")
            .map_err(|e| row_error(source, line, e))?;
        let low = parse_optional_reading(field(&record, low_idx), "low")
            .map_err(|e| row_error(source, line, e))?;

        out.push(TemperatureReading { date, high, low });
    }

    debug!(rows = out.len(), source, "loaded temperature readings");
    Ok(out)
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn read_header_map<R: Read>(reader: &mut csv::Reader<R>, source: &str) -> Result<HashMap<String, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers from '{source}': {e}")))?;
    Ok(build_header_map(headers))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn require_column(
    header_map: &HashMap<String, usize>,
    key: &str,
    display: &str,
    source: &str,
) -> Result<usize, AppError> {
    header_map
        .get(key)
        .copied()
        .ok_or_else(|| AppError::input(format!("Missing required column `{display}` in '{source}'.")))
}

fn row_error(source: &str, line: usize, message: impl std::fmt::Display) -> AppError {
    AppError::input(format!("{source}:{line}: {message}"))
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a timestamp; a bare date means midnight.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    const DATETIME_FMTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected YYYY-MM-DD HH:MM:SS or YYYY-MM-DD."
    ))
}

fn parse_f64(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn parse_optional_reading(s: Option<&str>, name: &str) -> Result<Option<f64>, String> {
    match s {
        None => Ok(None),
        Some(s) => parse_f64(s)
            .map(Some)
            .ok_or_else(|| format!("Invalid `{name}` value '{s}'.")),
    }
}
