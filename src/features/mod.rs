//! Feature engineering for the tree experiment.
//!
//! Every derived column is a pure function of the row timestamp, except the
//! temperature columns which come from a left join plus forward fill. Columns are
//! written with `FeatureFrame::set_column`, so running the derivation twice on
//! the same frame leaves it unchanged.

pub mod calendar;
pub mod holidays;
pub mod temperature;

pub use calendar::{CALENDAR_COLUMNS, CalendarFields};
pub use holidays::{federal_holidays_between, federal_holidays_for_year};
pub use temperature::{TemperatureColumns, forward_fill, join_temperature};

use tracing::debug;

use crate::domain::{DemandSeries, FeatureFrame, FeatureOptions, TemperatureReading};
use crate::error::AppError;

pub const HOLIDAY_COLUMN: &str = "is_holiday";
pub const TEMPERATURE_HIGH_COLUMN: &str = "high";
pub const TEMPERATURE_LOW_COLUMN: &str = "low";

/// Build a feature frame from a demand series.
///
/// `temperature` is required when `options.add_temperature_feats` is set.
pub fn engineer_features(
    series: &DemandSeries,
    options: &FeatureOptions,
    temperature: Option<&[TemperatureReading]>,
) -> Result<FeatureFrame, AppError> {
    let mut frame = FeatureFrame::from_series(series);
    apply_features(&mut frame, options, temperature)?;
    Ok(frame)
}

/// Derive (or re-derive) feature columns on an existing frame.
pub fn apply_features(
    frame: &mut FeatureFrame,
    options: &FeatureOptions,
    temperature: Option<&[TemperatureReading]>,
) -> Result<(), AppError> {
    add_calendar(frame)?;
    if options.add_holiday_feats {
        add_holiday(frame)?;
    }
    if options.add_temperature_feats {
        let readings = temperature.ok_or_else(|| {
            AppError::input("Temperature features requested but no temperature readings were loaded.")
        })?;
        add_temperature(frame, readings)?;
    }
    debug!(columns = ?frame.feature_names(), rows = frame.len(), "engineered features");
    Ok(())
}

fn add_calendar(frame: &mut FeatureFrame) -> Result<(), AppError> {
    let fields: Vec<[f64; 8]> = frame
        .timestamps
        .iter()
        .map(|&ts| CalendarFields::from_timestamp(ts).values())
        .collect();

    for (j, name) in CALENDAR_COLUMNS.iter().enumerate() {
        let values = fields.iter().map(|row| Some(row[j])).collect();
        frame.set_column(name, values)?;
    }
    Ok(())
}

fn add_holiday(frame: &mut FeatureFrame) -> Result<(), AppError> {
    let (Some(&start), Some(&end)) = (frame.timestamps.first(), frame.timestamps.last()) else {
        return frame.set_column(HOLIDAY_COLUMN, Vec::new());
    };
    let holidays = federal_holidays_between(start, end);
    debug!(count = holidays.len(), "holidays in range");

    let values = frame
        .timestamps
        .iter()
        .map(|ts| Some(if holidays.contains(&ts.date()) { 1.0 } else { 0.0 }))
        .collect();
    frame.set_column(HOLIDAY_COLUMN, values)
}

fn add_temperature(frame: &mut FeatureFrame, readings: &[TemperatureReading]) -> Result<(), AppError> {
    let TemperatureColumns { high, low } = join_temperature(&frame.timestamps, readings);
    let missing = high.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        debug!(missing, "rows before the first temperature reading stay null");
    }
    frame.set_column(TEMPERATURE_HIGH_COLUMN, high)?;
    frame.set_column(TEMPERATURE_LOW_COLUMN, low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DemandPoint;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn hourly_series(start: NaiveDateTime, hours: i64) -> DemandSeries {
        let points = (0..hours)
            .map(|h| DemandPoint {
                timestamp: start + Duration::hours(h),
                mw: 30_000.0 + h as f64,
            })
            .collect();
        DemandSeries::from_unsorted(points).0
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 12, 30).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn calendar_columns_only_by_default() {
        let series = hourly_series(start(), 48);
        let frame = engineer_features(&series, &FeatureOptions::default(), None).unwrap();
        assert_eq!(frame.feature_names(), CALENDAR_COLUMNS.to_vec());
        assert_eq!(frame.len(), 48);
        assert_eq!(frame.column("hour").unwrap().values[25], Some(1.0));
    }

    #[test]
    fn engineering_is_idempotent() {
        let series = hourly_series(start(), 24 * 10);
        let readings = vec![TemperatureReading {
            date: NaiveDate::from_ymd_opt(2014, 12, 31).unwrap(),
            high: Some(40.0),
            low: Some(28.0),
        }];
        let options = FeatureOptions {
            add_holiday_feats: true,
            add_temperature_feats: true,
        };

        let once = engineer_features(&series, &options, Some(&readings)).unwrap();
        let mut twice = once.clone();
        apply_features(&mut twice, &options, Some(&readings)).unwrap();
        assert_eq!(once, twice);

        let again = engineer_features(&series, &options, Some(&readings)).unwrap();
        assert_eq!(once, again);
    }

    #[test]
    fn holiday_flag_marks_new_years_day_only() {
        let series = hourly_series(start(), 24 * 5);
        let options = FeatureOptions {
            add_holiday_feats: true,
            add_temperature_feats: false,
        };
        let frame = engineer_features(&series, &options, None).unwrap();
        let flags = &frame.column(HOLIDAY_COLUMN).unwrap().values;
        for (ts, flag) in frame.timestamps.iter().zip(flags) {
            let expected = if ts.date() == NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() {
                1.0
            } else {
                0.0
            };
            assert_eq!(*flag, Some(expected), "at {ts}");
        }
    }

    #[test]
    fn temperature_without_readings_is_an_error() {
        let series = hourly_series(start(), 3);
        let options = FeatureOptions {
            add_holiday_feats: false,
            add_temperature_feats: true,
        };
        let err = engineer_features(&series, &options, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
