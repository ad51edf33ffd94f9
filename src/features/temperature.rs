//! Daily temperature join.
//!
//! Readings are matched to rows by calendar date, then both columns are
//! forward-filled in row order. Rows before the first reading stay null.
//!
//! Joining on the date rather than the midnight timestamp means a day whose
//! series starts after 00:00 still gets that day's reading instead of null.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::TemperatureReading;

/// Joined `high`/`low` columns, one value per input timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureColumns {
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
}

/// Left-join daily readings onto `timestamps` and forward-fill the gaps.
///
/// When a date appears more than once in `readings`, the first row wins.
pub fn join_temperature(timestamps: &[NaiveDateTime], readings: &[TemperatureReading]) -> TemperatureColumns {
    let mut by_date: HashMap<NaiveDate, &TemperatureReading> = HashMap::with_capacity(readings.len());
    for r in readings {
        by_date.entry(r.date).or_insert(r);
    }

    let mut high: Vec<Option<f64>> = Vec::with_capacity(timestamps.len());
    let mut low: Vec<Option<f64>> = Vec::with_capacity(timestamps.len());
    for ts in timestamps {
        let reading = by_date.get(&ts.date());
        high.push(reading.and_then(|r| r.high));
        low.push(reading.and_then(|r| r.low));
    }

    forward_fill(&mut high);
    forward_fill(&mut low);
    TemperatureColumns { high, low }
}

/// Replace each `None` with the last preceding `Some`.
pub fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for v in values.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None => *v = last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2010, 1, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn reading(d: u32, high: Option<f64>, low: Option<f64>) -> TemperatureReading {
        TemperatureReading {
            date: NaiveDate::from_ymd_opt(2010, 1, d).unwrap(),
            high,
            low,
        }
    }

    #[test]
    fn forward_fill_keeps_leading_nulls() {
        let mut v = vec![None, Some(1.0), None, None, Some(2.0), None];
        forward_fill(&mut v);
        assert_eq!(v, vec![None, Some(1.0), Some(1.0), Some(1.0), Some(2.0), Some(2.0)]);
    }

    #[test]
    fn every_hour_of_a_day_gets_that_days_reading() {
        let stamps: Vec<NaiveDateTime> = (0..24).map(|h| ts(2, h)).collect();
        let cols = join_temperature(&stamps, &[reading(2, Some(30.0), Some(20.0))]);
        assert!(cols.high.iter().all(|v| *v == Some(30.0)));
        assert!(cols.low.iter().all(|v| *v == Some(20.0)));
    }

    #[test]
    fn missing_days_and_blank_cells_are_filled_forward() {
        let stamps = vec![ts(1, 12), ts(2, 0), ts(3, 5), ts(4, 5), ts(5, 5)];
        let readings = vec![
            reading(2, Some(30.0), Some(20.0)),
            reading(4, None, Some(15.0)),
            reading(2, Some(99.0), Some(99.0)),
        ];
        let cols = join_temperature(&stamps, &readings);
        assert_eq!(cols.high, vec![None, Some(30.0), Some(30.0), Some(30.0), Some(30.0)]);
        assert_eq!(cols.low, vec![None, Some(20.0), Some(20.0), Some(15.0), Some(15.0)]);

        // No null survives after the first observed value.
        let first = cols.high.iter().position(Option::is_some).unwrap();
        assert!(cols.high[first..].iter().all(Option::is_some));
    }

    #[test]
    fn day_without_a_midnight_row_uses_its_own_reading() {
        let stamps = vec![ts(1, 1), ts(1, 2), ts(2, 0)];
        let readings = vec![reading(1, Some(10.0), Some(5.0)), reading(2, Some(12.0), Some(6.0))];
        let cols = join_temperature(&stamps, &readings);
        assert_eq!(cols.high, vec![Some(10.0), Some(10.0), Some(12.0)]);
        assert_eq!(cols.low, vec![Some(5.0), Some(5.0), Some(6.0)]);
    }
}
