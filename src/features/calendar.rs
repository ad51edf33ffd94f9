//! Calendar decomposition of a timestamp.

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Calendar column names in the order they are appended to a frame.
pub const CALENDAR_COLUMNS: [&str; 8] = [
    "year",
    "quarter",
    "month",
    "week_of_year",
    "hour",
    "day_of_week",
    "day_of_month",
    "day_of_year",
];

/// Calendar fields of one timestamp.
///
/// `week_of_year` is the ISO week and `day_of_week` the ISO weekday
/// (Monday = 1 .. Sunday = 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i32,
    pub quarter: u32,
    pub month: u32,
    pub week_of_year: u32,
    pub hour: u32,
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub day_of_year: u32,
}

impl CalendarFields {
    pub fn from_timestamp(ts: NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            quarter: (ts.month() - 1) / 3 + 1,
            month: ts.month(),
            week_of_year: ts.iso_week().week(),
            hour: ts.hour(),
            day_of_week: ts.weekday().number_from_monday(),
            day_of_month: ts.day(),
            day_of_year: ts.ordinal(),
        }
    }

    /// Values in `CALENDAR_COLUMNS` order.
    pub fn values(&self) -> [f64; 8] {
        [
            f64::from(self.year),
            f64::from(self.quarter),
            f64::from(self.month),
            f64::from(self.week_of_year),
            f64::from(self.hour),
            f64::from(self.day_of_week),
            f64::from(self.day_of_month),
            f64::from(self.day_of_year),
        ]
    }
}
