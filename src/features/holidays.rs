//! US federal holiday calendar.
//!
//! Fixed-date holidays move to the nearest workday when they fall on a weekend
//! (Saturday -> Friday, Sunday -> Monday), so New Year's Day can be observed on
//! December 31 of the previous year. Dates returned are observed dates.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Fixed month/day, shifted to the nearest workday.
    Fixed { month: u32, day: u32 },
    /// The `n`-th `weekday` of `month` (1-based).
    NthWeekday { month: u32, weekday: Weekday, n: u8 },
    /// The last `weekday` of `month`.
    LastWeekday { month: u32, weekday: Weekday },
}

#[derive(Debug, Clone, Copy)]
struct Holiday {
    name: &'static str,
    rule: Rule,
    /// First year the holiday was observed federally.
    since: Option<i32>,
}

const US_FEDERAL: [Holiday; 11] = [
    Holiday { name: "New Year's Day", rule: Rule::Fixed { month: 1, day: 1 }, since: None },
    Holiday {
        name: "Martin Luther King Jr. Day",
        rule: Rule::NthWeekday { month: 1, weekday: Weekday::Mon, n: 3 },
        since: Some(1986),
    },
    Holiday {
        name: "Presidents Day",
        rule: Rule::NthWeekday { month: 2, weekday: Weekday::Mon, n: 3 },
        since: None,
    },
    Holiday {
        name: "Memorial Day",
        rule: Rule::LastWeekday { month: 5, weekday: Weekday::Mon },
        since: None,
    },
    Holiday { name: "Juneteenth", rule: Rule::Fixed { month: 6, day: 19 }, since: Some(2021) },
    Holiday { name: "Independence Day", rule: Rule::Fixed { month: 7, day: 4 }, since: None },
    Holiday {
        name: "Labor Day",
        rule: Rule::NthWeekday { month: 9, weekday: Weekday::Mon, n: 1 },
        since: None,
    },
    Holiday {
        name: "Columbus Day",
        rule: Rule::NthWeekday { month: 10, weekday: Weekday::Mon, n: 2 },
        since: None,
    },
    Holiday { name: "Veterans Day", rule: Rule::Fixed { month: 11, day: 11 }, since: None },
    Holiday {
        name: "Thanksgiving Day",
        rule: Rule::NthWeekday { month: 11, weekday: Weekday::Thu, n: 4 },
        since: None,
    },
    Holiday { name: "Christmas Day", rule: Rule::Fixed { month: 12, day: 25 }, since: None },
];

/// Observed US federal holidays for the rules of `year`, with their names.
///
/// Observed dates can fall outside `year` (New Year's Day on a Saturday).
pub fn federal_holidays_for_year(year: i32) -> Vec<(NaiveDate, &'static str)> {
    US_FEDERAL
        .iter()
        .filter(|h| h.since.is_none_or(|since| year >= since))
        .filter_map(|h| observed_date(h.rule, year).map(|d| (d, h.name)))
        .collect()
}

/// Observed holiday dates whose midnight lies within `[start, end]`.
pub fn federal_holidays_between(start: NaiveDateTime, end: NaiveDateTime) -> BTreeSet<NaiveDate> {
    if end < start {
        return BTreeSet::new();
    }
    // Pad by a year each side so observed dates that cross a year boundary are seen.
    (start.year() - 1..=end.year() + 1)
        .flat_map(federal_holidays_for_year)
        .map(|(d, _)| d)
        .filter(|d| {
            d.and_hms_opt(0, 0, 0)
                .is_some_and(|midnight| midnight >= start && midnight <= end)
        })
        .collect()
}

fn observed_date(rule: Rule, year: i32) -> Option<NaiveDate> {
    match rule {
        Rule::Fixed { month, day } => NaiveDate::from_ymd_opt(year, month, day).map(nearest_workday),
        Rule::NthWeekday { month, weekday, n } => NaiveDate::from_weekday_of_month_opt(year, month, weekday, n),
        Rule::LastWeekday { month, weekday } => last_weekday_of_month(year, month, weekday),
    }
}

fn nearest_workday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut d = first_of_next.pred_opt()?;
    while d.weekday() != weekday {
        d = d.pred_opt()?;
    }
    Some(d)
}
