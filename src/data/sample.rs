//! Synthetic PJME-shaped hourly demand.
//!
//! The generated load is a slow trend plus yearly, weekly and daily cycles with
//! Gaussian noise, roughly matching the scale of the real PJM East series.

use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::domain::DemandPoint;
use crate::error::AppError;

/// Average load level (MW).
const BASE_LOAD_MW: f64 = 32_000.0;
/// Summer/winter peaks over the spring/autumn trough.
const YEARLY_AMPLITUDE_MW: f64 = 4_500.0;
const WEEKEND_DIP_MW: f64 = 2_500.0;
const DAILY_AMPLITUDE_MW: f64 = 5_000.0;
/// Long-run drift per year.
const TREND_MW_PER_YEAR: f64 = -150.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub start: NaiveDateTime,
    pub hours: usize,
    pub seed: u64,
    /// Standard deviation of the hourly noise (MW).
    pub noise_mw: f64,
}

impl SampleConfig {
    pub fn new(start: NaiveDateTime, hours: usize, seed: u64) -> Self {
        Self {
            start,
            hours,
            seed,
            noise_mw: 800.0,
        }
    }
}

/// Generate `config.hours` consecutive hourly observations.
pub fn generate_demand(config: &SampleConfig) -> Result<Vec<DemandPoint>, AppError> {
    if config.hours == 0 {
        return Err(AppError::input("Sample hours must be > 0."));
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_mw)
        .map_err(|e| AppError::input(format!("Noise distribution error: {e}")))?;

    let points: Vec<DemandPoint> = (0..config.hours)
        .map(|h| {
            let timestamp = config.start + Duration::hours(h as i64);
            let mw = baseline_load(config.start, timestamp) + noise.sample(&mut rng);
            DemandPoint {
                timestamp,
                mw: (mw * 10.0).round() / 10.0,
            }
        })
        .collect();

    debug!(rows = points.len(), seed = config.seed, "generated synthetic demand");
    Ok(points)
}

/// Noise-free load at `ts` for a series starting at `start`.
pub fn baseline_load(start: NaiveDateTime, ts: NaiveDateTime) -> f64 {
    let years = (ts - start).num_hours() as f64 / (24.0 * 365.25);
    let doy = ts.ordinal0() as f64 / 365.25;
    // Two peaks a year: cooling load in July, heating load in January.
    let yearly = YEARLY_AMPLITUDE_MW * (4.0 * PI * (doy - 0.04)).cos();
    let weekly = if ts.weekday().number_from_monday() >= 6 {
        -WEEKEND_DIP_MW
    } else {
        0.0
    };
    // Trough at 4am, peak at 4pm.
    let daily = -DAILY_AMPLITUDE_MW * (2.0 * PI * (ts.hour() as f64 - 4.0) / 24.0).cos();

    BASE_LOAD_MW + TREND_MW_PER_YEAR * years + yearly + weekly + daily
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn generates_consecutive_hours() {
        let points = generate_demand(&SampleConfig::new(start(), 48, 1)).unwrap();
        assert_eq!(points.len(), 48);
        assert_eq!(points[0].timestamp, start());
        assert!(points.windows(2).all(|w| w[1].timestamp - w[0].timestamp == Duration::hours(1)));
        assert!(points.iter().all(|p| p.mw > 10_000.0 && p.mw < 60_000.0));
    }

    #[test]
    fn same_seed_same_series() {
        let a = generate_demand(&SampleConfig::new(start(), 100, 9)).unwrap();
        let b = generate_demand(&SampleConfig::new(start(), 100, 9)).unwrap();
        let c = generate_demand(&SampleConfig::new(start(), 100, 10)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn afternoon_load_exceeds_early_morning() {
        let day = NaiveDate::from_ymd_opt(2013, 7, 10).unwrap();
        let early = baseline_load(start(), day.and_hms_opt(4, 0, 0).unwrap());
        let late = baseline_load(start(), day.and_hms_opt(16, 0, 0).unwrap());
        assert!(late > early + 5_000.0);
    }

    #[test]
    fn rejects_empty_request() {
        let err = generate_demand(&SampleConfig::new(start(), 0, 1)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
