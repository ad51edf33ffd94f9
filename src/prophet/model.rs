//! Prophet model wrapper.
//!
//! Training and prediction go through `augurs::prophet` with the bundled
//! wasm build of Prophet's Stan model, so the fit is the same MAP estimate
//! Prophet itself computes (`y` scaled by its absolute maximum, 25 potential
//! changepoints in the first 80% of the history, Laplace prior on the slope
//! changes). Timestamps cross the boundary as Unix seconds.

use augurs::prophet::{
    PredictionData, Prophet, ProphetOptions, SeasonalityOption, TrainingData, wasmstan::WasmstanOptimizer,
};
use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::domain::DemandSeries;
use crate::error::AppError;

/// Whether a seasonality is fitted, and with how many Fourier terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalityMode {
    /// Let Prophet decide from the history length and spacing.
    Auto,
    Disabled,
    /// Fixed Fourier order (0 disables).
    Order(u32),
}

impl SeasonalityMode {
    fn to_option(self) -> SeasonalityOption {
        match self {
            SeasonalityMode::Auto => SeasonalityOption::Auto,
            SeasonalityMode::Disabled | SeasonalityMode::Order(0) => SeasonalityOption::Manual(false),
            SeasonalityMode::Order(order) => {
                SeasonalityOption::Fourier(std::num::NonZeroU32::new(order).expect("order 0 matched above"))
            }
        }
    }
}

/// Model configuration. Everything not listed keeps Prophet's default.
#[derive(Debug, Clone, PartialEq)]
pub struct ProphetParams {
    pub yearly_seasonality: SeasonalityMode,
    pub weekly_seasonality: SeasonalityMode,
    pub daily_seasonality: SeasonalityMode,
    pub n_changepoints: u32,
}

impl Default for ProphetParams {
    fn default() -> Self {
        Self {
            yearly_seasonality: SeasonalityMode::Auto,
            weekly_seasonality: SeasonalityMode::Auto,
            daily_seasonality: SeasonalityMode::Auto,
            n_changepoints: 25,
        }
    }
}

impl ProphetParams {
    fn options(&self) -> ProphetOptions {
        ProphetOptions {
            yearly_seasonality: self.yearly_seasonality.to_option(),
            weekly_seasonality: self.weekly_seasonality.to_option(),
            daily_seasonality: self.daily_seasonality.to_option(),
            n_changepoints: self.n_changepoints,
            ..ProphetOptions::default()
        }
    }
}

/// One forecast row, in MW.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub timestamp: NaiveDateTime,
    pub yhat: f64,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

/// A fitted Prophet model.
pub struct ProphetModel {
    inner: Prophet<WasmstanOptimizer>,
    train_rows: usize,
}

impl ProphetModel {
    /// Fit to a sorted demand series.
    pub fn fit(series: &DemandSeries, params: &ProphetParams) -> Result<Self, AppError> {
        let points = series.points();
        if points.len() < 2 {
            return Err(AppError::data("Prophet needs at least two distinct timestamps."));
        }

        let ds: Vec<i64> = points.iter().map(|p| unix_seconds(p.timestamp)).collect();
        let y: Vec<f64> = points.iter().map(|p| p.mw).collect();
        let data = TrainingData::new(ds, y)
            .map_err(|e| AppError::input(format!("Invalid Prophet training data: {e}")))?;

        info!(rows = points.len(), ?params, "fitting prophet");
        let mut inner = Prophet::new(params.options(), WasmstanOptimizer::new());
        inner
            .fit(data, Default::default())
            .map_err(|e| AppError::numeric(format!("Prophet fit failed: {e}")))?;

        Ok(Self {
            inner,
            train_rows: points.len(),
        })
    }

    pub fn train_rows(&self) -> usize {
        self.train_rows
    }

    /// Forecast each timestamp. Past the history the trend keeps its final rate.
    pub fn predict(&self, timestamps: &[NaiveDateTime]) -> Result<Vec<Forecast>, AppError> {
        if timestamps.is_empty() {
            return Ok(Vec::new());
        }
        let ds: Vec<i64> = timestamps.iter().map(|&ts| unix_seconds(ts)).collect();
        let predictions = self
            .inner
            .predict(Some(PredictionData::new(ds)))
            .map_err(|e| AppError::numeric(format!("Prophet prediction failed: {e}")))?;

        let yhat = predictions.yhat;
        if yhat.point.len() != timestamps.len() {
            return Err(AppError::numeric(format!(
                "Prophet returned {} predictions for {} timestamps.",
                yhat.point.len(),
                timestamps.len()
            )));
        }
        let lower = yhat.lower.unwrap_or_default();
        let upper = yhat.upper.unwrap_or_default();

        let out: Vec<Forecast> = timestamps
            .iter()
            .zip(&yhat.point)
            .enumerate()
            .map(|(i, (&timestamp, &point))| Forecast {
                timestamp,
                yhat: point,
                yhat_lower: lower.get(i).copied(),
                yhat_upper: upper.get(i).copied(),
            })
            .collect();

        if out.iter().any(|f| !f.yhat.is_finite()) {
            return Err(AppError::numeric("Non-finite forecast from Prophet."));
        }
        debug!(rows = out.len(), "prophet forecast");
        Ok(out)
    }
}

fn unix_seconds(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}
