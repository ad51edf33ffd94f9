//! Regression error metrics.

use crate::domain::Metric;
use crate::error::AppError;

/// Mean absolute error.
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, AppError> {
    check_lengths(y_true, y_pred)?;
    let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    finite(sum / y_true.len() as f64)
}

/// Root mean squared error.
pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64, AppError> {
    check_lengths(y_true, y_pred)?;
    let sum: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    finite((sum / y_true.len() as f64).sqrt())
}

/// Evaluate the selected metric.
pub fn evaluate(metric: Metric, y_true: &[f64], y_pred: &[f64]) -> Result<f64, AppError> {
    match metric {
        Metric::Mae => mean_absolute_error(y_true, y_pred),
        Metric::Rmse => root_mean_squared_error(y_true, y_pred),
    }
}

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<(), AppError> {
    if y_true.is_empty() {
        return Err(AppError::data("Cannot score an empty prediction set."));
    }
    if y_true.len() != y_pred.len() {
        return Err(AppError::numeric(format!(
            "Length mismatch: {} targets vs {} predictions.",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

fn finite(v: f64) -> Result<f64, AppError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(AppError::numeric("Metric is not finite (non-finite predictions?)."))
    }
}
