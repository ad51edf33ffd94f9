//! Fixed-boundary train/test split.
//!
//! Rows at or before the boundary train, rows after it test. Nothing is
//! shuffled: both sides keep their timestamp order.

use chrono::NaiveDateTime;

use crate::domain::FeatureFrame;
use crate::error::AppError;

/// A frame split into its training and test windows.
#[derive(Debug, Clone)]
pub struct TrainTest {
    pub train: FeatureFrame,
    pub test: FeatureFrame,
}

/// Partition `frame` at `boundary`.
pub fn split_at(frame: &FeatureFrame, boundary: NaiveDateTime) -> TrainTest {
    TrainTest {
        train: frame.filter_rows(|ts| ts <= boundary),
        test: frame.filter_rows(|ts| ts > boundary),
    }
}

/// Like `split_at`, but an empty side is an error (exit code 3).
pub fn split_non_empty(frame: &FeatureFrame, boundary: NaiveDateTime) -> Result<TrainTest, AppError> {
    let split = split_at(frame, boundary);
    ensure_non_empty(split.train.len(), split.test.len(), boundary)?;
    Ok(split)
}

pub(crate) fn ensure_non_empty(train: usize, test: usize, boundary: NaiveDateTime) -> Result<(), AppError> {
    if train == 0 {
        return Err(AppError::data(format!("No training rows at or before {boundary}.")));
    }
    if test == 0 {
        return Err(AppError::data(format!("No test rows after {boundary}.")));
    }
    Ok(())
}
