//! Gradient-boosted decision trees.
//!
//! - `binning`: per-feature quantile bins with a dedicated missing-value bin
//! - `tree`: leaf-wise histogram tree growth (parallel over features)
//! - `booster`: the boosting loop, prediction and feature importance

pub mod binning;
pub mod booster;
pub mod tree;

pub use booster::{GbdtParams, GbdtRegressor};
