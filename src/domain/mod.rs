//! Domain types used throughout the experiments.
//!
//! This module defines:
//!
//! - raw observations (`DemandPoint`, `TemperatureReading`) and the sorted `DemandSeries`
//! - the column-oriented `FeatureFrame` that models train on
//! - run configuration (`ExperimentConfig`, `FeatureOptions`, `Metric`)

pub mod types;

pub use types::*;
