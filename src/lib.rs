//! `pjme-forecast` library crate.
//!
//! Hourly PJM East demand forecasting experiments: a gradient-boosted tree
//! model on calendar/holiday/temperature features and an additive
//! trend + seasonality model, both scored on a fixed date split.
//!
//! The binary (`pjme`) is a thin wrapper around [`app::run`].

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod gbdt;
pub mod io;
pub mod prophet;
pub mod report;
pub mod split;
