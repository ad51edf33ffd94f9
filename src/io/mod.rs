//! Input/output helpers.
//!
//! - `ingest`: demand and temperature CSV loading
//! - `export`: test-window predictions and synthetic demand to CSV

pub mod export;
pub mod ingest;
