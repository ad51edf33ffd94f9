//! Synthetic input data for smoke runs without the real PJM download.

pub mod sample;

pub use sample::{SampleConfig, generate_demand};
