//! Reporting utilities: accuracy metrics and formatted output.

pub mod format;
pub mod metrics;

pub use format::*;
pub use metrics::*;
