//! Prophet forecaster: piecewise-linear trend plus Fourier seasonalities,
//! fitted by Prophet's Stan MAP optimizer through `augurs`.

pub mod model;

pub use model::{Forecast, ProphetModel, ProphetParams, SeasonalityMode};
