//! Strategy Layer - Spread construction and z-score statistics
//!
//! - `spread`: hedged log-price spread of the two legs
//! - `zscore_gate`: trailing window mean/std-dev and the current z-score
//! - `hedge_ratio`: estimators for the hedge ratio on a training window
//! - `cointegration`: ADF test on the training regression residual
//! - `params`: thresholds, sizing and performance configuration

pub mod cointegration;
pub mod hedge_ratio;
pub mod params;
pub mod spread;
pub mod zscore_gate;

pub use cointegration::{adf_test, AdfTest, CointegrationError, CriticalValues};
pub use hedge_ratio::{HedgeMethod, HedgeRatioEstimator, LinearFit, OlsSlope, PearsonCorrelation, RegressionFit};
pub use params::{CapitalConfig, ConfigError, PairsConfig, PerformanceConfig, ThresholdConfig};
pub use spread::{log_spread, SpreadError};
pub use zscore_gate::{RollingStatsWindow, WindowError, ZScoreResult};
