//! Hedge Ratio Estimation
//!
//! The engine only ever sees a scalar hedge ratio. This module offers two
//! ways to derive one from a training window of closes:
//! - `PearsonCorrelation`: correlation coefficient of the two close series
//! - `OlsSlope`: least-squares slope of A's closes regressed on B's closes
//!
//! The correlation variant is kept for comparability with earlier research
//! runs; it is not a regression slope and generally differs from `OlsSlope`.
//!
//! `fit` also regresses the other way, B on A. That is the cointegrating
//! regression: its residual is what `cointegration::adf_test` checks for
//! stationarity. `OlsSlope` uses the A-on-B direction because the engine
//! sizes leg A and hedges with `h` units of B per unit of A.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;

/// Minimum samples for a meaningful fit
const MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HedgeRatioError {
    #[error("Series length mismatch: a={a}, b={b}")]
    LengthMismatch { a: usize, b: usize },
    #[error("Need at least {need} samples, got {got}")]
    TooFewSamples { need: usize, got: usize },
    #[error("Zero variance in training series {0}")]
    ZeroVariance(&'static str),
}

/// Which estimator to use, as named in config files and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HedgeMethod {
    Correlation,
    Ols,
}

impl HedgeMethod {
    pub fn estimator(self) -> Box<dyn HedgeRatioEstimator> {
        match self {
            HedgeMethod::Correlation => Box::new(PearsonCorrelation),
            HedgeMethod::Ols => Box::new(OlsSlope),
        }
    }
}

/// Produces a hedge ratio from aligned training closes (A first, B second)
pub trait HedgeRatioEstimator: Send + Sync {
    fn estimate(&self, closes_a: &[f64], closes_b: &[f64]) -> Result<f64, HedgeRatioError>;
}

/// Least-squares line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Least-squares fits in both directions, plus correlation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionFit {
    /// A regressed on B; its slope is the `ols` hedge ratio
    pub a_on_b: LinearFit,
    /// B regressed on A, the cointegrating regression
    pub b_on_a: LinearFit,
    pub correlation: f64,
    pub samples: usize,
}

impl RegressionFit {
    /// Residuals `b - (intercept + slope * a)` of the B-on-A regression
    pub fn residuals(&self, closes_a: &[f64], closes_b: &[f64]) -> Vec<f64> {
        closes_a
            .iter()
            .zip(closes_b)
            .map(|(&a, &b)| b - self.b_on_a.predict(a))
            .collect()
    }
}

/// Fit both regressions and the Pearson correlation of a and b
pub fn fit(closes_a: &[f64], closes_b: &[f64]) -> Result<RegressionFit, HedgeRatioError> {
    if closes_a.len() != closes_b.len() {
        return Err(HedgeRatioError::LengthMismatch {
            a: closes_a.len(),
            b: closes_b.len(),
        });
    }
    if closes_a.len() < MIN_SAMPLES {
        return Err(HedgeRatioError::TooFewSamples {
            need: MIN_SAMPLES,
            got: closes_a.len(),
        });
    }

    let var_a = closes_a.iter().variance();
    let var_b = closes_b.iter().variance();
    if !(var_a > 0.0) {
        return Err(HedgeRatioError::ZeroVariance("a"));
    }
    if !(var_b > 0.0) {
        return Err(HedgeRatioError::ZeroVariance("b"));
    }

    let cov = closes_a.iter().covariance(closes_b.iter());
    let (mean_a, mean_b) = (closes_a.iter().mean(), closes_b.iter().mean());
    let a_on_b = LinearFit {
        slope: cov / var_b,
        intercept: mean_a - cov / var_b * mean_b,
    };
    let b_on_a = LinearFit {
        slope: cov / var_a,
        intercept: mean_b - cov / var_a * mean_a,
    };
    let correlation = cov / (var_a.sqrt() * var_b.sqrt());

    Ok(RegressionFit {
        a_on_b,
        b_on_a,
        correlation,
        samples: closes_a.len(),
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PearsonCorrelation;

impl HedgeRatioEstimator for PearsonCorrelation {
    fn estimate(&self, closes_a: &[f64], closes_b: &[f64]) -> Result<f64, HedgeRatioError> {
        fit(closes_a, closes_b).map(|f| f.correlation)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OlsSlope;

impl HedgeRatioEstimator for OlsSlope {
    fn estimate(&self, closes_a: &[f64], closes_b: &[f64]) -> Result<f64, HedgeRatioError> {
        fit(closes_a, closes_b).map(|f| f.a_on_b.slope)
    }
}

/// Number of leading rows used for training when `train_fraction` of the
/// series is held in-sample. The test split starts at `test_start`.
///
/// The two splits overlap by one row for some lengths; this matches how the
/// research notebooks carved the data.
pub fn train_test_bounds(len: usize, train_fraction: f64) -> (usize, usize) {
    let holdout = ((1.0 - train_fraction) * len as f64) as usize;
    let train_end = len - holdout.min(len);
    let test_start = ((train_fraction * len as f64) as usize).min(len);
    (train_end, test_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_linear_relationship() {
        let b: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let a: Vec<f64> = b.iter().map(|x| 3.0 + 2.0 * x).collect();

        let f = fit(&a, &b).unwrap();
        assert!((f.a_on_b.slope - 2.0).abs() < 1e-10);
        assert!((f.a_on_b.intercept - 3.0).abs() < 1e-10);
        assert!((f.b_on_a.slope - 0.5).abs() < 1e-10);
        assert!((f.b_on_a.intercept + 1.5).abs() < 1e-10);
        assert!(f.residuals(&a, &b).iter().all(|r| r.abs() < 1e-10));
        assert!((f.correlation - 1.0).abs() < 1e-10);
        assert_eq!(f.samples, 10);

        assert!((OlsSlope.estimate(&a, &b).unwrap() - 2.0).abs() < 1e-10);
        assert!((PearsonCorrelation.estimate(&a, &b).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_negative_correlation() {
        let b = [1.0, 2.0, 3.0, 4.0, 5.0];
        let a = [10.0, 8.0, 6.0, 4.0, 2.0];
        let rho = PearsonCorrelation.estimate(&a, &b).unwrap();
        assert!((rho + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_estimator_errors() {
        assert!(matches!(
            fit(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(HedgeRatioError::LengthMismatch { a: 3, b: 2 })
        ));
        assert!(matches!(
            fit(&[1.0, 2.0], &[1.0, 2.0]),
            Err(HedgeRatioError::TooFewSamples { .. })
        ));
        assert!(matches!(
            fit(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]),
            Err(HedgeRatioError::ZeroVariance("b"))
        ));
    }

    #[test]
    fn test_regression_directions() {
        let a = [10.0, 11.0, 13.0, 12.0, 15.0, 16.0];
        let b = [5.0, 5.2, 6.1, 5.4, 7.5, 7.4];
        let f = fit(&a, &b).unwrap();

        // b = 0.1217391 + 0.4658385 * a, the cointegrating regression
        assert!((f.b_on_a.slope - 0.4658385).abs() < 1e-7);
        assert!((f.b_on_a.intercept - 0.1217391).abs() < 1e-7);
        // a = 0.4550866 + 2.0292208 * b, the `ols` hedge ratio
        assert!((f.a_on_b.slope - 2.0292208).abs() < 1e-7);
        assert!((f.a_on_b.intercept - 0.4550866).abs() < 1e-7);
        assert_eq!(OlsSlope.estimate(&a, &b).unwrap(), f.a_on_b.slope);

        // Product of the two slopes is the squared correlation
        assert!((f.a_on_b.slope * f.b_on_a.slope - f.correlation.powi(2)).abs() < 1e-12);

        let residuals = f.residuals(&a, &b);
        assert_eq!(residuals.len(), 6);
        assert!(residuals.iter().sum::<f64>().abs() < 1e-10);
        assert!((residuals[0] - (5.0 - 0.1217391 - 4.658385)).abs() < 1e-6);
    }

    #[test]
    fn test_method_dispatch() {
        let b = [1.0, 2.0, 3.0, 4.0];
        let a = [2.5, 4.5, 6.5, 8.5];
        let ols = HedgeMethod::Ols.estimator().estimate(&a, &b).unwrap();
        let rho = HedgeMethod::Correlation.estimator().estimate(&a, &b).unwrap();
        assert!((ols - 2.0).abs() < 1e-12);
        assert!((rho - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_train_test_bounds() {
        // 100 rows: train on the first 60, test from row 60
        assert_eq!(train_test_bounds(100, 0.6), (60, 60));
        // 7 rows: holdout floor(2.8)=2 -> train 5; test from floor(4.2)=4
        assert_eq!(train_test_bounds(7, 0.6), (5, 4));
        assert_eq!(train_test_bounds(0, 0.6), (0, 0));
    }
}
