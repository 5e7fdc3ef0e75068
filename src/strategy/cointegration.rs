//! Cointegration Check
//!
//! Augmented Dickey-Fuller test on the residual of the training regression.
//! A stationary residual means the two legs are cointegrated and the
//! spread should mean-revert.
//!
//! Regression with a constant and `lags` lagged differences:
//!
//! dy_t = alpha + beta * y_{t-1} + sum_j gamma_j * dy_{t-j} + e_t
//!
//! The statistic is the t-value of beta, compared against MacKinnon (2010)
//! critical values for the constant-only case.

use serde::Serialize;
use statrs::statistics::Statistics;
use thiserror::Error;

/// MacKinnon (2010) response surface, constant only, one variable:
/// crit(T) = b0 + b1/T + b2/T^2 + b3/T^3 for the 1%, 5% and 10% levels
const MACKINNON_C: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CointegrationError {
    #[error("ADF with {lags} lags needs at least {need} observations, got {got}")]
    TooFewSamples { lags: usize, need: usize, got: usize },
    #[error("ADF regression is singular (constant or collinear series)")]
    Singular,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

impl CriticalValues {
    /// Finite-sample critical values for `nobs` regression observations
    pub fn for_observations(nobs: usize) -> Self {
        let t = nobs as f64;
        let at = |c: &[f64; 4]| c[0] + c[1] / t + c[2] / (t * t) + c[3] / (t * t * t);
        Self {
            one_pct: at(&MACKINNON_C[0]),
            five_pct: at(&MACKINNON_C[1]),
            ten_pct: at(&MACKINNON_C[2]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdfTest {
    pub statistic: f64,
    pub lags: usize,
    /// Rows in the test regression
    pub observations: usize,
    pub critical_values: CriticalValues,
    /// Unit root rejected at the 5% level
    pub stationary: bool,
    /// Days for a deviation to halve under an AR(1) fit; `None` unless 0 < phi < 1
    pub half_life: Option<f64>,
}

/// Run the ADF test on `series` with a fixed number of lagged differences
pub fn adf_test(series: &[f64], lags: usize) -> Result<AdfTest, CointegrationError> {
    let regressors = 2 + lags;
    // Need more rows than regressors to estimate the residual variance
    let need = lags + regressors + 2;
    if series.len() < need {
        return Err(CointegrationError::TooFewSamples {
            lags,
            need,
            got: series.len(),
        });
    }

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(series.len());
    let mut targets: Vec<f64> = Vec::with_capacity(series.len());
    for t in (lags + 1)..series.len() {
        let mut row = Vec::with_capacity(regressors);
        row.push(1.0);
        row.push(series[t - 1]);
        for j in 1..=lags {
            row.push(diffs[t - 1 - j]);
        }
        rows.push(row);
        targets.push(diffs[t - 1]);
    }
    let nobs = rows.len();

    let mut xtx = vec![vec![0.0; regressors]; regressors];
    let mut xty = vec![0.0; regressors];
    for (row, &y) in rows.iter().zip(&targets) {
        for i in 0..regressors {
            xty[i] += row[i] * y;
            for j in 0..regressors {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let inverse = invert(xtx).ok_or(CointegrationError::Singular)?;
    let coef: Vec<f64> = inverse
        .iter()
        .map(|r| r.iter().zip(&xty).map(|(a, b)| a * b).sum())
        .collect();

    let sse: f64 = rows
        .iter()
        .zip(&targets)
        .map(|(row, &y)| {
            let fitted: f64 = row.iter().zip(&coef).map(|(x, c)| x * c).sum();
            (y - fitted).powi(2)
        })
        .sum();
    let sigma2 = sse / (nobs - regressors) as f64;
    let std_err = (sigma2 * inverse[1][1]).sqrt();
    if !(std_err > 0.0) || !std_err.is_finite() {
        return Err(CointegrationError::Singular);
    }

    let statistic = coef[1] / std_err;
    let critical_values = CriticalValues::for_observations(nobs);

    Ok(AdfTest {
        statistic,
        lags,
        observations: nobs,
        critical_values,
        stationary: statistic < critical_values.five_pct,
        half_life: half_life(series),
    })
}

/// Half-life of mean reversion from the AR(1) fit y_t = c + phi * y_{t-1}
pub fn half_life(series: &[f64]) -> Option<f64> {
    if series.len() < 3 {
        return None;
    }
    let lagged = &series[..series.len() - 1];
    let current = &series[1..];
    let var = lagged.iter().variance();
    if !(var > 0.0) {
        return None;
    }
    let phi = lagged.iter().covariance(current.iter()) / var;
    (phi > 0.0 && phi < 1.0).then(|| -std::f64::consts::LN_2 / phi.ln())
}

/// Gauss-Jordan inverse with partial pivoting
fn invert(mut m: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let k = m.len();
    for (i, row) in m.iter_mut().enumerate() {
        row.extend((0..k).map(|j| if i == j { 1.0 } else { 0.0 }));
    }

    for col in 0..k {
        let pivot = (col..k).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        m.swap(col, pivot);

        let p = m[col][col];
        for v in m[col].iter_mut() {
            *v /= p;
        }
        let pivot_row = m[col].clone();
        for (r, row) in m.iter_mut().enumerate() {
            if r == col {
                continue;
            }
            let f = row[col];
            for (x, y) in row.iter_mut().zip(&pivot_row) {
                *x -= f * y;
            }
        }
    }

    Some(m.into_iter().map(|row| row[k..].to_vec()).collect())
}
