//! Log-Price Spread
//!
//! spread = ln(price_a) - hedge_ratio * ln(price_b)
//!
//! Instrument A is the sized leg, instrument B the hedge leg.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SpreadError {
    #[error("Log spread undefined for non-positive prices (a={price_a}, b={price_b})")]
    NonPositivePrice { price_a: f64, price_b: f64 },
}

/// Compute the hedged log spread of two prices
pub fn log_spread(price_a: f64, price_b: f64, hedge_ratio: f64) -> Result<f64, SpreadError> {
    let valid = |p: f64| p > 0.0 && p.is_finite();
    if !valid(price_a) || !valid(price_b) {
        return Err(SpreadError::NonPositivePrice { price_a, price_b });
    }
    Ok(price_a.ln() - hedge_ratio * price_b.ln())
}
