//! Rolling Spread Window
//!
//! Trailing window over the last W spreads, used to standardize the
//! current day's spread.
//!
//! Z-Score Formula: z = (current_spread - rolling_mean) / rolling_std
//!
//! The current spread is never part of its own window: callers compute the
//! z-score first and push the spread afterwards. Mean and population
//! standard deviation are recomputed over the full window every call.

use std::collections::VecDeque;
use thiserror::Error;

/// Standard deviations at or below this are treated as a degenerate window
const MIN_STD_DEV: f64 = 1e-12;

/// Result of z-score calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    /// Current z-score value
    pub z_score: f64,
    /// Rolling mean of the window
    pub mean: f64,
    /// Rolling population standard deviation
    pub std_dev: f64,
    /// Spread being compared against the window
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum WindowError {
    #[error("Window not ready: {have} of {need} values")]
    NotReady { have: usize, need: usize },
    #[error("Degenerate window: standard deviation {std_dev}")]
    Degenerate { mean: f64, std_dev: f64 },
}

/// Fixed-length trailing window of spread values
#[derive(Debug, Clone)]
pub struct RollingStatsWindow {
    window_length: usize,
    spreads: VecDeque<f64>,
}

impl RollingStatsWindow {
    pub fn new(window_length: usize) -> Self {
        Self {
            window_length,
            spreads: VecDeque::with_capacity(window_length + 1),
        }
    }

    /// Append a spread, evicting the oldest once the window is full
    pub fn push(&mut self, spread: f64) {
        self.spreads.push_back(spread);
        while self.spreads.len() > self.window_length {
            self.spreads.pop_front();
        }
    }

    /// Mean and population standard deviation, only over a full window
    pub fn stats(&self) -> Option<(f64, f64)> {
        if !self.is_ready() {
            return None;
        }
        let n = self.spreads.len() as f64;
        let mean = self.spreads.iter().sum::<f64>() / n;
        let variance = self
            .spreads
            .iter()
            .map(|&s| {
                let diff = s - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        Some((mean, variance.sqrt()))
    }

    /// Standardize `spread` against the current window
    pub fn z_score(&self, spread: f64) -> Result<ZScoreResult, WindowError> {
        let (mean, std_dev) = self.stats().ok_or(WindowError::NotReady {
            have: self.spreads.len(),
            need: self.window_length,
        })?;

        if !(std_dev > MIN_STD_DEV) || !std_dev.is_finite() {
            return Err(WindowError::Degenerate { mean, std_dev });
        }

        Ok(ZScoreResult {
            z_score: (spread - mean) / std_dev,
            mean,
            std_dev,
            spread,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.spreads.len() >= self.window_length
    }
}
