//! Performance Evaluation
//!
//! Sharpe ratio of the bankroll series:
//! - daily simple returns r_t = B_t / B_{t-1} - 1
//! - excess returns r_t - risk_free_annual / trading_days
//! - daily Sharpe = mean(excess) / sample_std(excess)
//! - annualized Sharpe = daily * sqrt(trading_days)
//!
//! Undefined ratios are reported as errors, never as NaN or infinity.

use serde::Serialize;
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::application::backtest::BacktestReport;
use crate::domain::{max_drawdown, total_return, BankrollPoint, ExitReason, Status};
use crate::strategy::params::PerformanceConfig;

/// Sample standard deviations at or below this are treated as zero
const MIN_STD_DEV: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Sharpe ratio needs at least 2 bankroll points, got {len}")]
    InsufficientSeries { len: usize },

    #[error("Excess returns have zero or undefined standard deviation")]
    ZeroVariance,

    #[error("Bankroll {bankroll} at index {index} leaves the next return undefined")]
    NonPositiveEquity { index: usize, bankroll: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SharpeRatio {
    pub daily: f64,
    pub annualized: f64,
}

/// Headline numbers of a finished backtest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub sharpe: SharpeRatio,
    pub final_bankroll: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub positions_opened: usize,
    pub positions_closed: usize,
    pub stop_loss_exits: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceEvaluator {
    config: PerformanceConfig,
}

impl PerformanceEvaluator {
    pub fn new(config: PerformanceConfig) -> Self {
        Self { config }
    }

    /// Simple returns between consecutive bankroll values
    pub fn daily_returns(&self, bankrolls: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        bankrolls
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                if pair[0] <= 0.0 {
                    return Err(EvaluationError::NonPositiveEquity { index, bankroll: pair[0] });
                }
                Ok(pair[1] / pair[0] - 1.0)
            })
            .collect()
    }

    /// Sharpe ratio of a plain bankroll value series
    pub fn sharpe_ratio(&self, bankrolls: &[f64]) -> Result<SharpeRatio, EvaluationError> {
        if bankrolls.len() < 2 {
            return Err(EvaluationError::InsufficientSeries { len: bankrolls.len() });
        }

        let risk_free_daily = self.config.risk_free_daily();
        let excess: Vec<f64> = self
            .daily_returns(bankrolls)?
            .into_iter()
            .map(|r| r - risk_free_daily)
            .collect();

        // One return has no sample standard deviation
        if excess.len() < 2 {
            return Err(EvaluationError::ZeroVariance);
        }

        let mean = excess.iter().mean();
        let std_dev = excess.iter().std_dev();
        if !(std_dev > MIN_STD_DEV) || !std_dev.is_finite() {
            return Err(EvaluationError::ZeroVariance);
        }

        let daily = mean / std_dev;
        let annualized = daily * (self.config.trading_days_per_year as f64).sqrt();
        Ok(SharpeRatio { daily, annualized })
    }

    pub fn sharpe_for_series(&self, series: &[BankrollPoint]) -> Result<SharpeRatio, EvaluationError> {
        let values: Vec<f64> = series.iter().map(|p| p.bankroll).collect();
        self.sharpe_ratio(&values)
    }

    pub fn summarize(&self, report: &BacktestReport) -> Result<PerformanceSummary, EvaluationError> {
        let series = report.bankroll_series();
        let sharpe = self.sharpe_for_series(&series)?;

        let closed: Vec<_> = report
            .positions
            .iter()
            .filter(|p| p.status() == Status::Closed)
            .collect();

        Ok(PerformanceSummary {
            sharpe,
            final_bankroll: series.last().map(|p| p.bankroll).unwrap_or_default(),
            total_return: total_return(&series).unwrap_or_default(),
            max_drawdown: max_drawdown(&series),
            positions_opened: report.positions.len(),
            positions_closed: closed.len(),
            stop_loss_exits: closed
                .iter()
                .filter(|p| p.exit_reason() == Some(ExitReason::StopLoss))
                .count(),
        })
    }
}
