//! Backtest Engine
//!
//! Single forward pass over aligned daily closes. Each simulated day:
//! 1. standardize today's spread against the previous `window_length` spreads
//! 2. mark open positions and apply exit/stop-loss rules -> daily P&L
//! 3. bankroll += daily P&L
//! 4. if bankroll > 0, open a position on an entry signal
//! 5. carry today's z-score forward as tomorrow's previous z-score
//! 6. record the day
//!
//! The run is a fold over `BacktestState`; `BacktestEngine::advance` is the
//! per-day step and can be driven directly.

use std::ops::ControlFlow;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{BankrollPoint, DailyMark, Position, PositionError, PositionLedger};
use crate::ports::{PairHistory, PricePoint};
use crate::strategy::params::{ConfigError, PairsConfig};
use crate::strategy::spread::{log_spread, SpreadError};
use crate::strategy::zscore_gate::{RollingStatsWindow, WindowError, ZScoreResult};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("Degenerate spread window at index {index} ({date}): standard deviation {std_dev}")]
    DegenerateWindow {
        index: usize,
        date: NaiveDate,
        std_dev: f64,
    },

    #[error("Insufficient history: need at least {required} aligned days, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Invalid price at index {index}: {source}")]
    Spread {
        index: usize,
        #[source]
        source: SpreadError,
    },

    #[error("Invalid hedge ratio: {0}")]
    InvalidHedgeRatio(f64),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Inputs for one simulated day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayInput {
    pub index: usize,
    pub date: NaiveDate,
    pub price_a: f64,
    pub price_b: f64,
    pub z: ZScoreResult,
}

/// State carried from one day to the next
#[derive(Debug, Clone)]
pub struct BacktestState {
    pub bankroll: f64,
    pub prev_z_score: f64,
    pub ledger: PositionLedger,
}

/// Everything computed for one simulated day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub price_a: f64,
    pub price_b: f64,
    pub spread: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub z_score: f64,
    pub daily_pnl: f64,
    pub bankroll: f64,
    pub open_positions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub hedge_ratio: f64,
    pub days: Vec<DayRecord>,
    pub positions: Vec<Position>,
    /// False when an observer stopped the run early
    pub completed: bool,
}

impl BacktestReport {
    pub fn bankroll_series(&self) -> Vec<BankrollPoint> {
        self.days
            .iter()
            .map(|d| BankrollPoint { date: d.date, bankroll: d.bankroll })
            .collect()
    }

    pub fn bankroll_values(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.bankroll).collect()
    }

    pub fn final_bankroll(&self) -> Option<f64> {
        self.days.last().map(|d| d.bankroll)
    }
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: PairsConfig,
}

impl BacktestEngine {
    pub fn new(config: PairsConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PairsConfig {
        &self.config
    }

    /// State before the first simulated day
    pub fn initial_state(&self, hedge_ratio: f64) -> BacktestState {
        BacktestState {
            bankroll: self.config.capital.initial_bankroll,
            prev_z_score: 0.0,
            ledger: PositionLedger::new(
                hedge_ratio,
                self.config.thresholds.clone(),
                self.config.capital.position_fraction,
            ),
        }
    }

    /// Apply one day to `state`
    pub fn advance(
        &self,
        mut state: BacktestState,
        day: &DayInput,
    ) -> Result<(BacktestState, DayRecord), BacktestError> {
        let mark = DailyMark {
            date: day.date,
            price_a: day.price_a,
            price_b: day.price_b,
            z_score: day.z.z_score,
            prev_z_score: state.prev_z_score,
        };

        let daily_pnl = state.ledger.mark_and_maybe_close(&mark);
        state.bankroll += daily_pnl;

        if state.bankroll > 0.0 {
            state.ledger.try_open(&mark, state.bankroll)?;
        } else {
            debug!(
                index = day.index,
                date = %day.date,
                bankroll = state.bankroll,
                "bankroll exhausted, entries blocked"
            );
        }

        state.prev_z_score = day.z.z_score;

        let record = DayRecord {
            date: day.date,
            price_a: day.price_a,
            price_b: day.price_b,
            spread: day.z.spread,
            mean: day.z.mean,
            std_dev: day.z.std_dev,
            z_score: day.z.z_score,
            daily_pnl,
            bankroll: state.bankroll,
            open_positions: state.ledger.open_count(),
        };
        Ok((state, record))
    }

    /// Run over a date-aligned pair
    pub fn run_pair(&self, pair: &PairHistory, hedge_ratio: f64) -> Result<BacktestReport, BacktestError> {
        self.run(pair.leg_a(), pair.leg_b(), hedge_ratio)
    }

    /// Run over two series assumed aligned by index; dates come from `a`
    pub fn run(
        &self,
        a: &[PricePoint],
        b: &[PricePoint],
        hedge_ratio: f64,
    ) -> Result<BacktestReport, BacktestError> {
        self.run_with(a, b, hedge_ratio, |_| ControlFlow::Continue(()))
    }

    /// Run, handing each day's record to `observer`. Returning
    /// `ControlFlow::Break` stops after that day; the report then holds
    /// exactly the days processed so far.
    pub fn run_with<F>(
        &self,
        a: &[PricePoint],
        b: &[PricePoint],
        hedge_ratio: f64,
        mut observer: F,
    ) -> Result<BacktestReport, BacktestError>
    where
        F: FnMut(&DayRecord) -> ControlFlow<()>,
    {
        if !hedge_ratio.is_finite() {
            return Err(BacktestError::InvalidHedgeRatio(hedge_ratio));
        }

        let window_length = self.config.window_length;
        let len = a.len().min(b.len());
        if len <= window_length {
            return Err(BacktestError::InsufficientHistory {
                required: window_length + 1,
                available: len,
            });
        }

        let mut window = RollingStatsWindow::new(window_length);
        let mut state = self.initial_state(hedge_ratio);
        let mut days = Vec::with_capacity(len - window_length);
        let mut completed = true;

        for index in 0..len {
            let (pa, pb) = (a[index], b[index]);
            let spread = log_spread(pa.close, pb.close, hedge_ratio)
                .map_err(|source| BacktestError::Spread { index, source })?;

            if index >= window_length {
                let z = window.z_score(spread).map_err(|e| match e {
                    WindowError::Degenerate { std_dev, .. } => BacktestError::DegenerateWindow {
                        index,
                        date: pa.date,
                        std_dev,
                    },
                    WindowError::NotReady { need, .. } => BacktestError::InsufficientHistory {
                        required: need + 1,
                        available: index,
                    },
                })?;

                let input = DayInput {
                    index,
                    date: pa.date,
                    price_a: pa.close,
                    price_b: pb.close,
                    z,
                };
                let (next, record) = self.advance(state, &input)?;
                state = next;
                days.push(record);

                if observer(&record).is_break() {
                    completed = index + 1 == len;
                    break;
                }
            }

            window.push(spread);
        }

        let positions = state.ledger.into_positions();
        info!(
            days = days.len(),
            positions = positions.len(),
            still_open = positions.iter().filter(|p| p.is_open()).count(),
            final_bankroll = state.bankroll,
            completed,
            "backtest finished"
        );

        Ok(BacktestReport {
            hedge_ratio,
            days,
            positions,
            completed,
        })
    }
}
