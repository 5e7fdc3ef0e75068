//! Application Layer - backtest use cases
//!
//! - `backtest`: the daily simulation loop
//! - `performance`: Sharpe ratio and run summary
//! - `orchestrator`: data loading, train/test split and hedge estimation around a run

pub mod backtest;
pub mod orchestrator;
pub mod performance;

pub use backtest::{BacktestEngine, BacktestError, BacktestReport, BacktestState, DayInput, DayRecord};
pub use orchestrator::{BacktestOrchestrator, BacktestOutcome, BacktestRequest, HedgeSource, OrchestratorError};
pub use performance::{EvaluationError, PerformanceEvaluator, PerformanceSummary, SharpeRatio};
