//! pairs-arb - Pairs-Trading Statistical Arbitrage Backtester Library
//!
//! Simulates a pairs-trading strategy over aligned daily closes of two
//! instruments: positions open when the rolling z-score of the hedged
//! log spread reaches an entry level and close on mean reversion or on an
//! armed stop-loss. The bankroll series is summarized by its Sharpe ratio.
//!
//! # Modules
//!
//! - `domain`: Positions, the position ledger and the bankroll series
//! - `ports`: Market data port and shared price types
//! - `strategy`: Spread, rolling z-score window, hedge ratio estimation, parameters
//! - `application`: Backtest engine, performance evaluation, orchestration
//! - `adapters`: CSV price files, exports and the CLI
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
