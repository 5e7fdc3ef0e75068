//! Domain Layer - Core business logic for the pairs backtester
//!
//! Pure types with no I/O:
//! - `position`: a single pair position and its exit/stop-loss state machine
//! - `ledger`: the collection of positions owned by one backtest run
//! - `bankroll`: the account value series and drawdown helpers

pub mod bankroll;
pub mod ledger;
pub mod position;

pub use bankroll::{max_drawdown, total_return, BankrollPoint};
pub use ledger::PositionLedger;
pub use position::{DailyMark, ExitReason, Position, PositionError, Side, Status};
