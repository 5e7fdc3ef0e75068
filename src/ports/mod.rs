//! Ports Layer - Trait definitions for external dependencies
//!
//! The engine itself is synchronous and I/O free; daily price history is
//! supplied through `PriceHistoryPort`, implemented by adapters.

pub mod market_data;
pub mod models;

pub use market_data::{HistoryQuery, MarketDataError, PriceHistoryPort};
pub use models::{AlignmentError, PairHistory, PricePoint};

#[cfg(test)]
pub use market_data::MockPriceHistoryPort;
