//! File Adapters
//!
//! - `prices`: `PriceHistoryPort` over one `<SYMBOL>.csv` per instrument
//! - `export`: CSV/JSON writers for backtest output

mod export;
mod prices;

pub use export::{write_days_csv, write_json};
pub use prices::CsvPriceSource;
