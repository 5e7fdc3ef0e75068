use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::models::PricePoint;

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("No data for {symbol} between {start:?} and {end:?}")]
    EmptyRange {
        symbol: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Historical data query parameters. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub symbol: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl HistoryQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            start: None,
            end: None,
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Source of daily closing prices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistoryPort: Send + Sync {
    /// Fetch daily closes for one instrument, ascending by date
    async fn fetch_daily_closes(&self, query: &HistoryQuery) -> Result<Vec<PricePoint>, MarketDataError>;
}
