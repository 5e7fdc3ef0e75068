//! CSV Price Source
//!
//! Reads daily history exported from a market data vendor. Each instrument
//! lives in `<data_dir>/<SYMBOL>.csv` with at least a `Date` and a `Close`
//! column; any other columns (Open, High, Volume, ...) are ignored.
//! Dates may carry a time suffix (`2015-01-02 00:00:00+00:00`); only the
//! calendar day is kept. Rows with an empty or non-numeric close are skipped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::ports::{HistoryQuery, MarketDataError, PriceHistoryPort, PricePoint};

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "Date", alias = "date")]
    date: String,
    #[serde(rename = "Close", alias = "close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    data_dir: PathBuf,
}

impl CsvPriceSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{symbol}.csv"))
    }

    /// Parse CSV text into ascending closes within the query range
    pub fn parse(content: &str, path: &Path, query: &HistoryQuery) -> Result<Vec<PricePoint>, MarketDataError> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for row in reader.deserialize::<PriceRow>() {
            let row = row.map_err(|source| MarketDataError::Csv {
                path: path.display().to_string(),
                source,
            })?;
            let Some(close) = row.close else {
                tracing::debug!("Skipping {} row without close", row.date);
                continue;
            };
            let date = parse_day(&row.date)?;
            if query.contains(date) {
                points.push(PricePoint::new(date, close));
            }
        }

        if points.is_empty() {
            return Err(MarketDataError::EmptyRange {
                symbol: query.symbol.clone(),
                start: query.start,
                end: query.end,
            });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, MarketDataError> {
    let day = raw.trim();
    let day = day.get(..10).unwrap_or(day);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| MarketDataError::ParseError(format!("bad date '{raw}': {e}")))
}

#[async_trait]
impl PriceHistoryPort for CsvPriceSource {
    async fn fetch_daily_closes(&self, query: &HistoryQuery) -> Result<Vec<PricePoint>, MarketDataError> {
        let path = self.path_for(&query.symbol);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarketDataError::UnknownSymbol(query.symbol.clone()));
            }
            Err(source) => {
                return Err(MarketDataError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let points = Self::parse(&content, &path, query)?;
        tracing::debug!("Read {} closes for {} from {}", points.len(), query.symbol, path.display());
        Ok(points)
    }
}
