//! Common data structures shared between the market data port and the engine

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily close of one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Date alignment failures between the two legs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("Series have no trading days in common")]
    NoOverlap,

    #[error("Dates differ at index {index}: a={date_a}, b={date_b}")]
    DateMismatch {
        index: usize,
        date_a: NaiveDate,
        date_b: NaiveDate,
    },
}

/// Two date-aligned close series; A is the sized leg, B the hedge leg
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairHistory {
    a: Vec<PricePoint>,
    b: Vec<PricePoint>,
}

impl PairHistory {
    /// Keep only the dates present in both series, in ascending date order.
    ///
    /// Duplicate dates within one series keep the last close seen.
    pub fn inner_join(a: &[PricePoint], b: &[PricePoint]) -> Result<Self, AlignmentError> {
        let b_by_date: BTreeMap<NaiveDate, f64> = b.iter().map(|p| (p.date, p.close)).collect();
        let a_by_date: BTreeMap<NaiveDate, f64> = a.iter().map(|p| (p.date, p.close)).collect();

        let (a, b): (Vec<_>, Vec<_>) = a_by_date
            .into_iter()
            .filter_map(|(date, close_a)| {
                b_by_date
                    .get(&date)
                    .map(|&close_b| (PricePoint::new(date, close_a), PricePoint::new(date, close_b)))
            })
            .unzip();

        if a.is_empty() {
            return Err(AlignmentError::NoOverlap);
        }
        Ok(Self { a, b })
    }

    /// Accept series the caller claims are aligned, verifying dates over the
    /// shorter length. Surplus rows on the longer series are dropped.
    pub fn from_aligned(mut a: Vec<PricePoint>, mut b: Vec<PricePoint>) -> Result<Self, AlignmentError> {
        let len = a.len().min(b.len());
        if len == 0 {
            return Err(AlignmentError::NoOverlap);
        }
        if let Some(index) = (0..len).find(|&i| a[i].date != b[i].date) {
            return Err(AlignmentError::DateMismatch {
                index,
                date_a: a[index].date,
                date_b: b[index].date,
            });
        }
        a.truncate(len);
        b.truncate(len);
        Ok(Self { a, b })
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn leg_a(&self) -> &[PricePoint] {
        &self.a
    }

    pub fn leg_b(&self) -> &[PricePoint] {
        &self.b
    }

    pub fn closes_a(&self) -> Vec<f64> {
        self.a.iter().map(|p| p.close).collect()
    }

    pub fn closes_b(&self) -> Vec<f64> {
        self.b.iter().map(|p| p.close).collect()
    }

    /// Rows `[start, end)` as a new history
    pub fn slice(&self, start: usize, end: usize) -> PairHistory {
        let end = end.min(self.len());
        let start = start.min(end);
        PairHistory {
            a: self.a[start..end].to_vec(),
            b: self.b[start..end].to_vec(),
        }
    }
}
