use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Account value at the close of one simulated day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BankrollPoint {
    pub date: NaiveDate,
    pub bankroll: f64,
}

/// Simple return from first to last point
pub fn total_return(series: &[BankrollPoint]) -> Option<f64> {
    let first = series.first()?;
    let last = series.last()?;
    if first.bankroll <= 0.0 {
        return None;
    }
    Some(last.bankroll / first.bankroll - 1.0)
}

/// Largest peak-to-trough decline as a fraction of the peak
pub fn max_drawdown(series: &[BankrollPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for point in series {
        peak = peak.max(point.bankroll);
        if peak > 0.0 {
            worst = worst.max((peak - point.bankroll) / peak);
        }
    }
    worst
}
