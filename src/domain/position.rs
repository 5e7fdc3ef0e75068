use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::params::ThresholdConfig;

/// Spread direction of a pair position
///
/// `Long` buys A and sells B; `Short` sells A and buys B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Spread crossed back through the exit level
    MeanReversion,
    /// Armed position ran through the stop level
    StopLoss,
}

/// Market state for one simulated day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyMark {
    pub date: NaiveDate,
    pub price_a: f64,
    pub price_b: f64,
    pub z_score: f64,
    pub prev_z_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    id: u64,
    side: Side,
    status: Status,
    quantity: f64,
    entry_price_a: f64,
    entry_price_b: f64,
    open_date: NaiveDate,
    stop_loss_armed: bool,
    close_date: Option<NaiveDate>,
    exit_reason: Option<ExitReason>,
    realized_pnl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("Cannot size a position from bankroll {0}")]
    InvalidBankroll(f64),
    #[error("Invalid entry price: {0}")]
    InvalidEntryPrice(f64),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(f64),
}

impl Position {
    /// Open a position staking `fraction` of `bankroll` in instrument A
    pub fn open(
        id: u64,
        side: Side,
        date: NaiveDate,
        bankroll: f64,
        fraction: f64,
        price_a: f64,
        price_b: f64,
    ) -> Result<Self, PositionError> {
        if !(bankroll > 0.0) {
            return Err(PositionError::InvalidBankroll(bankroll));
        }
        for price in [price_a, price_b] {
            if !(price > 0.0 && price.is_finite()) {
                return Err(PositionError::InvalidEntryPrice(price));
            }
        }
        let quantity = fraction * bankroll / price_a;
        if !(quantity > 0.0 && quantity.is_finite()) {
            return Err(PositionError::InvalidQuantity(quantity));
        }

        Ok(Self {
            id,
            side,
            status: Status::Open,
            quantity,
            entry_price_a: price_a,
            entry_price_b: price_b,
            open_date: date,
            stop_loss_armed: false,
            close_date: None,
            exit_reason: None,
            realized_pnl: None,
        })
    }

    /// P&L of both legs relative to entry at the given prices; zero once closed
    pub fn mark_to_market(&self, price_a: f64, price_b: f64, hedge_ratio: f64) -> f64 {
        if self.status == Status::Closed {
            return 0.0;
        }
        let q = self.quantity;
        match self.side {
            Side::Short => {
                q * hedge_ratio * (self.entry_price_b - price_b) + q * (price_a - self.entry_price_a)
            }
            Side::Long => {
                q * hedge_ratio * (price_b - self.entry_price_b) + q * (self.entry_price_a - price_a)
            }
        }
    }

    /// Apply one day of exit and stop-loss rules, returning the next state.
    ///
    /// Closed positions are returned unchanged.
    pub fn advance(&self, mark: &DailyMark, hedge_ratio: f64, t: &ThresholdConfig) -> Position {
        let mut next = *self;
        if self.status == Status::Closed {
            return next;
        }

        let (z, prev) = (mark.z_score, mark.prev_z_score);
        let (reverted, arming, stopped_out) = match self.side {
            Side::Short => (
                prev > t.exit_z && z <= t.exit_z,
                z >= t.arm_z && z < t.stop_z,
                z >= t.stop_z,
            ),
            Side::Long => (
                z >= -t.exit_z && prev < -t.exit_z,
                z <= -t.arm_z && z > -t.stop_z,
                z <= -t.stop_z,
            ),
        };

        if arming {
            next.stop_loss_armed = true;
        }

        let exit = if reverted {
            Some(ExitReason::MeanReversion)
        } else if stopped_out && next.stop_loss_armed {
            Some(ExitReason::StopLoss)
        } else {
            None
        };

        if let Some(reason) = exit {
            next.realized_pnl = Some(self.mark_to_market(mark.price_a, mark.price_b, hedge_ratio));
            next.status = Status::Closed;
            next.close_date = Some(mark.date);
            next.exit_reason = Some(reason);
        }
        next
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn entry_price_a(&self) -> f64 {
        self.entry_price_a
    }

    pub fn entry_price_b(&self) -> f64 {
        self.entry_price_b
    }

    pub fn open_date(&self) -> NaiveDate {
        self.open_date
    }

    pub fn stop_loss_armed(&self) -> bool {
        self.stop_loss_armed
    }

    pub fn close_date(&self) -> Option<NaiveDate> {
        self.close_date
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    /// Mark-to-market P&L on the day the position closed
    pub fn realized_pnl(&self) -> Option<f64> {
        self.realized_pnl
    }
}
