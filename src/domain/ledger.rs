//! Position Ledger
//!
//! Sole owner of the pair positions opened during a backtest. Positions
//! only change through `mark_and_maybe_close` (daily mark plus exit rules)
//! and `try_open` (entry rules).

use serde::Serialize;
use tracing::debug;

use crate::domain::position::{DailyMark, Position, PositionError, Side};
use crate::strategy::params::ThresholdConfig;

#[derive(Debug, Clone, Serialize)]
pub struct PositionLedger {
    hedge_ratio: f64,
    thresholds: ThresholdConfig,
    position_fraction: f64,
    positions: Vec<Position>,
    next_id: u64,
}

impl PositionLedger {
    pub fn new(hedge_ratio: f64, thresholds: ThresholdConfig, position_fraction: f64) -> Self {
        Self {
            hedge_ratio,
            thresholds,
            position_fraction,
            positions: Vec::new(),
            next_id: 1,
        }
    }

    /// Mark every open position and apply exit/stop-loss transitions.
    ///
    /// Returns the day's P&L, summed over positions open at the start of the
    /// day. Positions that close today still contribute today's mark.
    pub fn mark_and_maybe_close(&mut self, mark: &DailyMark) -> f64 {
        let daily_pnl: f64 = self
            .positions
            .iter()
            .map(|p| p.mark_to_market(mark.price_a, mark.price_b, self.hedge_ratio))
            .sum();

        let advanced: Vec<Position> = self
            .positions
            .iter()
            .map(|p| {
                let next = p.advance(mark, self.hedge_ratio, &self.thresholds);
                log_transition(p, &next, mark);
                next
            })
            .collect();
        self.positions = advanced;

        daily_pnl
    }

    /// Open at most one position if today's z-score crosses an entry level.
    ///
    /// Nothing is opened while the bankroll is not positive.
    pub fn try_open(
        &mut self,
        mark: &DailyMark,
        bankroll: f64,
    ) -> Result<Option<Position>, PositionError> {
        if bankroll <= 0.0 {
            return Ok(None);
        }

        let side = if mark.z_score >= self.thresholds.entry_z {
            Side::Short
        } else if mark.z_score <= -self.thresholds.entry_z {
            Side::Long
        } else {
            return Ok(None);
        };

        let position = Position::open(
            self.next_id,
            side,
            mark.date,
            bankroll,
            self.position_fraction,
            mark.price_a,
            mark.price_b,
        )?;
        self.next_id += 1;
        self.positions.push(position);

        debug!(
            id = position.id(),
            side = ?side,
            date = %mark.date,
            z = mark.z_score,
            quantity = position.quantity(),
            "opened pair position"
        );
        Ok(Some(position))
    }

    /// All positions in opening order
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open_positions().count()
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }
}

fn log_transition(before: &Position, after: &Position, mark: &DailyMark) {
    if !before.stop_loss_armed() && after.stop_loss_armed() {
        debug!(id = after.id(), date = %mark.date, z = mark.z_score, "stop-loss armed");
    }
    if before.is_open() && !after.is_open() {
        debug!(
            id = after.id(),
            date = %mark.date,
            z = mark.z_score,
            reason = ?after.exit_reason(),
            pnl = after.realized_pnl().unwrap_or_default(),
            "closed pair position"
        );
    }
}
