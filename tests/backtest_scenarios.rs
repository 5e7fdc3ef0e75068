//! Backtest Scenario Tests
//!
//! End-to-end checks of the engine through the public API:
//! 1. degenerate (constant) prices fail fast
//! 2. a designed spread excursion opens and closes exactly one short
//! 3. a depleted bankroll blocks entries while open positions keep marking
//! 4. structural invariants over seeded random price paths
//!
//! All tests are deterministic.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use pairs_arb::application::{
    BacktestEngine, BacktestError, DayInput, PerformanceEvaluator,
};
use pairs_arb::domain::{ExitReason, Position, Side, Status};
use pairs_arb::ports::PricePoint;
use pairs_arb::strategy::{log_spread, PairsConfig, ZScoreResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Test Fixtures
// ============================================================================

fn date(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 3, 1).unwrap() + Days::new(i as u64)
}

fn points(closes: &[f64]) -> Vec<PricePoint> {
    closes.iter().enumerate().map(|(i, &c)| PricePoint::new(date(i), c)).collect()
}

/// Prices whose hedged log spread follows `spreads`, with a drifting B leg
fn pair_from_spreads(spreads: &[f64], hedge_ratio: f64) -> (Vec<f64>, Vec<f64>) {
    let b: Vec<f64> = (0..spreads.len()).map(|i| 20.0 + 0.1 * i as f64).collect();
    let a = spreads
        .iter()
        .zip(&b)
        .map(|(s, pb)| (s + hedge_ratio * pb.ln()).exp())
        .collect();
    (a, b)
}

fn alternating(n: usize, amplitude: f64) -> Vec<f64> {
    (0..n).map(|i| if i % 2 == 0 { amplitude } else { -amplitude }).collect()
}

/// Correlated random walks for A and B
fn random_pair(seed: u64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut a, mut b) = (50.0_f64, 25.0_f64);
    let mut out_a = Vec::with_capacity(n);
    let mut out_b = Vec::with_capacity(n);
    for _ in 0..n {
        let common: f64 = rng.gen_range(-0.02..0.02);
        a *= 1.0 + common + rng.gen_range(-0.01..0.01);
        b *= 1.0 + common + rng.gen_range(-0.01..0.01);
        out_a.push(a);
        out_b.push(b);
    }
    (out_a, out_b)
}

fn z_day(index: usize, z: f64, price_a: f64, price_b: f64) -> DayInput {
    DayInput {
        index,
        date: date(index),
        price_a,
        price_b,
        z: ZScoreResult { z_score: z, mean: 0.0, std_dev: 1.0, spread: z },
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_constant_prices_raise_degenerate_window() {
    let a = points(&[12.5; 40]);
    let b = points(&[7.25; 40]);
    let engine = BacktestEngine::new(PairsConfig::default()).unwrap();

    let err = engine.run(&a, &b, 0.9).unwrap_err();
    assert!(matches!(err, BacktestError::DegenerateWindow { index: 20, .. }));
}

#[test]
fn test_single_short_round_trip() {
    let h = 0.5;
    // Window of +/-0.01 has mean 0 and std 0.01; day 20 sits at z = 2.1,
    // day 21 drifts back but stays positive, day 22 crosses below the mean
    let mut spreads = alternating(20, 0.01);
    spreads.extend([0.021, 0.012, -0.004]);
    spreads.extend(alternating(10, 0.01));
    let (a, b) = pair_from_spreads(&spreads, h);

    let engine = BacktestEngine::new(PairsConfig::default()).unwrap();
    let report = engine.run(&points(&a), &points(&b), h).unwrap();

    assert_eq!(report.positions.len(), 1);
    let p = report.positions[0];
    assert_eq!(p.side(), Side::Short);
    assert_eq!(p.open_date(), date(20));
    assert_eq!(p.close_date(), Some(date(22)));
    assert_eq!(p.exit_reason(), Some(ExitReason::MeanReversion));
    assert!(!p.stop_loss_armed());
    assert_eq!(p.quantity(), 0.01 * 10_000.0 / a[20]);

    let q = p.quantity();
    let mark = |x: usize| q * h * (b[20] - b[x]) + q * (a[x] - a[20]);
    let (pnl21, pnl22) = (mark(21), mark(22));

    assert!((report.days[0].z_score - 2.1).abs() < 1e-6);
    assert!(report.days[1].z_score > 0.0 && report.days[1].z_score < 2.0);
    assert!(report.days[2].z_score <= 0.0);

    assert_eq!(report.days[0].bankroll, 10_000.0);
    assert!((report.days[1].daily_pnl - pnl21).abs() < 1e-9);
    assert!((report.days[2].daily_pnl - pnl22).abs() < 1e-9);
    assert!((p.realized_pnl().unwrap() - pnl22).abs() < 1e-9);

    let final_bankroll = 10_000.0 + pnl21 + pnl22;
    for day in &report.days[2..] {
        assert!((day.bankroll - final_bankroll).abs() < 1e-9);
    }
    assert_eq!(report.days.last().unwrap().open_positions, 0);
}

#[test]
fn test_depleted_bankroll_blocks_new_entries() {
    let engine = BacktestEngine::new(PairsConfig::default()).unwrap();
    let state = engine.initial_state(1.0);

    // Open a long, then wipe out the account
    let (mut state, _) = engine.advance(state, &z_day(20, -2.4, 40.0, 20.0)).unwrap();
    state.bankroll = 0.0;

    // Every day below sits past the entry level but never reverts to the mean
    for (i, z) in [(21, -2.6), (22, -2.2), (23, -2.3)] {
        let (next, record) = engine.advance(state, &z_day(i, z, 40.0, 20.0)).unwrap();
        assert_eq!(record.bankroll, 0.0);
        assert_eq!(next.ledger.positions().len(), 1, "no entry on day {i}");
        state = next;
    }

    // The surviving long was armed on day 21 and still marks to market
    assert!(state.ledger.positions()[0].stop_loss_armed());
    let (state, record) = engine.advance(state, &z_day(24, -3.1, 38.0, 21.0)).unwrap();
    // q = 2.5: B up 1 (h = 1) and A down 2 -> 2.5 + 5.0
    assert!((record.daily_pnl - 7.5).abs() < 1e-12);
    assert_eq!(state.ledger.positions()[0].exit_reason(), Some(ExitReason::StopLoss));
    assert!((state.bankroll - 7.5).abs() < 1e-12);
}

#[test]
fn test_losses_exhaust_bankroll_and_block_entries() {
    let h = 0.5;
    // Short at z = 2.1 staking the whole bankroll; the spread then settles
    // above the window mean while B climbs a full point a day, so the
    // position bleeds without ever reverting. Days 35-37 jump back above
    // the entry level.
    let mut spreads = alternating(20, 0.01);
    spreads.push(0.021);
    spreads.extend([0.015; 14]);
    spreads.extend([0.04; 3]);
    let b: Vec<f64> = (0..spreads.len())
        .map(|i| if i <= 20 { 20.0 + 0.1 * i as f64 } else { 22.0 + (i - 20) as f64 })
        .collect();
    let a: Vec<f64> = spreads
        .iter()
        .zip(&b)
        .map(|(s, pb)| (s + h * pb.ln()).exp())
        .collect();

    let mut config = PairsConfig::default();
    config.capital.position_fraction = 1.0;
    let engine = BacktestEngine::new(config).unwrap();
    let report = engine.run(&points(&a), &points(&b), h).unwrap();

    assert!(report.days[1..].iter().all(|d| d.daily_pnl < 0.0));
    assert!(report.days[4].bankroll > 0.0);
    assert!(report.days[5..].iter().all(|d| d.bankroll < 0.0));
    assert!((report.days[5].bankroll - (-2697.657)).abs() < 1e-2);

    // Entry signals after the account is gone open nothing
    assert!(report.days[15..].iter().all(|d| d.z_score >= 2.0));
    assert_eq!(report.positions.len(), 1);
    let short = report.positions[0];
    assert_eq!(short.side(), Side::Short);
    assert!(short.is_open());
    assert!(short.stop_loss_armed());
    assert_eq!(report.days.last().unwrap().open_positions, 1);
}

#[test]
fn test_position_sizing_uses_current_bankroll() {
    let engine = BacktestEngine::new(PairsConfig::default()).unwrap();
    for (bankroll, price) in [(10_000.0, 40.0), (12_345.67, 3.3), (0.5, 1999.0)] {
        let mut state = engine.initial_state(0.7);
        state.bankroll = bankroll;
        let (state, _) = engine.advance(state, &z_day(20, 2.0, price, 10.0)).unwrap();
        assert_eq!(state.ledger.positions()[0].quantity(), 0.01 * bankroll / price);
    }
}

// ============================================================================
// Invariants over random paths
// ============================================================================

#[test]
fn test_bankroll_series_length() {
    let engine = BacktestEngine::new(PairsConfig::default()).unwrap();
    for (len_a, len_b) in [(21, 21), (120, 97), (60, 200)] {
        let (a, _) = random_pair(1, len_a);
        let (_, b) = random_pair(2, len_b);
        let report = engine.run(&points(&a), &points(&b), 0.8).unwrap();
        assert_eq!(report.bankroll_series().len(), len_a.min(len_b) - 20);
    }
}

#[test]
fn test_window_uses_exactly_the_prior_days() {
    let (a, b) = random_pair(42, 150);
    let h = 0.9;
    let engine = BacktestEngine::new(PairsConfig::default()).unwrap();
    let report = engine.run(&points(&a), &points(&b), h).unwrap();

    let spreads: Vec<f64> = a.iter().zip(&b).map(|(&pa, &pb)| log_spread(pa, pb, h).unwrap()).collect();
    for (offset, day) in report.days.iter().enumerate() {
        let x = offset + 20;
        let window = &spreads[x - 20..x];
        let mean = window.iter().sum::<f64>() / 20.0;
        let std = (window.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / 20.0).sqrt();

        assert_eq!(day.date, date(x));
        assert!((day.spread - spreads[x]).abs() < 1e-12);
        assert!((day.mean - mean).abs() < 1e-12);
        assert!((day.std_dev - std).abs() < 1e-12);
        assert!((day.z_score - (spreads[x] - mean) / std).abs() < 1e-9);
    }
}

#[test]
fn test_armed_flag_and_closed_positions_never_revert() {
    let engine = BacktestEngine::new(PairsConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let mut state = engine.initial_state(0.6);
    let mut seen: HashMap<u64, Position> = HashMap::new();

    for i in 0..400 {
        let z = rng.gen_range(-4.0..4.0);
        let pa = rng.gen_range(30.0..50.0);
        let pb = rng.gen_range(10.0..20.0);
        let (next, _) = engine.advance(state, &z_day(i, z, pa, pb)).unwrap();

        for p in next.ledger.positions() {
            if let Some(before) = seen.get(&p.id()) {
                if before.status() == Status::Closed {
                    assert_eq!(p, before, "closed position {} mutated", p.id());
                }
                if before.stop_loss_armed() {
                    assert!(p.stop_loss_armed(), "position {} disarmed", p.id());
                }
                assert_eq!(p.quantity(), before.quantity());
                assert_eq!(p.entry_price_a(), before.entry_price_a());
                assert_eq!(p.entry_price_b(), before.entry_price_b());
            }
            seen.insert(p.id(), *p);
        }
        state = next;
    }
    assert!(seen.values().any(|p| p.exit_reason() == Some(ExitReason::StopLoss)));
    assert!(seen.values().any(|p| p.exit_reason() == Some(ExitReason::MeanReversion)));
}

#[test]
fn test_sharpe_scale_invariance_on_engine_output() {
    let mut config = PairsConfig::default().with_entry_z(1.0);
    config.capital.position_fraction = 0.001;
    let engine = BacktestEngine::new(config.clone()).unwrap();
    let (a, b) = random_pair(2024, 300);
    let report = engine.run(&points(&a), &points(&b), 1.0).unwrap();
    assert!(!report.positions.is_empty());

    let evaluator = PerformanceEvaluator::new(config.performance);
    let values = report.bankroll_values();
    let base = evaluator.sharpe_ratio(&values).unwrap();

    let scaled: Vec<f64> = values.iter().map(|v| v * 7.5).collect();
    let s = evaluator.sharpe_ratio(&scaled).unwrap();
    assert!((s.daily - base.daily).abs() < 1e-9);
    assert!((s.annualized - base.annualized).abs() < 1e-7);
    assert!((base.annualized - base.daily * 252f64.sqrt()).abs() < 1e-12);
}
