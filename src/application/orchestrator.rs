//! Backtest Orchestrator
//!
//! Loads both legs through the market data port, inner-joins them by date,
//! splits the joined history into a training and a testing window, derives
//! the hedge ratio from the training window and backtests the testing window.

use chrono::NaiveDate;
use thiserror::Error;

use crate::application::backtest::{BacktestEngine, BacktestError, BacktestReport};
use crate::application::performance::{EvaluationError, PerformanceEvaluator, PerformanceSummary};
use crate::ports::{AlignmentError, HistoryQuery, MarketDataError, PairHistory, PriceHistoryPort};
use crate::strategy::cointegration::{self, AdfTest};
use crate::strategy::hedge_ratio::{self, HedgeMethod, HedgeRatioError, RegressionFit};
use crate::strategy::params::PairsConfig;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
    #[error("Alignment error: {0}")]
    Alignment(#[from] AlignmentError),
    #[error("Hedge ratio error: {0}")]
    HedgeRatio(#[from] HedgeRatioError),
    #[error("Backtest error: {0}")]
    Backtest(#[from] BacktestError),
    #[error("Invalid train fraction: {0} (must be 0 < f < 1)")]
    InvalidTrainFraction(f64),
}

/// Lagged differences in the training residual ADF test
pub const ADF_LAGS: usize = 1;

/// Where the hedge ratio comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HedgeSource {
    /// Caller-supplied scalar
    Fixed(f64),
    /// Estimated on the training window
    Estimate(HedgeMethod),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub symbol_a: String,
    pub symbol_b: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub train_fraction: f64,
    pub hedge: HedgeSource,
}

impl BacktestRequest {
    pub fn new(symbol_a: impl Into<String>, symbol_b: impl Into<String>) -> Self {
        Self {
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
            start: None,
            end: None,
            train_fraction: 0.6,
            hedge: HedgeSource::Estimate(HedgeMethod::Correlation),
        }
    }
}

#[derive(Debug)]
pub struct BacktestOutcome {
    pub hedge_ratio: f64,
    /// Present when the training window could be fitted
    pub fit: Option<RegressionFit>,
    /// ADF test of the training residual, when it could be computed
    pub cointegration: Option<AdfTest>,
    pub training_days: usize,
    pub testing_days: usize,
    pub report: BacktestReport,
    pub summary: Result<PerformanceSummary, EvaluationError>,
}

/// Coordinates data loading, hedge estimation and the backtest engine
pub struct BacktestOrchestrator<P> {
    source: P,
    engine: BacktestEngine,
    evaluator: PerformanceEvaluator,
}

impl<P: PriceHistoryPort> BacktestOrchestrator<P> {
    pub fn new(source: P, config: PairsConfig) -> Result<Self, OrchestratorError> {
        let evaluator = PerformanceEvaluator::new(config.performance.clone());
        let engine = BacktestEngine::new(config)?;
        Ok(Self { source, engine, evaluator })
    }

    /// Fetch both legs concurrently and inner-join them by date
    pub async fn load_pair(&self, request: &BacktestRequest) -> Result<PairHistory, OrchestratorError> {
        let query_a = HistoryQuery::new(&request.symbol_a).between(request.start, request.end);
        let query_b = HistoryQuery::new(&request.symbol_b).between(request.start, request.end);

        let (a, b) = tokio::try_join!(
            self.source.fetch_daily_closes(&query_a),
            self.source.fetch_daily_closes(&query_b),
        )?;

        let pair = PairHistory::inner_join(&a, &b)?;
        tracing::info!(
            "Loaded {} / {}: {} and {} rows, {} aligned days",
            request.symbol_a,
            request.symbol_b,
            a.len(),
            b.len(),
            pair.len()
        );
        Ok(pair)
    }

    /// Training and testing windows of `pair`
    pub fn split(pair: &PairHistory, train_fraction: f64) -> Result<(PairHistory, PairHistory), OrchestratorError> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(OrchestratorError::InvalidTrainFraction(train_fraction));
        }
        let (train_end, test_start) = hedge_ratio::train_test_bounds(pair.len(), train_fraction);
        Ok((pair.slice(0, train_end), pair.slice(test_start, pair.len())))
    }

    /// ADF test on the B-on-A residual of the training window
    pub fn check_cointegration(fit: &RegressionFit, training: &PairHistory) -> Option<AdfTest> {
        let residuals = fit.residuals(&training.closes_a(), &training.closes_b());
        match cointegration::adf_test(&residuals, ADF_LAGS) {
            Ok(adf) => {
                tracing::info!(
                    "ADF statistic {:.4} (5% critical {:.4}), stationary: {}",
                    adf.statistic,
                    adf.critical_values.five_pct,
                    adf.stationary
                );
                if !adf.stationary {
                    tracing::warn!("Training residual is not stationary; the pair may not be cointegrated");
                }
                Some(adf)
            }
            Err(e) => {
                tracing::warn!("Cointegration check skipped: {}", e);
                None
            }
        }
    }

    pub async fn run(&self, request: &BacktestRequest) -> Result<BacktestOutcome, OrchestratorError> {
        let pair = self.load_pair(request).await?;
        let (training, testing) = Self::split(&pair, request.train_fraction)?;

        let fit = hedge_ratio::fit(&training.closes_a(), &training.closes_b());
        let hedge_ratio = match request.hedge {
            HedgeSource::Fixed(h) => h,
            HedgeSource::Estimate(method) => {
                method
                    .estimator()
                    .estimate(&training.closes_a(), &training.closes_b())?
            }
        };

        if let Ok(f) = &fit {
            tracing::info!(
                "Training fit over {} days: b = {:.7} + {:.7} * a, correlation {:.7}",
                f.samples,
                f.b_on_a.intercept,
                f.b_on_a.slope,
                f.correlation
            );
        }
        let cointegration = fit
            .as_ref()
            .ok()
            .and_then(|f| Self::check_cointegration(f, &training));
        tracing::info!("Hedge ratio {:.7} ({:?})", hedge_ratio, request.hedge);

        let report = self.engine.run_pair(&testing, hedge_ratio)?;
        let summary = self.evaluator.summarize(&report);
        if let Err(e) = &summary {
            tracing::warn!("Performance summary unavailable: {}", e);
        }

        Ok(BacktestOutcome {
            hedge_ratio,
            fit: fit.ok(),
            cointegration,
            training_days: training.len(),
            testing_days: testing.len(),
            report,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockPriceHistoryPort, PricePoint};

    fn date(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, 1).unwrap() + chrono::Days::new(i as u64)
    }

    fn leg_b(n: usize) -> Vec<PricePoint> {
        (0..n)
            .map(|i| PricePoint::new(date(i), 20.0 + (i as f64 * 0.37).sin() * 2.0))
            .collect()
    }

    fn leg_a(n: usize) -> Vec<PricePoint> {
        leg_b(n)
            .into_iter()
            .enumerate()
            .map(|(i, p)| PricePoint::new(p.date, 2.0 * p.close + (i as f64 * 1.3).cos()))
            .collect()
    }

    fn mock_source(n: usize) -> MockPriceHistoryPort {
        let mut mock = MockPriceHistoryPort::new();
        mock.expect_fetch_daily_closes()
            .times(2)
            .returning(move |q| match q.symbol.as_str() {
                "AAA" => Ok(leg_a(n)),
                "BBB" => Ok(leg_b(n)),
                other => Err(MarketDataError::UnknownSymbol(other.to_string())),
            });
        mock
    }

    #[tokio::test]
    async fn test_run_splits_and_estimates() {
        let orchestrator = BacktestOrchestrator::new(mock_source(200), PairsConfig::default()).unwrap();
        let request = BacktestRequest::new("AAA", "BBB");

        let outcome = orchestrator.run(&request).await.unwrap();
        assert_eq!(outcome.training_days, 120);
        assert_eq!(outcome.testing_days, 80);
        assert_eq!(outcome.report.days.len(), 80 - 20);

        let fit = outcome.fit.unwrap();
        assert!((outcome.hedge_ratio - fit.correlation).abs() < 1e-12);
        assert!(fit.correlation > 0.8);

        let adf = outcome.cointegration.unwrap();
        assert_eq!(adf.lags, ADF_LAGS);
        assert_eq!(adf.observations, 120 - 1 - ADF_LAGS);
    }

    #[tokio::test]
    async fn test_fixed_hedge_ratio_is_used_verbatim() {
        let orchestrator = BacktestOrchestrator::new(mock_source(150), PairsConfig::default()).unwrap();
        let mut request = BacktestRequest::new("AAA", "BBB");
        request.hedge = HedgeSource::Fixed(1.25);

        let outcome = orchestrator.run(&request).await.unwrap();
        assert_eq!(outcome.hedge_ratio, 1.25);
        assert_eq!(outcome.report.hedge_ratio, 1.25);
    }

    #[tokio::test]
    async fn test_unknown_symbol_propagates() {
        let orchestrator = BacktestOrchestrator::new(mock_source(50), PairsConfig::default()).unwrap();
        let request = BacktestRequest::new("AAA", "ZZZ");
        assert!(matches!(
            orchestrator.run(&request).await,
            Err(OrchestratorError::MarketData(MarketDataError::UnknownSymbol(_)))
        ));
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let pair = PairHistory::inner_join(&leg_a(10), &leg_b(10)).unwrap();
        assert!(matches!(
            BacktestOrchestrator::<MockPriceHistoryPort>::split(&pair, 1.0),
            Err(OrchestratorError::InvalidTrainFraction(_))
        ));
    }
}
