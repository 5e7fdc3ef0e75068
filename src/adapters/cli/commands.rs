//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the pairs backtester.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::adapters::files::{write_days_csv, write_json, CsvPriceSource};
use crate::application::{BacktestOrchestrator, BacktestOutcome, BacktestRequest, HedgeSource};
use crate::config::{load_config, Config};
use crate::domain::Status;
use crate::strategy::hedge_ratio::{self, HedgeMethod};
use crate::strategy::{AdfTest, PairsConfig};

/// pairs-arb - Pairs-Trading Statistical Arbitrage Backtester
#[derive(Parser, Debug)]
#[command(
    name = "pairs-arb",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Pairs-trading statistical arbitrage backtester",
    long_about = "pairs-arb trades the hedged log-price spread of two instruments on a rolling \
                  z-score, with stop-loss arming, and reports the Sharpe ratio of the bankroll."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pairs backtest on historical data
    Backtest(BacktestCmd),

    /// Estimate the hedge ratio on the training window only
    Hedge(HedgeCmd),

    /// Print the effective configuration as TOML
    Config(ConfigCmd),
}

/// Data selection shared by commands that load prices
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sized instrument symbol (file <DIR>/<SYMBOL>.csv)
    #[arg(short = 'a', long, value_name = "SYMBOL")]
    pub symbol_a: Option<String>,

    /// Hedge instrument symbol
    #[arg(short = 'b', long, value_name = "SYMBOL")]
    pub symbol_b: Option<String>,

    /// Directory holding the price CSV files
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<String>,

    /// First date to load (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last date to load (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Share of the joined history used for hedge estimation
    #[arg(long, value_name = "FRACTION")]
    pub train_fraction: Option<f64>,
}

/// Run backtesting
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    #[command(flatten)]
    pub data: DataArgs,

    /// Use this hedge ratio instead of estimating one
    #[arg(long, value_name = "RATIO", allow_negative_numbers = true)]
    pub hedge_ratio: Option<f64>,

    /// Hedge ratio estimator
    #[arg(long, value_enum, value_name = "METHOD")]
    pub hedge_method: Option<HedgeMethod>,

    /// Override rolling window length
    #[arg(long, value_name = "DAYS")]
    pub window: Option<usize>,

    /// Override entry z-score threshold
    #[arg(long, value_name = "Z")]
    pub entry_z: Option<f64>,

    /// Starting capital for backtest
    #[arg(long, value_name = "AMOUNT")]
    pub capital: Option<f64>,

    /// Print every position opened during the run
    #[arg(long)]
    pub trades: bool,

    /// Export daily series to CSV
    #[arg(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,

    /// Export full results to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Estimate hedge ratio
#[derive(Parser, Debug)]
pub struct HedgeCmd {
    #[command(flatten)]
    pub data: DataArgs,
}

/// Show configuration
#[derive(Parser, Debug)]
pub struct ConfigCmd {
    /// Configuration file to load; prints defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    init_logging(app.verbose, app.debug, configured_level(&app.command).as_deref())?;

    match app.command {
        Command::Backtest(cmd) => backtest_command(cmd).await,
        Command::Hedge(cmd) => hedge_command(cmd).await,
        Command::Config(cmd) => config_command(cmd),
    }
}

/// `[logging] level` of the config file named on the command line, if any.
///
/// Load errors are ignored here; the command itself reports them.
fn configured_level(command: &Command) -> Option<String> {
    let path = match command {
        Command::Backtest(cmd) => cmd.data.config.as_deref(),
        Command::Hedge(cmd) => cmd.data.config.as_deref(),
        Command::Config(cmd) => cmd.config.as_deref(),
    }?;
    load_config(path).ok().map(|c| c.logging.level)
}

/// Initialize logging system
///
/// Precedence: RUST_LOG, then --debug / --verbose, then the config file level.
fn init_logging(verbose: bool, debug: bool, configured: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        configured.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Apply data overrides from the command line and re-validate
fn resolve_config(args: &DataArgs) -> Result<Config> {
    let mut config = load_or_default(args.config.as_deref())?;

    if let Some(ref a) = args.symbol_a {
        config.data.symbol_a = a.clone();
    }
    if let Some(ref b) = args.symbol_b {
        config.data.symbol_b = b.clone();
    }
    if let Some(ref dir) = args.data_dir {
        config.data.dir = dir.clone();
    }
    if args.start.is_some() {
        config.data.start = args.start;
    }
    if args.end.is_some() {
        config.data.end = args.end;
    }
    if let Some(f) = args.train_fraction {
        config.data.train_fraction = f;
    }
    Ok(config)
}

fn request_for(config: &Config) -> BacktestRequest {
    let hedge = match config.data.hedge_ratio {
        Some(h) => HedgeSource::Fixed(h),
        None => HedgeSource::Estimate(config.data.hedge_method),
    };
    BacktestRequest {
        symbol_a: config.data.symbol_a.clone(),
        symbol_b: config.data.symbol_b.clone(),
        start: config.data.start,
        end: config.data.end,
        train_fraction: config.data.train_fraction,
        hedge,
    }
}

/// Handle backtest command
async fn backtest_command(cmd: BacktestCmd) -> Result<()> {
    let mut config = resolve_config(&cmd.data)?;
    if let Some(h) = cmd.hedge_ratio {
        config.data.hedge_ratio = Some(h);
    }
    if let Some(m) = cmd.hedge_method {
        config.data.hedge_method = m;
    }
    if let Some(w) = cmd.window {
        config.strategy.window_length = w;
    }
    if let Some(z) = cmd.entry_z {
        config.strategy.entry_z = z;
    }
    if let Some(c) = cmd.capital {
        config.capital.initial_bankroll = c;
    }
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Starting backtest for {} / {}",
        config.data.symbol_a,
        config.data.symbol_b
    );

    let source = CsvPriceSource::new(config.data.data_dir());
    let orchestrator = BacktestOrchestrator::new(source, PairsConfig::from(&config))
        .context("Failed to create orchestrator")?;
    let request = request_for(&config);
    let outcome = orchestrator.run(&request).await.context("Backtest failed")?;

    print_outcome(&config, &outcome, cmd.trades);

    if let Some(ref path) = cmd.export_csv {
        write_days_csv(&outcome.report.days, path)?;
        println!("  Daily series written to {}", path.display());
    }

    if let Some(ref path) = cmd.export_json {
        let json = serde_json::json!({
            "symbol_a": config.data.symbol_a,
            "symbol_b": config.data.symbol_b,
            "hedge_ratio": outcome.hedge_ratio,
            "fit": outcome.fit,
            "cointegration": outcome.cointegration,
            "training_days": outcome.training_days,
            "testing_days": outcome.testing_days,
            "summary": outcome.summary.as_ref().ok(),
            "summary_error": outcome.summary.as_ref().err().map(|e| e.to_string()),
            "config": PairsConfig::from(&config),
            "report": outcome.report,
        });
        write_json(&json, path)?;
        println!("  Results written to {}", path.display());
    }

    Ok(())
}

fn print_outcome(config: &Config, outcome: &BacktestOutcome, trades: bool) {
    let report = &outcome.report;

    println!("Backtest: {} vs {}", config.data.symbol_a, config.data.symbol_b);
    println!(
        "  Training days: {}  Testing days: {}  Simulated days: {}",
        outcome.training_days,
        outcome.testing_days,
        report.days.len()
    );
    println!("  Hedge ratio: {:.7}", outcome.hedge_ratio);
    if let Some(adf) = &outcome.cointegration {
        print_cointegration(adf);
    }
    if let (Some(first), Some(last)) = (report.days.first(), report.days.last()) {
        println!("  Period: {} .. {}", first.date, last.date);
    }

    match &outcome.summary {
        Ok(summary) => {
            println!("  Final bankroll: {:.2}", summary.final_bankroll);
            println!("  Total return: {:.2}%", summary.total_return * 100.0);
            println!("  Max drawdown: {:.2}%", summary.max_drawdown * 100.0);
            println!(
                "  Positions: {} opened, {} closed, {} stopped out",
                summary.positions_opened, summary.positions_closed, summary.stop_loss_exits
            );
            println!("Daily Sharpe Ratio: {:.2}", summary.sharpe.daily);
            println!("Annualized Sharpe Ratio: {:.2}", summary.sharpe.annualized);
        }
        Err(e) => {
            if let Some(b) = report.final_bankroll() {
                println!("  Final bankroll: {:.2}", b);
            }
            println!("  Sharpe ratio unavailable: {}", e);
        }
    }

    if trades {
        println!("\n  {:>4} {:<5} {:<10} {:<10} {:>12} {:>10} {:<14}", "id", "side", "opened", "closed", "quantity", "pnl", "exit");
        for p in &report.positions {
            let closed = p.close_date().map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
            let pnl = p.realized_pnl().map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());
            let exit = match (p.status(), p.exit_reason()) {
                (Status::Open, _) => "open".to_string(),
                (Status::Closed, Some(reason)) => format!("{reason:?}"),
                (Status::Closed, None) => "closed".to_string(),
            };
            println!(
                "  {:>4} {:<5} {:<10} {:<10} {:>12.4} {:>10} {:<14}",
                p.id(),
                format!("{:?}", p.side()),
                p.open_date(),
                closed,
                p.quantity(),
                pnl,
                exit
            );
        }
    }
}

/// Handle hedge command
async fn hedge_command(cmd: HedgeCmd) -> Result<()> {
    let config = resolve_config(&cmd.data)?;
    config.validate().context("Invalid configuration")?;

    let source = CsvPriceSource::new(config.data.data_dir());
    let orchestrator = BacktestOrchestrator::new(source, PairsConfig::from(&config))?;
    let request = request_for(&config);

    let pair = orchestrator.load_pair(&request).await?;
    let (training, _) = BacktestOrchestrator::<CsvPriceSource>::split(&pair, config.data.train_fraction)?;
    let fit = hedge_ratio::fit(&training.closes_a(), &training.closes_b())
        .context("Failed to fit training window")?;

    let (a, b) = (&config.data.symbol_a, &config.data.symbol_b);
    println!("Training window: {} days", fit.samples);
    println!(
        "  {b} on {a}: intercept {:.7}, slope {:.7}",
        fit.b_on_a.intercept, fit.b_on_a.slope
    );
    println!(
        "  {a} on {b}: intercept {:.7}, slope {:.7} (ols hedge ratio)",
        fit.a_on_b.intercept, fit.a_on_b.slope
    );
    println!("  Correlation: {:.7} (correlation hedge ratio)", fit.correlation);

    match BacktestOrchestrator::<CsvPriceSource>::check_cointegration(&fit, &training) {
        Some(adf) => print_cointegration(&adf),
        None => println!("  Cointegration: not enough data for the ADF test"),
    }
    Ok(())
}

fn print_cointegration(adf: &AdfTest) {
    let cv = adf.critical_values;
    println!(
        "  ADF statistic: {:.4} (lags {}, {} obs; 1% {:.4}, 5% {:.4}, 10% {:.4})",
        adf.statistic, adf.lags, adf.observations, cv.one_pct, cv.five_pct, cv.ten_pct
    );
    println!(
        "  Residual {}",
        if adf.stationary { "stationary at 5%: cointegrated" } else { "has a unit root at 5%: not cointegrated" }
    );
    if let Some(hl) = adf.half_life {
        println!("  Half-life: {:.1} days", hl);
    }
}

/// Handle config command
fn config_command(cmd: ConfigCmd) -> Result<()> {
    let config = load_or_default(cmd.config.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        CliApp::command().debug_assert();
    }

    #[test]
    fn test_parse_backtest_overrides() {
        let app = CliApp::try_parse_from([
            "pairs-arb", "backtest", "-a", "CAML.L", "-b", "GLEN.L", "--hedge-ratio", "-0.4",
            "--hedge-method", "ols", "--window", "30", "--start", "2016-01-04", "--trades", "-v",
        ])
        .unwrap();
        assert!(app.verbose);
        let Command::Backtest(cmd) = app.command else { panic!("expected backtest") };
        assert_eq!(cmd.data.symbol_a.as_deref(), Some("CAML.L"));
        assert_eq!(cmd.hedge_ratio, Some(-0.4));
        assert_eq!(cmd.hedge_method, Some(HedgeMethod::Ols));
        assert_eq!(cmd.window, Some(30));
        assert_eq!(cmd.data.start, NaiveDate::from_ymd_opt(2016, 1, 4));
        assert!(cmd.trades);
    }

    #[test]
    fn test_resolve_config_applies_overrides() {
        let args = DataArgs {
            symbol_a: Some("AAA".into()),
            data_dir: Some("/tmp/px".into()),
            train_fraction: Some(0.5),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.data.symbol_a, "AAA");
        assert_eq!(config.data.symbol_b, "GLEN.L");
        assert_eq!(config.data.dir, "/tmp/px");
        assert_eq!(config.data.train_fraction, 0.5);
    }

    #[test]
    fn test_configured_level_without_file() {
        let app = CliApp::try_parse_from(["pairs-arb", "config"]).unwrap();
        assert_eq!(configured_level(&app.command), None);
    }

    #[test]
    fn test_configured_level_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[logging]\nlevel = \"debug\"\n").unwrap();
        let path = file.path().to_str().unwrap();

        let app = CliApp::try_parse_from(["pairs-arb", "hedge", "-c", path]).unwrap();
        assert_eq!(configured_level(&app.command).as_deref(), Some("debug"));
    }

    #[test]
    fn test_request_prefers_fixed_hedge() {
        let mut config = Config::default();
        assert_eq!(request_for(&config).hedge, HedgeSource::Estimate(HedgeMethod::Correlation));
        config.data.hedge_ratio = Some(0.9);
        assert_eq!(request_for(&config).hedge, HedgeSource::Fixed(0.9));
    }
}
