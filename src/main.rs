//! pairs-arb - Pairs-Trading Statistical Arbitrage Backtester
//!
//! Backtests a rolling z-score strategy on the hedged log spread of two instruments.

use anyhow::Result;

use pairs_arb::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (RUST_LOG and friends)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
