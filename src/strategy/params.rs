//! Strategy Parameters
//!
//! Configuration structs for the pairs-trading backtest.
//! Defaults reproduce the classic +/-2 entry, +/-2.5 arm, +/-3 stop setup
//! over a 20-day window with 1% of bankroll per position.

use serde::{Deserialize, Serialize};

/// Main backtest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairsConfig {
    /// Number of prior days in the rolling spread window
    pub window_length: usize,
    /// Thresholds driving the position state machine
    pub thresholds: ThresholdConfig,
    /// Position sizing and starting capital
    pub capital: CapitalConfig,
    /// Sharpe ratio inputs
    pub performance: PerformanceConfig,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            window_length: 20,
            thresholds: ThresholdConfig::default(),
            capital: CapitalConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl PairsConfig {
    /// Create a new config with a custom rolling window
    pub fn with_window(mut self, window_length: usize) -> Self {
        self.window_length = window_length;
        self
    }

    /// Create a new config with a custom entry threshold
    pub fn with_entry_z(mut self, entry_z: f64) -> Self {
        self.thresholds.entry_z = entry_z;
        self
    }

    /// Create a new config with custom starting capital
    pub fn with_initial_bankroll(mut self, bankroll: f64) -> Self {
        self.capital.initial_bankroll = bankroll;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_length < 2 {
            return Err(ConfigError::InvalidWindow(self.window_length));
        }
        self.thresholds.validate()?;
        self.capital.validate()?;
        self.performance.validate()?;
        Ok(())
    }
}

/// Z-score thresholds, expressed as magnitudes and mirrored for long positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Open a short at z >= entry_z, a long at z <= -entry_z
    pub entry_z: f64,
    /// Mean-reversion exit level the spread must cross
    pub exit_z: f64,
    /// Arm the stop-loss once |z| reaches this level
    pub arm_z: f64,
    /// Close an armed position once |z| reaches this level
    pub stop_z: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            entry_z: 2.0,
            exit_z: 0.0,
            arm_z: 2.5,
            stop_z: 3.0,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.exit_z >= 0.0
            && self.exit_z < self.entry_z
            && self.entry_z <= self.arm_z
            && self.arm_z < self.stop_z;
        if !ordered || !self.stop_z.is_finite() {
            return Err(ConfigError::InvalidThresholds {
                exit: self.exit_z,
                entry: self.entry_z,
                arm: self.arm_z,
                stop: self.stop_z,
            });
        }
        Ok(())
    }
}

/// Capital and sizing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalConfig {
    /// Starting bankroll
    pub initial_bankroll: f64,
    /// Fraction of the current bankroll staked per new position
    pub position_fraction: f64,
}

impl Default for CapitalConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: 10_000.0,
            position_fraction: 0.01,
        }
    }
}

impl CapitalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_bankroll > 0.0 && self.initial_bankroll.is_finite()) {
            return Err(ConfigError::InvalidBankroll(self.initial_bankroll));
        }
        if self.position_fraction <= 0.0 || self.position_fraction > 1.0 {
            return Err(ConfigError::InvalidPositionFraction(self.position_fraction));
        }
        Ok(())
    }
}

/// Performance evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Annual risk-free rate as a fraction (0.0525 = 5.25%)
    pub risk_free_annual: f64,
    /// Trading days per year, used for the daily rate and annualization
    pub trading_days_per_year: u32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            risk_free_annual: 0.0525,
            trading_days_per_year: 252,
        }
    }
}

impl PerformanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.risk_free_annual) {
            return Err(ConfigError::InvalidRiskFreeRate(self.risk_free_annual));
        }
        if self.trading_days_per_year == 0 {
            return Err(ConfigError::InvalidTradingDays(self.trading_days_per_year));
        }
        Ok(())
    }

    /// Daily risk-free rate
    pub fn risk_free_daily(&self) -> f64 {
        self.risk_free_annual / self.trading_days_per_year as f64
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid window length: {0} (minimum 2)")]
    InvalidWindow(usize),
    #[error("Invalid thresholds: exit={exit} entry={entry} arm={arm} stop={stop} (need 0 <= exit < entry <= arm < stop)")]
    InvalidThresholds { exit: f64, entry: f64, arm: f64, stop: f64 },
    #[error("Invalid initial bankroll: {0} (must be > 0)")]
    InvalidBankroll(f64),
    #[error("Invalid position fraction: {0} (must be 0 < fraction <= 1)")]
    InvalidPositionFraction(f64),
    #[error("Invalid risk-free rate: {0} (must be 0 <= rate < 1)")]
    InvalidRiskFreeRate(f64),
    #[error("Invalid trading days per year: {0}")]
    InvalidTradingDays(u32),
}
