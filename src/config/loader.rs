//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every section is
//! optional; missing keys fall back to the defaults of `PairsConfig`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::hedge_ratio::HedgeMethod;
use crate::strategy::params::{CapitalConfig, PairsConfig, PerformanceConfig, ThresholdConfig};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strategy: StrategySection,
    pub capital: CapitalSection,
    pub performance: PerformanceSection,
    pub data: DataSection,
    pub logging: LoggingSection,
}

/// Strategy configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    /// Prior days in the rolling spread window
    pub window_length: usize,
    /// |z| at which a position is opened
    pub entry_z: f64,
    /// Level the z-score must cross back through to exit (0.0 = the mean)
    pub exit_z: f64,
    /// |z| that arms the stop-loss
    pub arm_z: f64,
    /// |z| that stops out an armed position
    pub stop_z: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        let t = ThresholdConfig::default();
        Self {
            window_length: PairsConfig::default().window_length,
            entry_z: t.entry_z,
            exit_z: t.exit_z,
            arm_z: t.arm_z,
            stop_z: t.stop_z,
        }
    }
}

/// Capital configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapitalSection {
    pub initial_bankroll: f64,
    /// Fraction of bankroll staked per position (0.01 = 1%)
    pub position_fraction: f64,
}

impl Default for CapitalSection {
    fn default() -> Self {
        let c = CapitalConfig::default();
        Self {
            initial_bankroll: c.initial_bankroll,
            position_fraction: c.position_fraction,
        }
    }
}

/// Performance configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSection {
    /// Annual risk-free rate as a fraction (0.0525 = 5.25%)
    pub risk_free_annual: f64,
    pub trading_days_per_year: u32,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        let p = PerformanceConfig::default();
        Self {
            risk_free_annual: p.risk_free_annual,
            trading_days_per_year: p.trading_days_per_year,
        }
    }
}

/// Price data configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory holding `<SYMBOL>.csv` files (`~` is expanded)
    pub dir: String,
    /// Sized leg
    pub symbol_a: String,
    /// Hedge leg
    pub symbol_b: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    /// Leading share of the joined history used to estimate the hedge ratio
    pub train_fraction: f64,
    pub hedge_method: HedgeMethod,
    /// Fixed hedge ratio; skips estimation when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hedge_ratio: Option<f64>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            symbol_a: "CAML.L".to_string(),
            symbol_b: "GLEN.L".to_string(),
            start: None,
            end: None,
            train_fraction: 0.6,
            hedge_method: HedgeMethod::Correlation,
            hedge_ratio: None,
        }
    }
}

impl DataSection {
    /// Data directory with `~` expanded
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).into_owned())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "warn".to_string() }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to render TOML: {0}")]
    RenderError(#[from] toml::ser::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        PairsConfig::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if !(self.data.train_fraction > 0.0 && self.data.train_fraction < 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "train_fraction must be between 0 and 1, got {}",
                self.data.train_fraction
            )));
        }

        if self.data.symbol_a.is_empty() || self.data.symbol_b.is_empty() {
            return Err(ConfigError::ValidationError(
                "symbol_a and symbol_b cannot be empty".to_string(),
            ));
        }

        if self.data.symbol_a == self.data.symbol_b {
            return Err(ConfigError::ValidationError(format!(
                "symbol_a and symbol_b must differ, both are {}",
                self.data.symbol_a
            )));
        }

        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start > end {
                return Err(ConfigError::ValidationError(format!(
                    "start {start} is after end {end}"
                )));
            }
        }

        if let Some(h) = self.data.hedge_ratio {
            if !h.is_finite() {
                return Err(ConfigError::ValidationError(format!("hedge_ratio must be finite, got {h}")));
            }
        }

        Ok(())
    }

    /// Render as TOML, e.g. to seed a new config file
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// Conversion from Config to PairsConfig
impl From<&Config> for PairsConfig {
    fn from(config: &Config) -> Self {
        PairsConfig {
            window_length: config.strategy.window_length,
            thresholds: ThresholdConfig {
                entry_z: config.strategy.entry_z,
                exit_z: config.strategy.exit_z,
                arm_z: config.strategy.arm_z,
                stop_z: config.strategy.stop_z,
            },
            capital: CapitalConfig {
                initial_bankroll: config.capital.initial_bankroll,
                position_fraction: config.capital.position_fraction,
            },
            performance: PerformanceConfig {
                risk_free_annual: config.performance.risk_free_annual,
                trading_days_per_year: config.performance.trading_days_per_year,
            },
        }
    }
}
