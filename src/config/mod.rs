//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, CapitalSection, Config, ConfigError, DataSection, LoggingSection, PerformanceSection,
    StrategySection,
};
