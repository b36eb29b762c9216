//! Engine and driver configuration.
//!
//! Both structs deserialize with `#[serde(default)]`, so any subset of keys
//! may be given. Environment variables use the `MARKET` prefix and `__` as
//! the separator, e.g. `MARKET__PRICE_BAND_RATIO=0.1` or `MARKET__TICKS=500`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InvalidConfig;
use crate::types::price::TickGrid;

const ENV_PREFIX: &str = "MARKET";
const ENV_SEPARATOR: &str = "__";

/// Order book configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Submitted prices are clamped into `reference × (1 ± price_band_ratio)`
    pub price_band_ratio: Decimal,
    /// A crossing pair executes only if `bid - ask <= ask × max_price_diff_ratio`
    pub max_price_diff_ratio: Decimal,
    /// Prices at or above this use `coarse_tick`
    pub tick_threshold: Decimal,
    pub fine_tick: Decimal,
    pub coarse_tick: Decimal,
    /// Slots pre-allocated in the order arena
    pub order_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let grid = TickGrid::default();
        Self {
            price_band_ratio: Decimal::new(5, 2),
            max_price_diff_ratio: Decimal::new(5, 1),
            tick_threshold: grid.threshold,
            fine_tick: grid.fine_tick,
            coarse_tick: grid.coarse_tick,
            order_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()?;

        cfg.try_deserialize()
    }

    /// Load configuration from file, with environment overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn tick_grid(&self) -> TickGrid {
        TickGrid {
            threshold: self.tick_threshold,
            fine_tick: self.fine_tick,
            coarse_tick: self.coarse_tick,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        check_ratio("price_band_ratio", self.price_band_ratio)?;
        check_ratio("max_price_diff_ratio", self.max_price_diff_ratio)?;
        check_positive("tick_threshold", self.tick_threshold)?;
        check_positive("fine_tick", self.fine_tick)?;
        check_positive("coarse_tick", self.coarse_tick)?;
        if self.order_capacity == 0 {
            return Err(InvalidConfig {
                field: "order_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn check_ratio(field: &'static str, value: Decimal) -> Result<(), InvalidConfig> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(InvalidConfig {
            field,
            reason: format!("{value} is outside (0, 1]"),
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: Decimal) -> Result<(), InvalidConfig> {
    if value <= Decimal::ZERO {
        return Err(InvalidConfig {
            field,
            reason: format!("{value} must be positive"),
        });
    }
    Ok(())
}

/// Simulation driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Number of ticks the demo runs
    pub ticks: u64,
    /// Seed for every strategy RNG
    pub seed: u64,
    /// Run agent decisions on scoped threads within a tick
    pub parallel_decisions: bool,
    /// Instrument symbol
    pub symbol: String,
    /// Opening last price
    pub opening_price: Decimal,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            ticks: 200,
            seed: 42,
            parallel_decisions: true,
            symbol: "ACME".to_string(),
            opening_price: Decimal::from(50),
        }
    }
}

impl DriverConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        check_positive("opening_price", self.opening_price)?;
        if self.symbol.trim().is_empty() {
            return Err(InvalidConfig {
                field: "symbol",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
