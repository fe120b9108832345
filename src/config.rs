// src/config.rs

use crate::error::BotError;
use crate::utils::precision::tick_count;
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PriceFeedConfig {
    pub initial_price: f64,
    pub interval_ms: u64,
    /// Amplitude of the slow sine drift, in quote units per tick.
    pub drift_amplitude: f64,
    /// Divisor applied to the wall clock (ms) before taking the sine.
    pub drift_period_ms: f64,
    /// Width of the uniform noise band centred on zero.
    pub noise_range: f64,
    pub floor_price: f64,
    pub tick_size: Decimal,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            initial_price: 60_000.0,
            interval_ms: 2_000,
            drift_amplitude: 30.0,
            drift_period_ms: 100_000.0,
            noise_range: 200.0,
            floor_price: 1_000.0,
            tick_size: Decimal::ONE,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SentimentConfig {
    pub interval_ms: u64,
    /// Subtracted from the uniform draw; values below 0.5 skew positive.
    pub bias: f64,
    pub scale: f64,
    pub positive_above: i32,
    pub negative_below: i32,
    pub news_capacity: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            interval_ms: 8_000,
            bias: 0.4,
            scale: 10.0,
            positive_above: 2,
            negative_below: -2,
            news_capacity: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub interval_ms: u64,
    pub log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3_000,
            log_capacity: 200,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DcaConfig {
    pub enabled: bool,
    pub allocation_pct: f64,
    pub buy_drop_pct: f64,
    /// Markup over the current price used as reference when no DCA position is open.
    pub reference_markup_pct: f64,
    /// Minimum spacing between two DCA buys. Zero disables the cooldown.
    pub cooldown_secs: u64,
}

impl Default for DcaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allocation_pct: 30.0,
            buy_drop_pct: 3.0,
            reference_markup_pct: 3.0,
            cooldown_secs: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub enabled: bool,
    pub min_price: f64,
    pub max_price: f64,
    pub grids: usize,
    pub allocation_pct: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_price: 58_000.0,
            max_price: 62_000.0,
            grids: 8,
            allocation_pct: 20.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScalpConfig {
    pub enabled: bool,
    pub score_threshold: i32,
    /// Chance of acting on a qualifying sentiment reading, per engine tick.
    pub probability: f64,
    pub allocation_pct: f64,
}

impl Default for ScalpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            score_threshold: 3,
            probability: 0.4,
            allocation_pct: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ManualConfig {
    pub allocation_pct: f64,
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self {
            allocation_pct: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub symbol: String,
    pub base_asset: String,
    pub starting_balance: f64,
    /// Fixed RNG seed for reproducible runs. Entropy is used when absent.
    pub seed: Option<u64>,
    pub export_dir: PathBuf,
    pub log_dir: PathBuf,
    pub price: PriceFeedConfig,
    pub sentiment: SentimentConfig,
    pub engine: EngineConfig,
    pub dca: DcaConfig,
    pub grid: GridConfig,
    pub scalp: ScalpConfig,
    pub manual: ManualConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            base_asset: "BTC".to_string(),
            starting_balance: 0.000_795_43,
            seed: None,
            export_dir: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            price: PriceFeedConfig::default(),
            sentiment: SentimentConfig::default(),
            engine: EngineConfig::default(),
            dca: DcaConfig::default(),
            grid: GridConfig::default(),
            scalp: ScalpConfig::default(),
            manual: ManualConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layers an optional settings file and `APP__*` environment variables
    /// over the built-in defaults, then validates the result.
    pub fn load(path: &str) -> Result<Self, BotError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        let invalid = |msg: String| Err(BotError::InvalidConfig(msg));

        if !(self.starting_balance > 0.0) {
            return invalid(format!(
                "starting_balance must be positive, got {}",
                self.starting_balance
            ));
        }
        if !(self.price.initial_price > 0.0) {
            return invalid(format!(
                "price.initial_price must be positive, got {}",
                self.price.initial_price
            ));
        }
        if self.price.tick_size.is_sign_negative() {
            return invalid("price.tick_size must not be negative".to_string());
        }
        if !self.price.tick_size.is_zero() {
            for (name, price) in [
                ("price.initial_price", self.price.initial_price),
                ("grid.max_price", self.grid.max_price),
            ] {
                if tick_count(price, self.price.tick_size).is_none() {
                    return invalid(format!(
                        "price.tick_size {} is too small for {name} {price}",
                        self.price.tick_size
                    ));
                }
            }
        }
        for (name, ms) in [
            ("price.interval_ms", self.price.interval_ms),
            ("sentiment.interval_ms", self.sentiment.interval_ms),
            ("engine.interval_ms", self.engine.interval_ms),
        ] {
            if ms == 0 {
                return invalid(format!("{name} must be greater than zero"));
            }
        }
        if self.price.drift_period_ms == 0.0 {
            return invalid("price.drift_period_ms must not be zero".to_string());
        }
        if !(self.grid.min_price > 0.0) {
            return invalid(format!(
                "grid.min_price must be positive, got {}",
                self.grid.min_price
            ));
        }
        if self.grid.min_price >= self.grid.max_price {
            return invalid(format!(
                "grid band is empty: min {} >= max {}",
                self.grid.min_price, self.grid.max_price
            ));
        }
        if self.grid.grids == 0 {
            return invalid("grid.grids must be at least 1".to_string());
        }
        for (name, pct) in [
            ("dca.allocation_pct", self.dca.allocation_pct),
            ("grid.allocation_pct", self.grid.allocation_pct),
            ("scalp.allocation_pct", self.scalp.allocation_pct),
            ("manual.allocation_pct", self.manual.allocation_pct),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return invalid(format!("{name} must be within 0..=100, got {pct}"));
            }
        }
        if !(self.dca.buy_drop_pct >= 0.0) {
            return invalid("dca.buy_drop_pct must not be negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.scalp.probability) {
            return invalid(format!(
                "scalp.probability must be within 0..=1, got {}",
                self.scalp.probability
            ));
        }
        if self.engine.log_capacity == 0 || self.sentiment.news_capacity == 0 {
            return invalid("log and news capacities must be non-zero".to_string());
        }
        Ok(())
    }
}
