// src/strategies/grid.rs
use crate::config::GridConfig;
use crate::core::ledger::Ledger;
use crate::strategies::traits::Strategy;
use crate::types::{MarketSnapshot, PositionMeta, Signal, StrategyTag};
use crate::utils::precision::normalize_price;
use rust_decimal::Decimal;
use tracing::debug;

/// Buys at evenly spaced levels inside a price band and sells each level's
/// position once price comes back up through it.
pub struct GridStrategy {
    config: GridConfig,
    tick_size: Decimal,
}

impl GridStrategy {
    pub fn new(config: GridConfig, tick_size: Decimal) -> Self {
        Self { config, tick_size }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn set_band(&mut self, min_price: f64, max_price: f64) {
        self.config.min_price = min_price;
        self.config.max_price = max_price;
    }

    pub fn set_grids(&mut self, grids: usize) {
        self.config.grids = grids;
    }

    pub fn levels(&self) -> Vec<f64> {
        let GridConfig {
            min_price,
            max_price,
            grids,
            ..
        } = self.config;
        let step = (max_price - min_price) / grids.saturating_sub(1).max(1) as f64;
        (0..grids)
            .map(|i| normalize_price(min_price + i as f64 * step, self.tick_size))
            .collect()
    }
}

impl Strategy for GridStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Grid
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn evaluate(&mut self, market: &MarketSnapshot, ledger: &Ledger) -> Vec<Signal> {
        let price = market.price;
        let levels = self.levels();
        let size = self.config.allocation_pct / 100.0 * ledger.balance() / levels.len().max(1) as f64;

        let mut signals = Vec::new();
        let mut bought: Vec<f64> = Vec::new();
        let mut sold: Vec<&str> = Vec::new();

        for level in levels {
            let existing = ledger.open_at_grid_level(level);

            if price <= level && existing.is_none() && !bought.contains(&level) {
                debug!("GRID: price {} at or below level {}. Signal: BUY", price, level);
                bought.push(level);
                signals.push(Signal::Buy {
                    strategy: StrategyTag::Grid,
                    size,
                    price,
                    meta: PositionMeta::grid(level),
                });
            }

            if price >= level {
                if let Some(position) = existing {
                    if !sold.contains(&position.id.as_str()) {
                        debug!(
                            "GRID: price {} at or above level {}. Signal: SELL {}",
                            price, level, position.id
                        );
                        sold.push(position.id.as_str());
                        signals.push(Signal::Sell {
                            position_id: position.id.clone(),
                            price,
                        });
                    }
                }
            }
        }

        signals
    }
}
