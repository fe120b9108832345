pub mod dca;
pub mod grid;
pub mod scalp;
pub mod traits;

use crate::config::{AppConfig, DcaConfig, GridConfig, ScalpConfig};
use crate::types::StrategyTag;
use dca::DcaStrategy;
use grid::GridStrategy;
use rand::rngs::StdRng;
use scalp::SentimentScalp;
use serde::Serialize;
use traits::Strategy;

/// Current settings of every automated strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategySettings {
    pub dca: DcaConfig,
    pub grid: GridConfig,
    pub scalp: ScalpConfig,
}

pub struct StrategyBook {
    pub dca: DcaStrategy,
    pub grid: GridStrategy,
    pub scalp: SentimentScalp,
}

impl StrategyBook {
    pub fn new(config: &AppConfig, rng: StdRng) -> Self {
        Self {
            dca: DcaStrategy::new(config.dca.clone()),
            grid: GridStrategy::new(config.grid.clone(), config.price.tick_size),
            scalp: SentimentScalp::new(config.scalp.clone(), rng),
        }
    }

    pub fn get_mut(&mut self, tag: StrategyTag) -> Option<&mut dyn Strategy> {
        match tag {
            StrategyTag::Dca => Some(&mut self.dca),
            StrategyTag::Grid => Some(&mut self.grid),
            StrategyTag::NewsScalp => Some(&mut self.scalp),
            StrategyTag::Manual => None,
        }
    }

    pub fn settings(&self) -> StrategySettings {
        StrategySettings {
            dca: self.dca.config().clone(),
            grid: self.grid.config().clone(),
            scalp: self.scalp.config().clone(),
        }
    }
}
