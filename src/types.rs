// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyTag {
    Dca,
    Grid,
    NewsScalp,
    Manual,
}

impl StrategyTag {
    /// Strategies driven by the engine, in evaluation order.
    pub const AUTOMATED: [StrategyTag; 3] =
        [StrategyTag::Dca, StrategyTag::Grid, StrategyTag::NewsScalp];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyTag::Dca => "DCA",
            StrategyTag::Grid => "GRID",
            StrategyTag::NewsScalp => "NEWS_SCALP",
            StrategyTag::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub price: f64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentTag {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentTag::Positive => "Positive",
            SentimentTag::Neutral => "Neutral",
            SentimentTag::Negative => "Negative",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentiment {
    pub score: i32,
    pub tag: SentimentTag,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self {
            score: 0,
            tag: SentimentTag::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub time: DateTime<Utc>,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionMeta {
    pub grid_level: Option<f64>,
}

impl PositionMeta {
    pub fn grid(level: f64) -> Self {
        Self {
            grid_level: Some(level),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub strategy: StrategyTag,
    pub entry_price: f64,
    /// Base-asset units.
    pub size: f64,
    pub meta: PositionMeta,
    pub opened_at: DateTime<Utc>,
    pub sold: bool,
    pub sell_price: Option<f64>,
    pub sold_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        !self.sold
    }

    /// P&L expressed in base units, converted at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        let pnl_quote = (price - self.entry_price) * self.size;
        if price != 0.0 {
            pnl_quote / price
        } else {
            0.0
        }
    }

    pub fn realized_pnl(&self) -> Option<f64> {
        self.sell_price.map(|p| self.pnl_at(p))
    }
}

/// Market view handed to strategies on each engine tick.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot {
    pub price: f64,
    pub sentiment: Sentiment,
    pub now: DateTime<Utc>,
}

/// Decision produced by a strategy for the engine to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Buy {
        strategy: StrategyTag,
        size: f64,
        price: f64,
        meta: PositionMeta,
    },
    Sell {
        position_id: String,
        price: f64,
    },
}

/// Report of an executed simulated order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub side: Side,
    pub strategy: StrategyTag,
    pub position_id: String,
    pub size: f64,
    pub price: f64,
    /// Base-unit P&L credited on a sell.
    pub pnl: Option<f64>,
    pub time: DateTime<Utc>,
}

/// Requests sent from the dashboard (or headless driver) to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    ToggleRunning,
    ManualBuy,
    ManualSell(String),
    Reset,
    ToggleStrategy(StrategyTag),
    SetDcaAllocation(f64),
    SetDcaDrop(f64),
    SetGridBand { min: f64, max: f64 },
    SetGridCount(usize),
    ExportLog,
    ExportSnapshot,
    Quit,
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    TickerUpdate(Ticker),
    News(NewsItem),
    Fill(Fill),
    Running(bool),
    Log(String),
}
