// src/core/state.rs
use crate::config::{AppConfig, ManualConfig};
use crate::core::activity::{ActivityLog, LogEntry};
use crate::core::ledger::{Ledger, LedgerStats};
use crate::strategies::{StrategyBook, StrategySettings};
use crate::types::{
    Fill, MarketSnapshot, NewsItem, Position, PositionMeta, Sentiment, Side, Signal, StrategyTag,
    Ticker,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Shared between the price feed, the sentiment feed, the engine and the
/// dashboard. Every timer callback holds the lock for its whole tick.
pub type SharedState = Arc<Mutex<BotState>>;

#[derive(Debug, Clone)]
pub struct MarketState {
    pub symbol: String,
    pub price: f64,
    pub last_update: Option<DateTime<Utc>>,
    pub sentiment: Sentiment,
    news: VecDeque<NewsItem>,
    news_capacity: usize,
}

impl MarketState {
    pub fn new(symbol: String, price: f64, news_capacity: usize) -> Self {
        Self {
            symbol,
            price,
            last_update: None,
            sentiment: Sentiment::default(),
            news: VecDeque::with_capacity(news_capacity),
            news_capacity,
        }
    }

    pub fn apply_price(&mut self, price: f64) -> Ticker {
        let now = Utc::now();
        self.price = price;
        self.last_update = Some(now);
        Ticker {
            symbol: self.symbol.clone(),
            price,
            timestamp: now.timestamp_millis() as u64,
        }
    }

    pub fn apply_sentiment(&mut self, sentiment: Sentiment, item: NewsItem) {
        self.sentiment = sentiment;
        self.news.push_front(item);
        self.news.truncate(self.news_capacity);
    }

    pub fn news(&self) -> impl Iterator<Item = &NewsItem> {
        self.news.iter()
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> MarketSnapshot {
        MarketSnapshot {
            price: self.price,
            sentiment: self.sentiment,
            now,
        }
    }
}

/// Serializable copy of everything the dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct BotSnapshot {
    pub taken_at: DateTime<Utc>,
    pub running: bool,
    pub symbol: String,
    pub base_asset: String,
    pub price: f64,
    pub sentiment: Sentiment,
    pub news: Vec<NewsItem>,
    pub starting_balance: f64,
    pub balance: f64,
    pub positions: Vec<Position>,
    pub log: Vec<LogEntry>,
    pub strategies: StrategySettings,
    pub stats: LedgerStats,
}

pub struct BotState {
    pub running: bool,
    pub base_asset: String,
    pub market: MarketState,
    pub ledger: Ledger,
    pub log: ActivityLog,
    pub strategies: StrategyBook,
    manual: ManualConfig,
}

impl BotState {
    pub fn new(config: &AppConfig, rng: StdRng) -> Self {
        Self {
            running: false,
            base_asset: config.base_asset.clone(),
            market: MarketState::new(
                config.symbol.clone(),
                config.price.initial_price,
                config.sentiment.news_capacity,
            ),
            ledger: Ledger::new(config.starting_balance),
            log: ActivityLog::new(config.engine.log_capacity),
            strategies: StrategyBook::new(config, rng),
            manual: config.manual.clone(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    pub fn execute(&mut self, signal: Signal) -> Option<Fill> {
        match signal {
            Signal::Buy {
                strategy,
                size,
                price,
                meta,
            } => self.buy(strategy, size, price, meta),
            Signal::Sell { position_id, price } => self.sell(&position_id, price),
        }
    }

    pub fn buy(
        &mut self,
        strategy: StrategyTag,
        size: f64,
        price: f64,
        meta: PositionMeta,
    ) -> Option<Fill> {
        let position_id = self.ledger.buy(strategy, size, price, meta)?.id.clone();

        let message = format!(
            "BUY {:.8} {} @ ${} via {}",
            size, self.base_asset, price, strategy
        );
        info!("{}", message);
        self.log.push(message);

        Some(Fill {
            side: Side::Buy,
            strategy,
            position_id,
            size,
            price,
            pnl: None,
            time: Utc::now(),
        })
    }

    pub fn sell(&mut self, position_id: &str, price: f64) -> Option<Fill> {
        let trade = self.ledger.sell(position_id, price)?;

        let message = format!(
            "SELL {:.8} {} @ ${} (pos {})",
            trade.size, self.base_asset, price, trade.position_id
        );
        info!("{} pnl {:+.8}", message, trade.pnl);
        self.log.push(message);

        Some(Fill {
            side: Side::Sell,
            strategy: trade.strategy,
            position_id: trade.position_id,
            size: trade.size,
            price,
            pnl: Some(trade.pnl),
            time: Utc::now(),
        })
    }

    pub fn manual_buy(&mut self) -> Option<Fill> {
        let size = self.manual.allocation_pct / 100.0 * self.ledger.balance();
        let price = self.market.price;
        self.buy(StrategyTag::Manual, size, price, PositionMeta::default())
    }

    pub fn manual_sell(&mut self, position_id: &str) -> Option<Fill> {
        let price = self.market.price;
        self.sell(position_id, price)
    }

    /// Clears positions and the activity log and restores the starting
    /// balance. Market data and the running flag are left alone.
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.log.clear();
    }

    pub fn snapshot(&self) -> BotSnapshot {
        BotSnapshot {
            taken_at: Utc::now(),
            running: self.running,
            symbol: self.market.symbol.clone(),
            base_asset: self.base_asset.clone(),
            price: self.market.price,
            sentiment: self.market.sentiment,
            news: self.market.news().cloned().collect(),
            starting_balance: self.ledger.starting_balance(),
            balance: self.ledger.balance(),
            positions: self.ledger.positions().to_vec(),
            log: self.log.entries().cloned().collect(),
            strategies: self.strategies.settings(),
            stats: self.ledger.stats(self.market.price),
        }
    }
}
