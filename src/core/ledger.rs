// src/core/ledger.rs
use crate::types::{Position, PositionMeta, StrategyTag};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Outcome of closing a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub position_id: String,
    pub strategy: StrategyTag,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// P&L converted to base units at the exit price.
    pub pnl: f64,
    /// Amount credited back to the balance (`size + pnl`).
    pub credited: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub open_positions: usize,
    pub closed_positions: usize,
    pub wins: usize,
    /// Percentage of closed positions with positive P&L.
    pub win_rate: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    /// Base units currently tied up in open positions.
    pub open_exposure: f64,
}

/// In-memory position book and base-asset balance. Newest positions first.
#[derive(Debug, Clone)]
pub struct Ledger {
    starting_balance: f64,
    balance: f64,
    positions: Vec<Position>,
}

impl Ledger {
    pub fn new(starting_balance: f64) -> Self {
        Self {
            starting_balance,
            balance: starting_balance,
            positions: Vec::new(),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn starting_balance(&self) -> f64 {
        self.starting_balance
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn get(&self, id: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    pub fn most_recent_open(&self, strategy: StrategyTag) -> Option<&Position> {
        self.open_positions().find(|p| p.strategy == strategy)
    }

    pub fn open_at_grid_level(&self, level: f64) -> Option<&Position> {
        self.open_positions()
            .find(|p| p.strategy == StrategyTag::Grid && p.meta.grid_level == Some(level))
    }

    /// Opens a position and debits `size` from the balance.
    /// Returns `None` without touching state when `size` is not positive.
    pub fn buy(
        &mut self,
        strategy: StrategyTag,
        size: f64,
        price: f64,
        meta: PositionMeta,
    ) -> Option<&Position> {
        if !(size > 0.0) {
            return None;
        }

        self.balance -= size;
        let position = Position {
            id: new_position_id(),
            strategy,
            entry_price: price,
            size,
            meta,
            opened_at: Utc::now(),
            sold: false,
            sell_price: None,
            sold_at: None,
        };
        self.positions.insert(0, position);
        self.positions.first()
    }

    /// Closes an open position at `price`, crediting size plus P&L.
    /// Unknown or already-sold positions are left alone.
    pub fn sell(&mut self, id: &str, price: f64) -> Option<ClosedTrade> {
        let position = self
            .positions
            .iter_mut()
            .find(|p| p.id == id && p.is_open())?;

        let pnl = position.pnl_at(price);
        let credited = position.size + pnl;

        position.sold = true;
        position.sell_price = Some(price);
        position.sold_at = Some(Utc::now());
        self.balance += credited;

        Some(ClosedTrade {
            position_id: position.id.clone(),
            strategy: position.strategy,
            size: position.size,
            entry_price: position.entry_price,
            exit_price: price,
            pnl,
            credited,
        })
    }

    pub fn reset(&mut self) {
        self.balance = self.starting_balance;
        self.positions.clear();
    }

    pub fn stats(&self, price: f64) -> LedgerStats {
        let mut stats = LedgerStats::default();

        for position in &self.positions {
            match position.realized_pnl() {
                Some(pnl) => {
                    stats.closed_positions += 1;
                    stats.realized_pnl += pnl;
                    if pnl > 0.0 {
                        stats.wins += 1;
                    }
                }
                None => {
                    stats.open_positions += 1;
                    stats.open_exposure += position.size;
                    stats.unrealized_pnl += position.pnl_at(price);
                }
            }
        }

        if stats.closed_positions > 0 {
            stats.win_rate = stats.wins as f64 / stats.closed_positions as f64 * 100.0;
        }
        stats
    }
}

fn new_position_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        Ledger::new(1.0)
    }

    #[test]
    fn non_positive_buy_is_rejected() {
        let mut ledger = ledger();
        for size in [0.0, -0.5, f64::NAN, f64::NEG_INFINITY] {
            assert!(ledger
                .buy(StrategyTag::Manual, size, 60_000.0, PositionMeta::default())
                .is_none());
        }
        assert_eq!(ledger.balance(), 1.0);
        assert!(ledger.positions().is_empty());
    }

    #[test]
    fn buy_debits_exact_size_and_prepends() {
        let mut ledger = ledger();
        ledger.buy(StrategyTag::Dca, 0.1, 60_000.0, PositionMeta::default());
        let before = ledger.balance();

        let id = ledger
            .buy(StrategyTag::Grid, 0.25, 59_000.0, PositionMeta::grid(59_000.0))
            .map(|p| p.id.clone())
            .unwrap();

        assert_eq!(ledger.balance(), before - 0.25);
        let newest = &ledger.positions()[0];
        assert_eq!(newest.id, id);
        assert_eq!(newest.entry_price, 59_000.0);
        assert_eq!(newest.size, 0.25);
        assert!(!newest.sold);
        assert_eq!(ledger.positions().len(), 2);
    }

    #[test]
    fn sell_credits_size_plus_pnl_at_exit_price() {
        let mut ledger = ledger();
        let id = ledger
            .buy(StrategyTag::Manual, 0.5, 50_000.0, PositionMeta::default())
            .unwrap()
            .id
            .clone();
        let before = ledger.balance();

        let trade = ledger.sell(&id, 55_000.0).unwrap();

        let expected = 0.5 + ((55_000.0 - 50_000.0) * 0.5) / 55_000.0;
        assert!((ledger.balance() - (before + expected)).abs() < 1e-12);
        assert!((trade.credited - expected).abs() < 1e-12);
        let position = ledger.get(&id).unwrap();
        assert!(position.sold);
        assert_eq!(position.sell_price, Some(55_000.0));
        assert!(position.sold_at.is_some());
    }

    #[test]
    fn selling_twice_or_unknown_is_noop() {
        let mut ledger = ledger();
        let id = ledger
            .buy(StrategyTag::Manual, 0.5, 50_000.0, PositionMeta::default())
            .unwrap()
            .id
            .clone();
        ledger.sell(&id, 40_000.0).unwrap();
        let balance = ledger.balance();

        assert!(ledger.sell(&id, 70_000.0).is_none());
        assert!(ledger.sell("missing", 70_000.0).is_none());
        assert_eq!(ledger.balance(), balance);
        assert_eq!(ledger.get(&id).unwrap().sell_price, Some(40_000.0));
    }

    #[test]
    fn sell_at_zero_price_returns_size_only() {
        let mut ledger = ledger();
        let id = ledger
            .buy(StrategyTag::Manual, 0.5, 50_000.0, PositionMeta::default())
            .unwrap()
            .id
            .clone();
        let trade = ledger.sell(&id, 0.0).unwrap();
        assert_eq!(trade.pnl, 0.0);
        assert_eq!(ledger.balance(), 1.0);
    }

    #[test]
    fn most_recent_open_skips_sold() {
        let mut ledger = ledger();
        ledger.buy(StrategyTag::Dca, 0.1, 61_000.0, PositionMeta::default());
        let newest = ledger
            .buy(StrategyTag::Dca, 0.1, 59_000.0, PositionMeta::default())
            .unwrap()
            .id
            .clone();

        assert_eq!(
            ledger.most_recent_open(StrategyTag::Dca).unwrap().entry_price,
            59_000.0
        );
        ledger.sell(&newest, 60_000.0);
        assert_eq!(
            ledger.most_recent_open(StrategyTag::Dca).unwrap().entry_price,
            61_000.0
        );
        assert!(ledger.most_recent_open(StrategyTag::Grid).is_none());
    }

    #[test]
    fn stats_split_open_and_closed() {
        let mut ledger = ledger();
        let win = ledger
            .buy(StrategyTag::Manual, 0.1, 50_000.0, PositionMeta::default())
            .unwrap()
            .id
            .clone();
        let loss = ledger
            .buy(StrategyTag::Manual, 0.1, 50_000.0, PositionMeta::default())
            .unwrap()
            .id
            .clone();
        ledger.buy(StrategyTag::Manual, 0.2, 50_000.0, PositionMeta::default());
        ledger.sell(&win, 60_000.0);
        ledger.sell(&loss, 40_000.0);

        let stats = ledger.stats(50_000.0);
        assert_eq!(stats.open_positions, 1);
        assert_eq!(stats.closed_positions, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.win_rate, 50.0);
        assert!((stats.open_exposure - 0.2).abs() < 1e-12);
        assert_eq!(stats.unrealized_pnl, 0.0);
    }

    #[test]
    fn reset_restores_starting_balance() {
        let mut ledger = ledger();
        ledger.buy(StrategyTag::Manual, 0.3, 50_000.0, PositionMeta::default());
        ledger.reset();
        assert_eq!(ledger.balance(), 1.0);
        assert!(ledger.positions().is_empty());
    }
}
