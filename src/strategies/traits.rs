// src/strategies/traits.rs
use crate::core::ledger::Ledger;
use crate::types::{MarketSnapshot, Signal, StrategyTag};

pub trait Strategy: Send + Sync {
    fn tag(&self) -> StrategyTag;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    // One-shot decision for the current tick. Signals are executed by the
    // engine against the same ledger after this returns.
    fn evaluate(&mut self, market: &MarketSnapshot, ledger: &Ledger) -> Vec<Signal>;
}
