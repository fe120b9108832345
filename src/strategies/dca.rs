// src/strategies/dca.rs
use crate::config::DcaConfig;
use crate::core::ledger::Ledger;
use crate::strategies::traits::Strategy;
use crate::types::{MarketSnapshot, PositionMeta, Signal, StrategyTag};
use chrono::Duration;
use tracing::debug;

/// Buys a slice of the balance each time the price has fallen far enough
/// below the most recent open DCA entry.
pub struct DcaStrategy {
    config: DcaConfig,
}

impl DcaStrategy {
    pub fn new(config: DcaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DcaConfig {
        &self.config
    }

    pub fn set_allocation_pct(&mut self, pct: f64) {
        self.config.allocation_pct = pct;
    }

    pub fn set_buy_drop_pct(&mut self, pct: f64) {
        self.config.buy_drop_pct = pct;
    }

    /// Entry of the newest open DCA position, or a synthetic reference
    /// slightly above the current price when none is open.
    pub fn reference_price(&self, price: f64, ledger: &Ledger) -> f64 {
        ledger
            .most_recent_open(StrategyTag::Dca)
            .map(|p| p.entry_price)
            .unwrap_or(price * (1.0 + self.config.reference_markup_pct / 100.0))
    }

    fn cooling_down(&self, market: &MarketSnapshot, ledger: &Ledger) -> bool {
        if self.config.cooldown_secs == 0 {
            return false;
        }
        let cooldown = Duration::seconds(self.config.cooldown_secs as i64);
        ledger
            .positions()
            .iter()
            .find(|p| p.strategy == StrategyTag::Dca)
            .map(|p| market.now - p.opened_at < cooldown)
            .unwrap_or(false)
    }
}

impl Strategy for DcaStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Dca
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn evaluate(&mut self, market: &MarketSnapshot, ledger: &Ledger) -> Vec<Signal> {
        let price = market.price;
        let reference = self.reference_price(price, ledger);
        if reference <= 0.0 {
            return Vec::new();
        }

        let drop_pct = (reference - price) / reference * 100.0;
        if drop_pct < self.config.buy_drop_pct {
            return Vec::new();
        }
        if self.cooling_down(market, ledger) {
            debug!("DCA: drop {:.2}% reached but still cooling down", drop_pct);
            return Vec::new();
        }

        debug!(
            "DCA: price {} is {:.2}% below reference {}. Signal: BUY",
            price, drop_pct, reference
        );
        vec![Signal::Buy {
            strategy: StrategyTag::Dca,
            size: self.config.allocation_pct / 100.0 * ledger.balance(),
            price,
            meta: PositionMeta::default(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sentiment;
    use chrono::Utc;

    fn market(price: f64) -> MarketSnapshot {
        MarketSnapshot {
            price,
            sentiment: Sentiment::default(),
            now: Utc::now(),
        }
    }

    #[test]
    fn synthetic_reference_is_below_default_threshold() {
        let mut dca = DcaStrategy::new(DcaConfig::default());
        let ledger = Ledger::new(1.0);
        assert!(dca.evaluate(&market(60_000.0), &ledger).is_empty());
    }

    #[test]
    fn synthetic_reference_triggers_with_lower_threshold() {
        let mut dca = DcaStrategy::new(DcaConfig {
            buy_drop_pct: 2.5,
            ..DcaConfig::default()
        });
        let ledger = Ledger::new(1.0);
        let signals = dca.evaluate(&market(60_000.0), &ledger);
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn buys_allocation_after_drop_from_last_open_entry() {
        let mut dca = DcaStrategy::new(DcaConfig::default());
        let mut ledger = Ledger::new(1.0);
        ledger.buy(StrategyTag::Dca, 0.1, 60_000.0, PositionMeta::default());

        assert!(dca.evaluate(&market(58_500.0), &ledger).is_empty());

        let signals = dca.evaluate(&market(58_200.0), &ledger);
        assert_eq!(
            signals,
            vec![Signal::Buy {
                strategy: StrategyTag::Dca,
                size: 0.3 * 0.9,
                price: 58_200.0,
                meta: PositionMeta::default(),
            }]
        );
    }

    #[test]
    fn sold_positions_do_not_anchor_reference() {
        let dca = DcaStrategy::new(DcaConfig::default());
        let mut ledger = Ledger::new(1.0);
        let id = ledger
            .buy(StrategyTag::Dca, 0.1, 70_000.0, PositionMeta::default())
            .unwrap()
            .id
            .clone();
        ledger.sell(&id, 70_000.0);

        assert_eq!(dca.reference_price(60_000.0, &ledger), 60_000.0 * 1.03);
    }

    #[test]
    fn cooldown_blocks_consecutive_buys() {
        let mut dca = DcaStrategy::new(DcaConfig {
            cooldown_secs: 3_600,
            ..DcaConfig::default()
        });
        let mut ledger = Ledger::new(1.0);
        ledger.buy(StrategyTag::Dca, 0.1, 60_000.0, PositionMeta::default());

        assert!(dca.evaluate(&market(50_000.0), &ledger).is_empty());

        let later = MarketSnapshot {
            now: Utc::now() + Duration::hours(2),
            ..market(50_000.0)
        };
        assert_eq!(dca.evaluate(&later, &ledger).len(), 1);
    }
}
