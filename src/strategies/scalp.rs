// src/strategies/scalp.rs
use crate::config::ScalpConfig;
use crate::core::ledger::Ledger;
use crate::strategies::traits::Strategy;
use crate::types::{MarketSnapshot, PositionMeta, Signal, StrategyTag};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

/// Tiny opportunistic buys while news sentiment runs hot.
pub struct SentimentScalp {
    config: ScalpConfig,
    rng: StdRng,
}

impl SentimentScalp {
    pub fn new(config: ScalpConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &ScalpConfig {
        &self.config
    }
}

impl Strategy for SentimentScalp {
    fn tag(&self) -> StrategyTag {
        StrategyTag::NewsScalp
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn evaluate(&mut self, market: &MarketSnapshot, ledger: &Ledger) -> Vec<Signal> {
        if market.sentiment.score < self.config.score_threshold {
            return Vec::new();
        }
        if self.rng.gen::<f64>() >= self.config.probability {
            return Vec::new();
        }

        debug!(
            "NEWS_SCALP: sentiment {} ({}). Signal: BUY",
            market.sentiment.tag, market.sentiment.score
        );
        vec![Signal::Buy {
            strategy: StrategyTag::NewsScalp,
            size: self.config.allocation_pct / 100.0 * ledger.balance(),
            price: market.price,
            meta: PositionMeta::default(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sentiment, SentimentTag};
    use chrono::Utc;
    use rand::SeedableRng;

    fn scalp(probability: f64) -> SentimentScalp {
        SentimentScalp::new(
            ScalpConfig {
                probability,
                ..ScalpConfig::default()
            },
            StdRng::seed_from_u64(1),
        )
    }

    fn market(score: i32) -> MarketSnapshot {
        MarketSnapshot {
            price: 60_000.0,
            sentiment: Sentiment {
                score,
                tag: SentimentTag::Positive,
            },
            now: Utc::now(),
        }
    }

    #[test]
    fn ignores_scores_below_threshold() {
        let mut strategy = scalp(1.0);
        let ledger = Ledger::new(1.0);
        assert!(strategy.evaluate(&market(2), &ledger).is_empty());
    }

    #[test]
    fn certain_probability_buys_one_percent() {
        let mut strategy = scalp(1.0);
        let ledger = Ledger::new(0.5);
        let signals = strategy.evaluate(&market(3), &ledger);
        assert_eq!(
            signals,
            vec![Signal::Buy {
                strategy: StrategyTag::NewsScalp,
                size: 0.01 * 0.5,
                price: 60_000.0,
                meta: PositionMeta::default(),
            }]
        );
    }

    #[test]
    fn zero_probability_never_buys() {
        let mut strategy = scalp(0.0);
        let ledger = Ledger::new(1.0);
        for _ in 0..100 {
            assert!(strategy.evaluate(&market(6), &ledger).is_empty());
        }
    }

    #[test]
    fn fires_roughly_at_configured_rate() {
        let mut strategy = scalp(0.4);
        let ledger = Ledger::new(1.0);
        let hits = (0..2_000)
            .filter(|_| !strategy.evaluate(&market(5), &ledger).is_empty())
            .count();
        assert!((600..1_000).contains(&hits), "hits {hits}");
    }
}
