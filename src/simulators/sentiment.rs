// src/simulators/sentiment.rs
use crate::config::SentimentConfig;
use crate::types::{NewsItem, Sentiment, SentimentTag};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;

pub struct SentimentSimulator {
    config: SentimentConfig,
    rng: StdRng,
}

impl SentimentSimulator {
    pub fn new(config: SentimentConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn classify(&self, score: i32) -> SentimentTag {
        if score > self.config.positive_above {
            SentimentTag::Positive
        } else if score < self.config.negative_below {
            SentimentTag::Negative
        } else {
            SentimentTag::Neutral
        }
    }

    pub fn next(&mut self) -> Sentiment {
        let draw = self.rng.gen::<f64>();
        // Halves round towards +inf.
        let score = ((draw - self.config.bias) * self.config.scale + 0.5).floor() as i32;
        Sentiment {
            score,
            tag: self.classify(score),
        }
    }

    pub fn headline(sentiment: &Sentiment) -> NewsItem {
        NewsItem {
            time: Utc::now(),
            title: format!(
                "Simulated news: sentiment {} ({})",
                sentiment.tag, sentiment.score
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn simulator() -> SentimentSimulator {
        SentimentSimulator::new(SentimentConfig::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn classification_thresholds() {
        let sim = simulator();
        assert_eq!(sim.classify(3), SentimentTag::Positive);
        assert_eq!(sim.classify(2), SentimentTag::Neutral);
        assert_eq!(sim.classify(-2), SentimentTag::Neutral);
        assert_eq!(sim.classify(-3), SentimentTag::Negative);
    }

    #[test]
    fn scores_stay_in_biased_range() {
        let mut sim = simulator();
        let mut positives = 0;
        for _ in 0..1_000 {
            let s = sim.next();
            assert!((-4..=6).contains(&s.score), "score {}", s.score);
            assert_eq!(s.tag, sim.classify(s.score));
            if s.tag == SentimentTag::Positive {
                positives += 1;
            }
        }
        assert!(positives > 0);
    }

    #[test]
    fn headline_mentions_tag_and_score() {
        let item = SentimentSimulator::headline(&Sentiment {
            score: 4,
            tag: SentimentTag::Positive,
        });
        assert_eq!(item.title, "Simulated news: sentiment Positive (4)");
    }
}
