// src/simulators/price.rs
use crate::config::PriceFeedConfig;
use crate::utils::precision::normalize_price;
use rand::rngs::StdRng;
use rand::Rng;

pub struct PriceSimulator {
    config: PriceFeedConfig,
    rng: StdRng,
}

impl PriceSimulator {
    pub fn new(config: PriceFeedConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    /// Slow deterministic wave driven by the wall clock.
    pub fn drift(&self, now_ms: i64) -> f64 {
        (now_ms as f64 / self.config.drift_period_ms).sin() * self.config.drift_amplitude
    }

    /// Uniform noise in `[-noise_range / 2, noise_range / 2)`.
    fn noise(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * self.config.noise_range
    }

    pub fn next_price(&mut self, current: f64, now_ms: i64) -> f64 {
        let raw = current + self.drift(now_ms) + self.noise();
        normalize_price(raw, self.config.tick_size).max(self.config.floor_price)
    }
}
