//! Mock market data: a drifting, noisy price feed and a random sentiment
//! stream with matching headlines.

pub mod price;
pub mod sentiment;

pub use price::PriceSimulator;
pub use sentiment::SentimentSimulator;
