// src/utils/precision.rs
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a price to the NEAREST multiple of `tick_size`, halves away from zero.
/// Example: price=100.16, tick=0.1 -> 100.2
/// Prices that cannot be expressed in ticks come back unchanged.
pub fn normalize_price(price: f64, tick_size: Decimal) -> f64 {
    if tick_size.is_zero() {
        return price;
    }
    tick_count(price, tick_size)
        .and_then(|ticks| ticks.checked_mul(tick_size))
        .and_then(|p| p.to_f64())
        .unwrap_or(price)
}

/// Number of whole ticks in `price`, or `None` if it overflows a `Decimal`.
pub fn tick_count(price: f64, tick_size: Decimal) -> Option<Decimal> {
    Decimal::from_f64(price)?
        .checked_div(tick_size)
        .map(|t| t.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}
