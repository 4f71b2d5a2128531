//! Pricing abstractions

use async_trait::async_trait;

/// Quotes above this are treated as a provider fault rather than a price.
pub const MAX_SANE_PRICE: f64 = 1_000_000_000.0;

/// A source of current USD quotes.
///
/// `None` is the only failure signal: timeouts, bad responses and rejected
/// values all collapse into absence so one symbol cannot abort a cycle.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Option<f64>;
}

/// Accepts finite, positive quotes up to [`MAX_SANE_PRICE`].
pub fn sanitize_price(price: f64) -> Option<f64> {
    (price.is_finite() && price > 0.0 && price <= MAX_SANE_PRICE).then_some(price)
}
