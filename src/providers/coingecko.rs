use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::price::{PriceSource, sanitize_price};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const QUOTE_CURRENCY: &str = "usd";

const SYMBOL_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("SOL", "solana"),
];

/// Maps a ticker to the provider's coin id, falling back to the lowercased
/// ticker for symbols outside the table.
pub fn symbol_to_id(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    SYMBOL_IDS
        .iter()
        .find(|(ticker, _)| *ticker == upper)
        .map_or_else(|| symbol.to_lowercase(), |(_, id)| (*id).to_string())
}

pub struct CoinGeckoProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tickwatch/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    async fn request_price(&self, coin_id: &str) -> Result<f64> {
        let url = format!("{}/simple/price", self.base_url);
        debug!("Requesting price for {} from {}", coin_id, url);

        let mut request = self
            .client
            .get(&url)
            .query(&[("ids", coin_id), ("vs_currencies", QUOTE_CURRENCY)]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for coin: {}", e, coin_id))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for coin: {}",
                response.status(),
                coin_id
            ));
        }

        let text = response.text().await?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", coin_id, e))?;

        let quote = data
            .get(coin_id)
            .and_then(|coin| coin.get(QUOTE_CURRENCY))
            .ok_or_else(|| anyhow!("No price data found for coin: {}", coin_id))?;

        quote
            .as_f64()
            .and_then(sanitize_price)
            .ok_or_else(|| anyhow!("Invalid price received for {}: {}", coin_id, quote))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoProvider {
    #[instrument(
        name = "CoinGeckoPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Option<f64> {
        let coin_id = symbol_to_id(symbol);
        match self.request_price(&coin_id).await {
            Ok(price) => {
                debug!(price, "Received quote");
                Some(price)
            }
            Err(e) => {
                warn!(error = %e, "Price unavailable");
                None
            }
        }
    }
}
