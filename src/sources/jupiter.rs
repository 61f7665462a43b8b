//! Jupiter price source adapter

use crate::{
    constants::{JUPITER_MAX_IDS, JUPITER_PRICE_API_URL, JUPITER_TRACKED_MINTS, SOURCE_TIMEOUT_MS, USER_AGENT},
    error::SourceError,
    rate_limit::AdaptiveRateLimiter,
    source::TokenSource,
    types::{now_millis, TokenRecord},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Jupiter price API response
#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: Option<HashMap<String, PriceEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceEntry {
    #[serde(default)]
    mint_symbol: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

/// Jupiter source adapter.
///
/// Jupiter's price API is id-addressed rather than searchable, so the adapter
/// queries the fixed tracked-mint list on every pass. Price is the only field
/// the endpoint reports; every other numeric maps to 0.
pub struct JupiterSource {
    client: Client,
    limiter: Arc<AdaptiveRateLimiter>,
    mints: Vec<String>,
}

impl JupiterSource {
    /// Creates a new Jupiter source tracking the default mint list
    pub fn new(limiter: Arc<AdaptiveRateLimiter>) -> Result<Self, SourceError> {
        let mints = JUPITER_TRACKED_MINTS
            .iter()
            .map(|m| m.to_string())
            .collect();
        Self::with_mints(limiter, mints)
    }

    /// Creates a new Jupiter source tracking a custom mint list
    pub fn with_mints(
        limiter: Arc<AdaptiveRateLimiter>,
        mints: Vec<String>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(SOURCE_TIMEOUT_MS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(SourceError::Network)?;

        Ok(Self {
            client,
            limiter,
            mints,
        })
    }

    fn build_url(&self) -> String {
        let ids = self
            .mints
            .iter()
            .take(JUPITER_MAX_IDS)
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(",");

        format!("{}?ids={}", JUPITER_PRICE_API_URL, ids)
    }

    /// Maps a price response into normalized records.
    ///
    /// The response map has no stable order; output is sorted by address so
    /// identical inputs always produce identical record sets.
    fn parse_response(&self, response: PriceResponse, fetched_at: i64) -> Vec<TokenRecord> {
        let data = match response.data {
            Some(data) => data,
            None => return Vec::new(),
        };

        let mut records: Vec<TokenRecord> = data
            .into_iter()
            .map(|(id, entry)| {
                let symbol = entry.mint_symbol;
                TokenRecord {
                    address: id,
                    name: symbol.clone().unwrap_or_else(|| "Unknown".to_string()),
                    ticker: symbol.unwrap_or_else(|| "UNK".to_string()),
                    price_sol: entry.price.unwrap_or(0.0),
                    market_cap_sol: 0.0,
                    volume_sol: 0.0,
                    liquidity_sol: 0.0,
                    transaction_count: 0,
                    price_change_1h: 0.0,
                    protocol: "Jupiter".to_string(),
                    sources: vec![self.name().to_string()],
                    last_updated: fetched_at,
                }
            })
            .collect();

        records.sort_by(|a, b| a.address.cmp(&b.address));
        records
    }
}

#[async_trait]
impl TokenSource for JupiterSource {
    async fn fetch(&self, _query: &str) -> Result<Vec<TokenRecord>, SourceError> {
        if self.mints.is_empty() {
            return Ok(Vec::new());
        }

        self.limiter.throttle(self.name()).await;

        let url = self.build_url();
        tracing::debug!(source = self.name(), url = %url, "fetching prices");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::Network(e)
            }
        })?;

        if response.status().as_u16() == 429 {
            self.limiter.on_rate_limited(self.name());
            return Err(SourceError::RateLimited);
        }

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(SourceError::Network)?;

        let prices: PriceResponse = serde_json::from_str(&response_text).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse Jupiter response: {}", e))
        })?;

        let records = self.parse_response(prices, now_millis());

        self.limiter.on_success(self.name());
        tracing::debug!(source = self.name(), count = records.len(), "fetched prices");

        Ok(records)
    }

    fn name(&self) -> &'static str {
        "jupiter"
    }
}
