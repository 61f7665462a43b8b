//! DexScreener source adapter

use crate::{
    constants::{DEXSCREENER_API_URL, DEXSCREENER_MAX_RECORDS, SOL_PRICE_USD, SOURCE_TIMEOUT_MS, USER_AGENT},
    error::SourceError,
    rate_limit::AdaptiveRateLimiter,
    source::TokenSource,
    types::{now_millis, TokenRecord},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// DexScreener search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    pairs: Option<Vec<PairData>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairData {
    base_token: BaseToken,
    #[serde(default)]
    price_native: Option<String>,
    #[serde(default)]
    liquidity: Option<PairLiquidity>,
    #[serde(default)]
    volume: Option<PairVolume>,
    #[serde(default)]
    price_change: Option<PairPriceChange>,
    #[serde(default)]
    txns: Option<PairTxns>,
    #[serde(default)]
    dex_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BaseToken {
    address: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Default, Deserialize)]
struct PairLiquidity {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PairVolume {
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PairPriceChange {
    #[serde(default)]
    h1: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PairTxns {
    #[serde(default)]
    h24: Option<TxnWindow>,
}

#[derive(Debug, Default, Deserialize)]
struct TxnWindow {
    #[serde(default)]
    buys: Option<u64>,
    #[serde(default)]
    sells: Option<u64>,
}

/// DexScreener source adapter
pub struct DexScreenerSource {
    client: Client,
    limiter: Arc<AdaptiveRateLimiter>,
}

impl DexScreenerSource {
    /// Creates a new DexScreener source
    pub fn new(limiter: Arc<AdaptiveRateLimiter>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(SOURCE_TIMEOUT_MS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(SourceError::Network)?;

        Ok(Self { client, limiter })
    }

    /// Maps a search response into normalized records, capped at
    /// `DEXSCREENER_MAX_RECORDS`. Missing numeric fields map to 0.
    fn parse_response(&self, response: SearchResponse, fetched_at: i64) -> Vec<TokenRecord> {
        let pairs = match response.pairs {
            Some(pairs) => pairs,
            None => return Vec::new(),
        };

        pairs
            .into_iter()
            .take(DEXSCREENER_MAX_RECORDS)
            .map(|pair| {
                let liquidity_usd = pair.liquidity.unwrap_or_default().usd.unwrap_or(0.0);
                let volume_h24 = pair.volume.unwrap_or_default().h24.unwrap_or(0.0);
                let txns = pair.txns.unwrap_or_default().h24.unwrap_or_default();

                TokenRecord {
                    address: pair.base_token.address,
                    name: pair.base_token.name,
                    ticker: pair.base_token.symbol,
                    price_sol: pair
                        .price_native
                        .and_then(|p| p.parse::<f64>().ok())
                        .filter(|p| p.is_finite())
                        .unwrap_or(0.0),
                    market_cap_sol: liquidity_usd / SOL_PRICE_USD,
                    volume_sol: volume_h24 / SOL_PRICE_USD,
                    liquidity_sol: liquidity_usd / SOL_PRICE_USD,
                    transaction_count: txns.buys.unwrap_or(0) + txns.sells.unwrap_or(0),
                    price_change_1h: pair
                        .price_change
                        .unwrap_or_default()
                        .h1
                        .unwrap_or(0.0),
                    protocol: pair.dex_id.unwrap_or_else(|| "Unknown".to_string()),
                    sources: vec![self.name().to_string()],
                    last_updated: fetched_at,
                }
            })
            .collect()
    }
}

#[async_trait]
impl TokenSource for DexScreenerSource {
    async fn fetch(&self, query: &str) -> Result<Vec<TokenRecord>, SourceError> {
        self.limiter.throttle(self.name()).await;

        let url = format!("{}?q={}", DEXSCREENER_API_URL, query);
        tracing::debug!(source = self.name(), url = %url, "fetching tokens");

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

        let search: SearchResponse = serde_json::from_str(&response_text).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse DexScreener response: {}", e))
        })?;

        let records = self.parse_response(search, now_millis());

        self.limiter.on_success(self.name());
        tracing::debug!(source = self.name(), count = records.len(), "fetched tokens");

        Ok(records)
    }

    fn name(&self) -> &'static str {
        "dexscreener"
    }
}
