//! GeckoTerminal source adapter

use crate::{
    constants::{GECKO_TERMINAL_API_URL, GECKO_TERMINAL_MAX_RECORDS, SOL_PRICE_USD, SOURCE_TIMEOUT_MS, USER_AGENT},
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

/// GeckoTerminal network tokens response
#[derive(Debug, Deserialize)]
struct TokensResponse {
    data: Option<Vec<TokenItem>>,
}

#[derive(Debug, Deserialize)]
struct TokenItem {
    attributes: TokenAttributes,
}

#[derive(Debug, Deserialize)]
struct TokenAttributes {
    address: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    fdv_usd: Option<String>,
    #[serde(default)]
    volume_usd: Option<VolumeUsd>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeUsd {
    #[serde(default)]
    h24: Option<String>,
}

/// GeckoTerminal source adapter.
///
/// Reports USD figures as decimal strings; everything is converted to SOL
/// with the fixed conversion rate. The endpoint carries no liquidity or
/// transaction data, so those fields are always 0.
pub struct GeckoTerminalSource {
    client: Client,
    limiter: Arc<AdaptiveRateLimiter>,
}

impl GeckoTerminalSource {
    /// Creates a new GeckoTerminal source
    pub fn new(limiter: Arc<AdaptiveRateLimiter>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(SOURCE_TIMEOUT_MS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(SourceError::Network)?;

        Ok(Self { client, limiter })
    }

    /// Maps a tokens response into normalized records, capped at
    /// `GECKO_TERMINAL_MAX_RECORDS`. Unparseable numeric strings map to 0.
    fn parse_response(&self, response: TokensResponse, fetched_at: i64) -> Vec<TokenRecord> {
        let data = match response.data {
            Some(data) => data,
            None => return Vec::new(),
        };

        data.into_iter()
            .take(GECKO_TERMINAL_MAX_RECORDS)
            .map(|item| {
                let attrs = item.attributes;
                TokenRecord {
                    address: attrs.address,
                    name: attrs.name,
                    ticker: attrs.symbol,
                    price_sol: parse_usd(attrs.price_usd) / SOL_PRICE_USD,
                    market_cap_sol: parse_usd(attrs.fdv_usd) / SOL_PRICE_USD,
                    volume_sol: parse_usd(attrs.volume_usd.unwrap_or_default().h24)
                        / SOL_PRICE_USD,
                    liquidity_sol: 0.0,
                    transaction_count: 0,
                    price_change_1h: 0.0,
                    protocol: "GeckoTerminal".to_string(),
                    sources: vec![self.name().to_string()],
                    last_updated: fetched_at,
                }
            })
            .collect()
    }
}

/// Parses an optional decimal string, substituting 0 when absent or malformed
fn parse_usd(value: Option<String>) -> f64 {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[async_trait]
impl TokenSource for GeckoTerminalSource {
    async fn fetch(&self, _query: &str) -> Result<Vec<TokenRecord>, SourceError> {
        self.limiter.throttle(self.name()).await;

        let url = format!("{}?page=1", GECKO_TERMINAL_API_URL);
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

        let tokens: TokensResponse = serde_json::from_str(&response_text).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse GeckoTerminal response: {}", e))
        })?;

        let records = self.parse_response(tokens, now_millis());

        self.limiter.on_success(self.name());
        tracing::debug!(source = self.name(), count = records.len(), "fetched tokens");

        Ok(records)
    }

    fn name(&self) -> &'static str {
        "geckoterminal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> GeckoTerminalSource {
        GeckoTerminalSource::new(Arc::new(AdaptiveRateLimiter::new())).unwrap()
    }

    #[test]
    fn parses_token_attributes() {
        let body = r#"{
            "data": [{
                "attributes": {
                    "address": "addr1",
                    "name": "Token A",
                    "symbol": "TKA",
                    "price_usd": "250.0",
                    "fdv_usd": "1000000.0",
                    "volume_usd": {"h24": "50000.0"}
                }
            }]
        }"#;
        let response: TokensResponse = serde_json::from_str(body).unwrap();
        let records = source().parse_response(response, 7);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.address, "addr1");
        assert_eq!(record.price_sol, 2.5);
        assert_eq!(record.market_cap_sol, 10000.0);
        assert_eq!(record.volume_sol, 500.0);
        assert_eq!(record.liquidity_sol, 0.0);
        assert_eq!(record.transaction_count, 0);
        assert_eq!(record.protocol, "GeckoTerminal");
        assert_eq!(record.last_updated, 7);
    }

    #[test]
    fn substitutes_zero_for_bad_numeric_strings() {
        let body = r#"{
            "data": [{
                "attributes": {
                    "address": "addr2",
                    "name": "Odd",
                    "symbol": "ODD",
                    "price_usd": "NaN",
                    "fdv_usd": "garbage"
                }
            }]
        }"#;
        let response: TokensResponse = serde_json::from_str(body).unwrap();
        let records = source().parse_response(response, 0);

        assert_eq!(records[0].price_sol, 0.0);
        assert_eq!(records[0].market_cap_sol, 0.0);
        assert_eq!(records[0].volume_sol, 0.0);
    }

    #[test]
    fn truncates_to_record_cap() {
        let item = r#"{"attributes": {"address": "a", "name": "T", "symbol": "T"}}"#;
        let body = format!(
            r#"{{"data": [{}]}}"#,
            std::iter::repeat(item).take(30).collect::<Vec<_>>().join(",")
        );
        let response: TokensResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(
            source().parse_response(response, 0).len(),
            GECKO_TERMINAL_MAX_RECORDS
        );
    }
}
