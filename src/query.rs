//! Cache-aside read path over the aggregation orchestrator

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::{
    aggregator::TokenAggregator,
    cache::CacheStore,
    constants::{CACHE_TTL_SECS, DEFAULT_SEARCH_QUERY},
    error::QueryError,
    pagination::paginate,
    types::{SortBy, Timeframe, TokenPage, TokenQuery, TokenRecord},
};

/// Cache key for a full listing; derived from the dimensions that determine
/// which records are cached - pagination never enters the key.
fn listing_cache_key(sort_by: SortBy, timeframe: Timeframe) -> String {
    format!("tokens:all:{}:{}", timeframe.as_str(), sort_by.as_str())
}

/// Cache key for a single-token lookup
fn token_cache_key(address: &str) -> String {
    format!("token:{}", address)
}

/// Sorts records by the requested key, descending. Stable, so equal keys keep
/// their merge order.
pub fn sort_tokens(tokens: &mut [TokenRecord], sort_by: SortBy) {
    let key = |t: &TokenRecord| -> f64 {
        match sort_by {
            SortBy::Volume => t.volume_sol,
            SortBy::PriceChange => t.price_change_1h,
            SortBy::MarketCap => t.market_cap_sol,
        }
    };

    tokens.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Serves listing and single-token queries through the cache-aside pattern.
///
/// Cache misses (and cache failures, which degrade to misses) fall through to
/// a fresh aggregation pass; non-empty results are written back with a fixed
/// TTL. Empty aggregation results are served but never cached, so a transient
/// all-sources-down outage cannot pin an empty listing for a full TTL.
pub struct TokenQueryService {
    aggregator: Arc<TokenAggregator>,
    cache: Arc<dyn CacheStore>,
}

impl TokenQueryService {
    /// Creates a query service over the given orchestrator and cache store
    pub fn new(aggregator: Arc<TokenAggregator>, cache: Arc<dyn CacheStore>) -> Self {
        Self { aggregator, cache }
    }

    /// Serves one page of the token listing.
    ///
    /// An empty page is a valid outcome when every source failed and nothing
    /// was cached.
    pub async fn list_tokens(&self, query: &TokenQuery) -> TokenPage {
        let key = listing_cache_key(query.sort_by, query.timeframe);

        let mut tokens = match self.cached_records(&key).await {
            Some(tokens) => tokens,
            None => {
                let fetched = self.aggregator.aggregate(DEFAULT_SEARCH_QUERY).await;
                if !fetched.is_empty() {
                    self.store_records(&key, &fetched).await;
                }
                fetched
            }
        };

        sort_tokens(&mut tokens, query.sort_by);
        paginate(&tokens, query.limit, query.cursor.as_deref())
    }

    /// Looks up a single token by address.
    ///
    /// Misses the cache, runs a full aggregation pass, and surfaces
    /// `QueryError::NotFound` when no source knows the address.
    pub async fn get_token(&self, address: &str) -> Result<TokenRecord, QueryError> {
        let key = token_cache_key(address);

        if let Some(records) = self.cached_records(&key).await {
            if let Some(token) = records.into_iter().next() {
                return Ok(token);
            }
        }

        let tokens = self.aggregator.aggregate(DEFAULT_SEARCH_QUERY).await;
        let found = tokens
            .into_iter()
            .find(|t| t.address == address)
            .ok_or_else(|| QueryError::not_found(address))?;

        self.store_records(&key, std::slice::from_ref(&found)).await;
        Ok(found)
    }

    /// Drops all cached listings, forcing the next query through aggregation
    pub async fn invalidate_listings(&self) {
        if let Err(e) = self.cache.invalidate("tokens:all:").await {
            warn!(error = %e, "cache invalidation failed");
        }
    }

    async fn cached_records(&self, key: &str) -> Option<Vec<TokenRecord>> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(key = key, error = %e, "cached payload undecodable, treating as miss");
                None
            }
        }
    }

    async fn store_records(&self, key: &str, records: &[TokenRecord]) {
        let bytes = match serde_json::to_vec(records) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = key, error = %e, "failed to serialize records for cache");
                return;
            }
        };

        if let Err(e) = self
            .cache
            .set(key, bytes, Duration::from_secs(CACHE_TTL_SECS))
            .await
        {
            warn!(key = key, error = %e, "cache write failed");
        }
    }
}
