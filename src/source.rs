//! Source abstraction for fetching token records from external providers

use crate::{error::SourceError, types::TokenRecord};
use async_trait::async_trait;

/// Trait for upstream token data sources
///
/// Implementations fetch token market data from one provider (DexScreener,
/// Jupiter, GeckoTerminal, ...) and normalize it into `TokenRecord`s. A source
/// owns its pacing: it throttles itself before every request and feeds
/// rate-limit signals back into the shared limiter.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetches and normalizes one batch of token records.
    ///
    /// # Arguments
    /// * `query` - Free-text search term; sources that are not searchable
    ///   ignore it
    ///
    /// # Returns
    /// Normalized records truncated to the source's fixed cap, or an error.
    /// Errors are informational to the orchestrator - it converts any failure
    /// into an empty contribution rather than aborting the pass.
    async fn fetch(&self, query: &str) -> Result<Vec<TokenRecord>, SourceError>;

    /// Returns the name of this source
    fn name(&self) -> &'static str;
}
