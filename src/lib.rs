//! # Token Feed Aggregator
//!
//! Aggregates token market data from multiple independent upstream providers
//! (DexScreener, Jupiter, GeckoTerminal), reconciles conflicting readings into
//! one merged view per token, serves that view through a cache-backed
//! paginated query API, and pushes incremental updates to subscribed clients.
//!
//! ## Usage
//!
//! Construct one service per process and pass it to the collaborators that
//! need it:
//!
//! ```no_run
//! use std::sync::Arc;
//! use token_feed_aggregator::{MemoryCache, TokenFeedService, TokenQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(TokenFeedService::new(Arc::new(MemoryCache::new()))?);
//!
//! // Background scheduler: aggregate and broadcast on a fixed interval
//! let scheduler = service.start_scheduler();
//!
//! // Query path: cache-aside paginated listings
//! let page = service.queries().list_tokens(&TokenQuery::default()).await;
//! println!("{} tokens, next cursor: {:?}", page.tokens.len(), page.next_cursor);
//!
//! scheduler.abort();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! scheduler tick / query request
//!     ↓
//! TokenAggregator (concurrent fan-out, one task per source)
//!     ↓
//! TokenSource adapters (throttled by AdaptiveRateLimiter)
//!     ↓
//! merge_token_sets (liquidity-weighted dedup per address)
//!     ↓
//! TokenQueryService (cache-aside, sort, paginate)   SubscriptionHub (diff + fan-out)
//! ```
//!
//! ## Error Handling
//!
//! Source failures never cross the aggregation boundary: a failing adapter
//! contributes an empty result set. Cache failures degrade to cache misses.
//! The only client-facing error is a single-token lookup that no source can
//! resolve:
//!
//! ```no_run
//! use token_feed_aggregator::QueryError;
//! # async fn example(service: token_feed_aggregator::TokenFeedService) {
//! match service.queries().get_token("So11111111111111111111111111111111111111112").await {
//!     Ok(token) => println!("{}: {} SOL", token.ticker, token.price_sol),
//!     Err(QueryError::NotFound { address }) => println!("unknown token {}", address),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

pub mod aggregator;
pub mod broadcast;
pub mod cache;
pub mod constants;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod pagination;
pub mod query;
pub mod rate_limit;
pub mod service;
pub mod source;
pub mod sources;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use aggregator::TokenAggregator;
pub use broadcast::{ClientEvent, SubscriptionHub};
pub use cache::{CacheStore, MemoryCache};
pub use error::{CacheError, QueryError, SourceError};
pub use metrics::SourceMetrics;
pub use query::TokenQueryService;
pub use rate_limit::AdaptiveRateLimiter;
pub use service::TokenFeedService;
pub use source::TokenSource;
pub use types::{
    ComponentHealth, HealthStatus, SortBy, Timeframe, TokenEvent, TokenPage, TokenQuery,
    TokenRecord,
};
