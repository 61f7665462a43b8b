//! Error types for the token feed aggregator

use thiserror::Error;

/// Errors that can occur when fetching records from an upstream source.
///
/// All of these are recovered at the aggregation boundary: a failing source
/// contributes an empty result set and is never surfaced to API callers.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network request failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Source reported a rate-limit (HTTP 429); backoff has been applied
    #[error("Rate limited by source")]
    RateLimited,

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Source API returned a non-success status
    #[error("Source API error: {0}")]
    Api(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Errors from the cache store.
///
/// Cache failures always degrade to a cache miss in the read path; they never
/// fail a request.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Store is unreachable or refused the operation
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Stored bytes could not be decoded
    #[error("Cache codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CacheError {
    /// Creates an Unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Errors surfaced to API callers by the query layer
#[derive(Debug, Error, Clone)]
pub enum QueryError {
    /// No source knows the requested token address
    #[error("Token not found: {address}")]
    NotFound { address: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Creates a NotFound error
    pub fn not_found(address: &str) -> Self {
        Self::NotFound {
            address: address.to_string(),
        }
    }

    /// Creates an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
