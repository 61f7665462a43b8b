//! Cache store abstraction and in-memory TTL implementation
//!
//! The persistent cache is an external collaborator reached only through
//! `CacheStore`. Every operation is fallible; the read path treats any
//! failure as a cache miss and keeps serving.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::CacheError;

/// Generic TTL key-value store holding serialized record lists
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetches the bytes stored under `key`, or `None` when absent/expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key` for `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Drops every entry whose key starts with `prefix`
    async fn invalidate(&self, prefix: &str) -> Result<(), CacheError>;

    /// Probes store reachability
    async fn ping(&self) -> Result<(), CacheError>;
}

struct CacheSlot {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-memory `CacheStore` with per-entry TTL.
///
/// Serves tests and cache-less deployments; expired entries are dropped
/// lazily on read.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheSlot>>,
}

impl MemoryCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(slot) if slot.expires_at > Instant::now() => {
                    return Ok(Some(slot.value.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Entry exists but expired; drop it
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|slot| slot.expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheSlot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, prefix: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
