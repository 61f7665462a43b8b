//! Service wiring and the periodic aggregation scheduler
//!
//! One `TokenFeedService` is constructed per process and handed explicitly to
//! the route layer and the push transport; there are no process-wide
//! singletons.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    aggregator::TokenAggregator,
    broadcast::SubscriptionHub,
    cache::CacheStore,
    constants::{BROADCAST_TOP_N, DEFAULT_SEARCH_QUERY, UPDATE_INTERVAL_MS},
    error::SourceError,
    metrics::SourceMetrics,
    query::TokenQueryService,
    rate_limit::AdaptiveRateLimiter,
    source::TokenSource,
    sources::{DexScreenerSource, GeckoTerminalSource, JupiterSource},
    types::{ComponentHealth, HealthStatus},
};

/// Wires the aggregation pipeline, read path, and broadcast hub together.
///
/// The scheduler path and the query path run independent aggregation passes;
/// only the cache store is shared between them.
pub struct TokenFeedService {
    aggregator: Arc<TokenAggregator>,
    query: Arc<TokenQueryService>,
    hub: Arc<SubscriptionHub>,
    cache: Arc<dyn CacheStore>,
}

impl TokenFeedService {
    /// Creates a service over the three production sources, all paced by one
    /// shared rate limiter.
    pub fn new(cache: Arc<dyn CacheStore>) -> Result<Self, SourceError> {
        let limiter = Arc::new(AdaptiveRateLimiter::new());

        let sources: Vec<Arc<dyn TokenSource>> = vec![
            Arc::new(DexScreenerSource::new(limiter.clone())?),
            Arc::new(JupiterSource::new(limiter.clone())?),
            Arc::new(GeckoTerminalSource::new(limiter)?),
        ];

        Ok(Self::with_sources(sources, cache))
    }

    /// Creates a service over custom sources.
    ///
    /// This is primarily for testing with mock sources.
    pub fn with_sources(sources: Vec<Arc<dyn TokenSource>>, cache: Arc<dyn CacheStore>) -> Self {
        let aggregator = Arc::new(TokenAggregator::new(sources));
        let query = Arc::new(TokenQueryService::new(aggregator.clone(), cache.clone()));
        let hub = Arc::new(SubscriptionHub::new());

        Self {
            aggregator,
            query,
            hub,
            cache,
        }
    }

    /// Read path consumed by the route layer
    pub fn queries(&self) -> Arc<TokenQueryService> {
        self.query.clone()
    }

    /// Subscription hub consumed by the push transport
    pub fn hub(&self) -> Arc<SubscriptionHub> {
        self.hub.clone()
    }

    /// Runs one scheduler pass: aggregate and broadcast the top records.
    ///
    /// An empty aggregation result broadcasts nothing; the previous last-seen
    /// state stays in place for the next tick.
    pub async fn run_aggregation_tick(&self) {
        let tokens = self.aggregator.aggregate(DEFAULT_SEARCH_QUERY).await;
        if tokens.is_empty() {
            debug!("aggregation tick produced no records");
            return;
        }

        let top = &tokens[..tokens.len().min(BROADCAST_TOP_N)];
        self.hub.publish_all(top).await;
        info!(count = top.len(), "broadcast tick complete");
    }

    /// Starts the fixed-interval background scheduler.
    ///
    /// Returns the task handle so the process can abort it on shutdown.
    pub fn start_scheduler(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let service = self.clone();

        tokio::spawn(async move {
            info!(
                interval_ms = UPDATE_INTERVAL_MS,
                "starting aggregation scheduler"
            );

            loop {
                service.run_aggregation_tick().await;
                sleep(Duration::from_millis(UPDATE_INTERVAL_MS)).await;
            }
        })
    }

    /// Per-source request metrics, ordered by source name
    pub async fn source_metrics(&self) -> Vec<SourceMetrics> {
        self.aggregator.metrics().all_metrics().await
    }

    /// Perform a health check on the service and its collaborators
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = std::collections::HashMap::new();

        let cache_ok = self.cache.ping().await.is_ok();
        details.insert(
            "cache".to_string(),
            serde_json::json!(if cache_ok { "connected" } else { "disconnected" }),
        );
        details.insert(
            "sources".to_string(),
            serde_json::json!(self.aggregator.source_names()),
        );
        details.insert(
            "connections".to_string(),
            serde_json::json!(self.hub.connection_count().await),
        );

        let (status, message) = if cache_ok {
            (
                HealthStatus::Healthy,
                "token feed is operational".to_string(),
            )
        } else {
            (
                HealthStatus::Degraded,
                "cache store unreachable, serving uncached aggregation".to_string(),
            )
        };

        ComponentHealth {
            name: "token_feed".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ClientEvent;
    use crate::cache::mock::BrokenCache;
    use crate::cache::MemoryCache;
    use crate::source::mock::{test_record, MockSource};
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn tick_broadcasts_to_subscribers() {
        let source = Arc::new(MockSource::with_records(
            "dexscreener",
            vec![test_record("addr1", "dexscreener")],
        ));
        let service =
            TokenFeedService::with_sources(vec![source], Arc::new(MemoryCache::new()));

        let (tx, mut rx) = unbounded_channel();
        let hub = service.hub();
        let id = hub.connect(tx).await;
        hub.dispatch(
            id,
            ClientEvent::Subscribe {
                addresses: vec!["addr1".to_string()],
            },
        )
        .await;

        service.run_aggregation_tick().await;

        let event = rx.try_recv().expect("subscriber should receive an update");
        assert_eq!(event.kind(), "update");
    }

    #[tokio::test]
    async fn failed_tick_broadcasts_nothing() {
        let source = Arc::new(MockSource::failing("dexscreener"));
        let service =
            TokenFeedService::with_sources(vec![source], Arc::new(MemoryCache::new()));

        let (tx, mut rx) = unbounded_channel();
        let hub = service.hub();
        let id = hub.connect(tx).await;
        hub.dispatch(
            id,
            ClientEvent::Subscribe {
                addresses: vec!["addr1".to_string()],
            },
        )
        .await;

        service.run_aggregation_tick().await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn tick_broadcasts_at_most_top_n() {
        let records: Vec<_> = (0..BROADCAST_TOP_N + 10)
            .map(|i| test_record(&format!("addr{}", i), "dexscreener"))
            .collect();
        let source = Arc::new(MockSource::with_records("dexscreener", records));
        let service =
            TokenFeedService::with_sources(vec![source], Arc::new(MemoryCache::new()));

        let beyond = format!("addr{}", BROADCAST_TOP_N + 5);
        let (tx, mut rx) = unbounded_channel();
        let hub = service.hub();
        let id = hub.connect(tx).await;
        hub.dispatch(
            id,
            ClientEvent::Subscribe {
                addresses: vec!["addr0".to_string(), beyond],
            },
        )
        .await;

        service.run_aggregation_tick().await;

        // Only the record inside the top-N window arrives
        let event = rx.try_recv().unwrap();
        assert_eq!(event.address(), "addr0");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn health_reports_cache_state() {
        let source = Arc::new(MockSource::with_records("dexscreener", vec![]));
        let healthy =
            TokenFeedService::with_sources(vec![source.clone()], Arc::new(MemoryCache::new()));
        assert!(matches!(
            healthy.health_check().await.status,
            HealthStatus::Healthy
        ));

        let degraded = TokenFeedService::with_sources(vec![source], Arc::new(BrokenCache));
        let health = degraded.health_check().await;
        assert!(matches!(health.status, HealthStatus::Degraded));
        assert_eq!(
            health.details["cache"],
            serde_json::json!("disconnected")
        );
    }
}
