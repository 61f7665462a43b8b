//! Aggregation orchestrator fanning out to all registered sources

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    merge::merge_token_sets, metrics::SourceMetricsCollector, source::TokenSource,
    types::TokenRecord,
};

/// Fans out one aggregation pass to every registered source and merges
/// whatever came back.
///
/// Sources run concurrently with independent failure domains: an erroring or
/// timed-out source contributes an empty result set and neither cancels nor
/// delays its siblings. Result sets always enter the merge in registration
/// order, so output is deterministic for identical inputs.
pub struct TokenAggregator {
    sources: Vec<Arc<dyn TokenSource>>,
    metrics: Arc<SourceMetricsCollector>,
}

impl TokenAggregator {
    /// Creates an orchestrator over the given sources; fan-out order follows
    /// the order of this list.
    pub fn new(sources: Vec<Arc<dyn TokenSource>>) -> Self {
        Self {
            sources,
            metrics: Arc::new(SourceMetricsCollector::new()),
        }
    }

    /// Names of the registered sources, in fan-out order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Per-source request metrics collector
    pub fn metrics(&self) -> Arc<SourceMetricsCollector> {
        self.metrics.clone()
    }

    /// Runs one aggregation pass.
    ///
    /// Returns the merged record set; empty when every source failed, which
    /// is a valid outcome callers must handle (serve stale cache or an empty
    /// page).
    pub async fn aggregate(&self, query: &str) -> Vec<TokenRecord> {
        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = source.clone();
                let query = query.to_string();
                let metrics = self.metrics.clone();

                tokio::spawn(async move {
                    let start = Instant::now();
                    match source.fetch(&query).await {
                        Ok(records) => {
                            metrics
                                .record_request(source.name(), start.elapsed(), true)
                                .await;
                            records
                        }
                        Err(e) => {
                            metrics
                                .record_request(source.name(), start.elapsed(), false)
                                .await;
                            warn!(
                                source = source.name(),
                                error = %e,
                                "source fetch failed, contributing empty set"
                            );
                            Vec::new()
                        }
                    }
                })
            })
            .collect();

        // join_all preserves handle order: result sets line up with the
        // source registration order regardless of completion order.
        let outcomes = join_all(handles).await;

        let mut result_sets = Vec::with_capacity(outcomes.len());
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(records) => result_sets.push(records),
                Err(e) => {
                    warn!(source = source.name(), error = %e, "source task aborted");
                    result_sets.push(Vec::new());
                }
            }
        }

        let merged = merge_token_sets(result_sets);
        debug!(count = merged.len(), "aggregation pass complete");
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{test_record, MockSource};

    #[tokio::test]
    async fn merges_records_across_sources() {
        let mut a = test_record("addr1", "dexscreener");
        a.price_sol = 1.0;
        a.liquidity_sol = 100.0;
        let mut b = test_record("addr1", "jupiter");
        b.price_sol = 2.0;
        b.liquidity_sol = 100.0;

        let aggregator = TokenAggregator::new(vec![
            Arc::new(MockSource::with_records("dexscreener", vec![a])),
            Arc::new(MockSource::with_records("jupiter", vec![b])),
        ]);

        let merged = aggregator.aggregate("SOL").await;

        assert_eq!(merged.len(), 1);
        assert!((merged[0].price_sol - 1.5).abs() < 1e-9);
        assert_eq!(merged[0].sources.len(), 2);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_suppress_others() {
        let record = test_record("addr1", "geckoterminal");

        let failing = Arc::new(MockSource::failing("dexscreener"));
        let healthy = Arc::new(MockSource::with_records(
            "geckoterminal",
            vec![record.clone()],
        ));

        let aggregator = TokenAggregator::new(vec![failing.clone(), healthy.clone()]);
        let merged = aggregator.aggregate("SOL").await;

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].address, "addr1");
        assert_eq!(failing.call_count(), 1);
        assert_eq!(healthy.call_count(), 1);
    }

    #[tokio::test]
    async fn all_sources_failed_is_a_valid_empty_result() {
        let aggregator = TokenAggregator::new(vec![
            Arc::new(MockSource::failing("dexscreener")),
            Arc::new(MockSource::failing("jupiter")),
            Arc::new(MockSource::failing("geckoterminal")),
        ]);

        let merged = aggregator.aggregate("SOL").await;
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn output_follows_registration_order() {
        let first = test_record("addr1", "dexscreener");
        let second = test_record("addr2", "jupiter");

        let aggregator = TokenAggregator::new(vec![
            Arc::new(MockSource::with_records("dexscreener", vec![first])),
            Arc::new(MockSource::with_records("jupiter", vec![second])),
        ]);

        let merged = aggregator.aggregate("SOL").await;

        assert_eq!(merged[0].address, "addr1");
        assert_eq!(merged[1].address, "addr2");
    }

    #[tokio::test]
    async fn failures_are_recorded_in_metrics() {
        let aggregator = TokenAggregator::new(vec![
            Arc::new(MockSource::failing("dexscreener")),
            Arc::new(MockSource::with_records(
                "jupiter",
                vec![test_record("addr1", "jupiter")],
            )),
        ]);

        aggregator.aggregate("SOL").await;

        let metrics = aggregator.metrics();
        let dex = metrics.source_metrics("dexscreener").await;
        let jup = metrics.source_metrics("jupiter").await;

        assert_eq!(dex.total_requests, 1);
        assert_eq!(dex.failed_requests, 1);
        assert_eq!(jup.total_requests, 1);
        assert_eq!(jup.failed_requests, 0);
    }
}
