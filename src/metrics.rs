//! Source health metrics collection and reporting
//!
//! Tracks latency histograms and success rates per upstream source.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples kept per source for percentile calculation
const MAX_SAMPLES: usize = 100;

/// Metrics for a single source
#[derive(Debug, Clone)]
pub struct SourceMetrics {
    /// Name of the source
    pub source_name: String,
    /// 50th percentile latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of requests tracked
    pub total_requests: u64,
    /// Number of failed requests
    pub failed_requests: u64,
}

impl SourceMetrics {
    /// Creates metrics with no data
    pub fn empty(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

/// Internal sample for latency tracking
#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

/// Rolling window plus lifetime counters for one source
#[derive(Debug, Default)]
struct SourceWindow {
    samples: VecDeque<LatencySample>,
    total_requests: u64,
    failed_requests: u64,
}

/// Collects and computes metrics for all registered sources.
///
/// Windows are keyed by source name and created lazily on the first recorded
/// request.
pub struct SourceMetricsCollector {
    windows: RwLock<HashMap<String, SourceWindow>>,
}

impl SourceMetricsCollector {
    /// Creates a new collector with no per-source state yet
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Records a request against `source` with its duration and outcome
    pub async fn record_request(&self, source: &str, duration: Duration, success: bool) {
        let duration_ms = duration.as_secs_f64() * 1000.0;

        let mut windows = self.windows.write().await;
        let window = windows.entry(source.to_string()).or_default();

        window.total_requests += 1;
        if !success {
            window.failed_requests += 1;
        }

        if window.samples.len() >= MAX_SAMPLES {
            window.samples.pop_front();
        }
        window.samples.push_back(LatencySample {
            duration_ms,
            success,
        });
    }

    /// Computes current metrics for one source
    pub async fn source_metrics(&self, source: &str) -> SourceMetrics {
        let windows = self.windows.read().await;
        match windows.get(source) {
            Some(window) => compute_metrics(source, window),
            None => SourceMetrics::empty(source),
        }
    }

    /// Computes current metrics for every source seen so far, ordered by name
    pub async fn all_metrics(&self) -> Vec<SourceMetrics> {
        let windows = self.windows.read().await;
        let mut names: Vec<&String> = windows.keys().collect();
        names.sort();

        names
            .into_iter()
            .map(|name| compute_metrics(name, &windows[name]))
            .collect()
    }
}

impl Default for SourceMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_metrics(source: &str, window: &SourceWindow) -> SourceMetrics {
    if window.samples.is_empty() {
        return SourceMetrics::empty(source);
    }

    // Percentiles over successful latencies only
    let mut latencies: Vec<f64> = window
        .samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.duration_ms)
        .collect();

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let success_rate = if window.total_requests > 0 {
        (window.total_requests - window.failed_requests) as f64 / window.total_requests as f64
    } else {
        1.0
    };

    SourceMetrics {
        source_name: source.to_string(),
        latency_p50_ms: percentile(&latencies, 50.0),
        latency_p99_ms: percentile(&latencies, 99.0),
        success_rate,
        total_requests: window.total_requests,
        failed_requests: window.failed_requests,
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
