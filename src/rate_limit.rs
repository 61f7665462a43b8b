//! Adaptive per-source pacing for upstream API calls.
//!
//! Each source name gets its own delay state: calls to the same source are
//! spaced at least `delay` apart, the delay doubles when the source reports a
//! rate limit (up to a ceiling) and resets to the base on success. This paces
//! outbound calls from this process only; it is not a distributed limiter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::constants::{BASE_DELAY_MS, MAX_DELAY_MS};

/// Pacing state for a single source.
#[derive(Debug)]
struct RateState {
    /// When the last call to this source was recorded
    last_call: Option<Instant>,
    /// Current minimum spacing between calls
    delay: Duration,
}

impl RateState {
    fn new() -> Self {
        Self {
            last_call: None,
            delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

/// Per-source adaptive delay gate.
///
/// State is keyed by source name, created lazily on first use and kept for
/// the process lifetime. Construct one instance per process and hand it to
/// every adapter that needs pacing.
pub struct AdaptiveRateLimiter {
    states: Mutex<HashMap<String, RateState>>,
}

impl AdaptiveRateLimiter {
    /// Creates a new rate limiter with no per-source state yet.
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the state mutex, recovering from poison if necessary.
    ///
    /// Worst case after recovery is slightly incorrect pacing, which beats
    /// panicking inside an adapter call path.
    fn lock_states(&self) -> MutexGuard<'_, HashMap<String, RateState>> {
        self.states.lock().unwrap_or_else(|poisoned| {
            warn!("rate limiter state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Suspends until at least the current delay has elapsed since the last
    /// recorded call to `source`, then records now as the new last-call time.
    pub async fn throttle(&self, source: &str) {
        loop {
            let wait = {
                let mut states = self.lock_states();
                let state = states
                    .entry(source.to_string())
                    .or_insert_with(RateState::new);

                let now = Instant::now();
                match state.last_call {
                    Some(last) if now.duration_since(last) < state.delay => {
                        state.delay - now.duration_since(last)
                    }
                    _ => {
                        state.last_call = Some(now);
                        return;
                    }
                }
            };

            debug!(source = source, wait_ms = wait.as_millis() as u64, "throttling source call");
            tokio::time::sleep(wait).await;
        }
    }

    /// Doubles the delay for `source`, capped at the backoff ceiling.
    pub fn on_rate_limited(&self, source: &str) {
        let mut states = self.lock_states();
        let state = states
            .entry(source.to_string())
            .or_insert_with(RateState::new);

        let doubled = state.delay.saturating_mul(2);
        state.delay = doubled.min(Duration::from_millis(MAX_DELAY_MS));
        warn!(
            source = source,
            delay_ms = state.delay.as_millis() as u64,
            "rate limit hit, backing off"
        );
    }

    /// Resets the delay for `source` to the base value.
    pub fn on_success(&self, source: &str) {
        let mut states = self.lock_states();
        let state = states
            .entry(source.to_string())
            .or_insert_with(RateState::new);
        state.delay = Duration::from_millis(BASE_DELAY_MS);
    }

    /// Current delay for `source` (base value if never seen).
    pub fn delay(&self, source: &str) -> Duration {
        let states = self.lock_states();
        states
            .get(source)
            .map(|s| s.delay)
            .unwrap_or(Duration::from_millis(BASE_DELAY_MS))
    }
}

impl Default for AdaptiveRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let limiter = AdaptiveRateLimiter::new();

        limiter.on_rate_limited("dexscreener");
        assert_eq!(limiter.delay("dexscreener"), Duration::from_millis(500));

        limiter.on_rate_limited("dexscreener");
        assert_eq!(limiter.delay("dexscreener"), Duration::from_millis(1000));

        // Keep doubling well past the ceiling
        for _ in 0..10 {
            limiter.on_rate_limited("dexscreener");
        }
        assert_eq!(
            limiter.delay("dexscreener"),
            Duration::from_millis(MAX_DELAY_MS)
        );
    }

    #[test]
    fn success_resets_to_base() {
        let limiter = AdaptiveRateLimiter::new();

        for _ in 0..5 {
            limiter.on_rate_limited("jupiter");
        }
        assert!(limiter.delay("jupiter") > Duration::from_millis(BASE_DELAY_MS));

        limiter.on_success("jupiter");
        assert_eq!(limiter.delay("jupiter"), Duration::from_millis(BASE_DELAY_MS));
    }

    #[test]
    fn sources_are_isolated() {
        let limiter = AdaptiveRateLimiter::new();

        limiter.on_rate_limited("dexscreener");
        limiter.on_rate_limited("dexscreener");

        assert_eq!(limiter.delay("dexscreener"), Duration::from_millis(1000));
        assert_eq!(
            limiter.delay("geckoterminal"),
            Duration::from_millis(BASE_DELAY_MS)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_enforces_base_delay() {
        let limiter = AdaptiveRateLimiter::new();

        let start = Instant::now();
        limiter.throttle("dexscreener").await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.throttle("dexscreener").await;
        assert!(start.elapsed() >= Duration::from_millis(BASE_DELAY_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_enforces_doubled_delay_after_rate_limit() {
        let limiter = AdaptiveRateLimiter::new();

        limiter.throttle("jupiter").await;
        limiter.on_rate_limited("jupiter");

        let start = Instant::now();
        limiter.throttle("jupiter").await;
        assert!(start.elapsed() >= Duration::from_millis(2 * BASE_DELAY_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_does_not_block_other_sources() {
        let limiter = AdaptiveRateLimiter::new();

        limiter.throttle("dexscreener").await;

        let start = Instant::now();
        limiter.throttle("geckoterminal").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
