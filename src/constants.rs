//! Constants for the token feed aggregator
//!
//! All configuration for the aggregator is centralized here. No runtime
//! configuration is used - the system operates transparently with these
//! compile-time constants.

/// Base delay between calls to the same source (in milliseconds)
pub const BASE_DELAY_MS: u64 = 250;

/// Backoff ceiling for a rate-limited source (in milliseconds)
pub const MAX_DELAY_MS: u64 = 8000;

/// Per-request timeout for upstream source calls (in milliseconds)
pub const SOURCE_TIMEOUT_MS: u64 = 5000;

/// Maximum records taken from one DexScreener response
pub const DEXSCREENER_MAX_RECORDS: usize = 30;

/// Maximum mint ids per Jupiter price request
pub const JUPITER_MAX_IDS: usize = 10;

/// Maximum records taken from one GeckoTerminal response
pub const GECKO_TERMINAL_MAX_RECORDS: usize = 20;

/// TTL for cached token listings (in seconds)
pub const CACHE_TTL_SECS: u64 = 30;

/// Scheduler interval between aggregation ticks (in milliseconds)
pub const UPDATE_INTERVAL_MS: u64 = 10_000;

/// How many merged records each scheduler tick broadcasts
pub const BROADCAST_TOP_N: usize = 50;

/// Default page size for listing queries
pub const DEFAULT_PAGE_LIMIT: usize = 30;

/// Price-change broadcast threshold (absolute percentage)
pub const PRICE_CHANGE_THRESHOLD_PCT: f64 = 5.0;

/// Volume-spike broadcast threshold (percentage increase)
pub const VOLUME_SPIKE_THRESHOLD_PCT: f64 = 50.0;

/// Approximate SOL price used to convert USD-denominated upstream figures
pub const SOL_PRICE_USD: f64 = 100.0;

/// Default search query driving the DexScreener adapter and scheduler ticks
pub const DEFAULT_SEARCH_QUERY: &str = "SOL";

/// DexScreener search endpoint
pub const DEXSCREENER_API_URL: &str = "https://api.dexscreener.com/latest/dex/search";

/// Jupiter price endpoint
pub const JUPITER_PRICE_API_URL: &str = "https://price.jup.ag/v4/price";

/// GeckoTerminal Solana tokens endpoint
pub const GECKO_TERMINAL_API_URL: &str = "https://api.geckoterminal.com/api/v2/networks/solana/tokens";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "token-feed-aggregator/0.1.0";

/// Mints the Jupiter adapter tracks.
///
/// Jupiter's price API is id-addressed, so the adapter queries this fixed set
/// on every pass. Capped by `JUPITER_MAX_IDS`.
pub const JUPITER_TRACKED_MINTS: &[&str] = &[
    // SOL
    "So11111111111111111111111111111111111111112",
    // USDC
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    // USDT
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
    // JUP
    "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
    // BONK
    "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
    // RAY
    "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R",
    // WIF
    "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm",
    // PYTH
    "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3",
    // JTO
    "jtojtomepa8beP8AuQc6eXt5FriJwfFMwQx2v2f9mCL",
    // mSOL
    "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",
];
