//! Types for the token feed aggregator

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current wall-clock time as milliseconds since the Unix epoch.
///
/// All observation timestamps in the crate use this representation so that
/// records round-trip unchanged through the cache and the push transport.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// One observation of a token's market state.
///
/// A record is produced by a single source adapter, or by the merge engine
/// combining several adapters' observations of the same address. In the merged
/// case `sources` is the deduplicated union of every contributing source name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Provider-assigned address uniquely identifying the token
    pub address: String,

    /// Display name
    pub name: String,

    /// Ticker symbol
    pub ticker: String,

    /// Price in SOL
    pub price_sol: f64,

    /// Market capitalization in SOL
    pub market_cap_sol: f64,

    /// 24h trading volume in SOL
    pub volume_sol: f64,

    /// Liquidity in SOL
    pub liquidity_sol: f64,

    /// Number of transactions in the reporting window
    pub transaction_count: u64,

    /// 1-hour price change percentage
    pub price_change_1h: f64,

    /// Originating protocol / exchange label
    pub protocol: String,

    /// Names of the sources that contributed to this record
    pub sources: Vec<String>,

    /// Observation timestamp (milliseconds since epoch)
    pub last_updated: i64,
}

/// Sort key for token listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// 24h volume, descending
    Volume,
    /// 1-hour price change, descending
    PriceChange,
    /// Market capitalization, descending
    MarketCap,
}

impl SortBy {
    /// Stable name used in cache keys and query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Volume => "volume",
            SortBy::PriceChange => "price_change",
            SortBy::MarketCap => "market_cap",
        }
    }
}

impl Default for SortBy {
    fn default() -> Self {
        SortBy::Volume
    }
}

/// Timeframe a listing query is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    Hour,
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
}

impl Timeframe {
    /// Stable name used in cache keys and query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Hour => "1h",
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Day
    }
}

/// Query descriptor consumed from the route layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenQuery {
    /// Maximum number of records per page
    pub limit: usize,

    /// Opaque cursor from a previous page, if any
    pub cursor: Option<String>,

    /// Sort key
    pub sort_by: SortBy,

    /// Timeframe
    pub timeframe: Timeframe,
}

impl Default for TokenQuery {
    fn default() -> Self {
        Self {
            limit: crate::constants::DEFAULT_PAGE_LIMIT,
            cursor: None,
            sort_by: SortBy::default(),
            timeframe: Timeframe::default(),
        }
    }
}

/// One page of a token listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPage {
    /// Records on this page
    pub tokens: Vec<TokenRecord>,

    /// Cursor for the next page, or `None` on the last page
    pub next_cursor: Option<String>,
}

/// Events pushed to subscribed connections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TokenEvent {
    /// A fresh merged record for a subscribed token
    Update { address: String, data: TokenRecord },

    /// Price moved by more than the change threshold since the last broadcast
    PriceChange { address: String, change: f64 },

    /// Volume grew by more than the spike threshold since the last broadcast
    VolumeSpike { address: String, volume: f64 },
}

impl TokenEvent {
    /// Get the event kind as string
    pub fn kind(&self) -> &'static str {
        match self {
            TokenEvent::Update { .. } => "update",
            TokenEvent::PriceChange { .. } => "price-change",
            TokenEvent::VolumeSpike { .. } => "volume-spike",
        }
    }

    /// Address of the token this event concerns
    pub fn address(&self) -> &str {
        match self {
            TokenEvent::Update { address, .. } => address,
            TokenEvent::PriceChange { address, .. } => address,
            TokenEvent::VolumeSpike { address, .. } => address,
        }
    }
}

impl std::fmt::Display for TokenEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenEvent::Update { address, data } => {
                write!(f, "update {}: {:.6} SOL", address, data.price_sol)
            }
            TokenEvent::PriceChange { address, change } => {
                write!(f, "price-change {}: {:+.2}%", address, change)
            }
            TokenEvent::VolumeSpike { address, volume } => {
                write!(f, "volume-spike {}: {:.2} SOL", address, volume)
            }
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthStatus {
    /// All components are operational
    Healthy,
    /// Degraded but still functional
    Degraded,
    /// Requires attention
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: chrono::DateTime<Utc>,
}
