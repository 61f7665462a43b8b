//! Upstream source adapter implementations

pub mod dexscreener;
pub mod gecko_terminal;
pub mod jupiter;

pub use dexscreener::DexScreenerSource;
pub use gecko_terminal::GeckoTerminalSource;
pub use jupiter::JupiterSource;
