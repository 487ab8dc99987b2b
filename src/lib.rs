//! ArcadeSwap client library
//!
//! Live Mint/Swap event feed over tracked pairs, plus quoting, swapping and
//! liquidity provision against the ArcadeSwap router.

pub mod config;
pub mod contracts;
pub mod debounce;
pub mod exchange;
pub mod feed;
pub mod pair_address;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, load_config_from_file, load_tracked_pairs, AppConfig};
pub use exchange::{ExchangeError, LiquidityClient, SwapClient};
pub use feed::{ChainEventSource, EventFeed, EventSource};
pub use types::{DisplayList, EventKind, LogEvent, PairEvent, TokenInfo, TrackedPair};
