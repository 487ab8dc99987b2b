//! Core data structures for the event feed and exchange clients
//!
//! Tracked pairs are static configuration. Log events are produced by the
//! chain client and decoded into named argument structures keyed by the
//! pair contract's event schema (not by argument position).

use alloy::primitives::{Address, TxHash, B256, U256};
use std::fmt;

/// A token as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: Address,
}

impl TokenInfo {
    pub fn new(symbol: impl Into<String>, address: Address) -> Self {
        Self {
            symbol: symbol.into(),
            address,
        }
    }
}

/// A trading-pair contract whose events the feed tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPair {
    pub address: Address,
    pub token0: TokenInfo,
    pub token1: TokenInfo,
}

impl TrackedPair {
    pub fn new(address: Address, token0: TokenInfo, token1: TokenInfo) -> Self {
        Self {
            address,
            token0,
            token1,
        }
    }

    /// Display identifier, e.g. "ETH/USDC"
    pub fn pair_id(&self) -> String {
        format!("{}/{}", self.token0.symbol, self.token1.symbol)
    }

    /// Look up a token of this pair by address
    pub fn token_by_address(&self, address: Address) -> Option<&TokenInfo> {
        if self.token0.address == address {
            Some(&self.token0)
        } else if self.token1.address == address {
            Some(&self.token1)
        } else {
            None
        }
    }
}

/// Kinds of pair events the feed understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Mint,
    Swap,
    Other,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventKind::Mint => write!(f, "Mint"),
            EventKind::Swap => write!(f, "Swap"),
            EventKind::Other => write!(f, "Other"),
        }
    }
}

/// Decoded pair event arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairEvent {
    /// Mint(address indexed sender, uint256 amount0, uint256 amount1)
    Mint {
        sender: Address,
        amount0: U256,
        amount1: U256,
    },
    /// Swap(address indexed sender, uint256 amount0Out, uint256 amount1Out, address indexed to)
    Swap {
        sender: Address,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    },
    /// Any other log emitted by the pair (kept, never rendered)
    Unsupported { topic0: Option<B256> },
}

impl PairEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PairEvent::Mint { .. } => EventKind::Mint,
            PairEvent::Swap { .. } => EventKind::Swap,
            PairEvent::Unsupported { .. } => EventKind::Other,
        }
    }
}

/// A log event as received from the chain client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Contract that emitted the log
    pub address: Address,
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub log_index: u64,
    pub event: PairEvent,
    /// "token0/token1" of the tracked pair, set by `tag`
    pub pair_id: Option<String>,
}

impl LogEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            address: self.address,
            transaction_hash: self.transaction_hash,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/// Deduplication identity: origin address + transaction hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub address: Address,
    pub transaction_hash: TxHash,
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.address, self.transaction_hash)
    }
}

/// Events ordered for display: newest block first, then highest log index.
///
/// Only ever rebuilt through [`crate::feed::merge`], never edited by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayList {
    events: Vec<LogEvent>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_sorted(events: Vec<LogEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.iter()
    }
}

impl IntoIterator for DisplayList {
    type Item = LogEvent;
    type IntoIter = std::vec::IntoIter<LogEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_id() {
        let pair = TrackedPair::new(
            Address::ZERO,
            TokenInfo::new("ETH", Address::repeat_byte(1)),
            TokenInfo::new("USDC", Address::repeat_byte(2)),
        );
        assert_eq!(pair.pair_id(), "ETH/USDC");
        assert_eq!(
            pair.token_by_address(Address::repeat_byte(2))
                .map(|t| t.symbol.as_str()),
            Some("USDC")
        );
        assert!(pair.token_by_address(Address::repeat_byte(3)).is_none());
    }

    #[test]
    fn test_event_key_display() {
        let key = EventKey {
            address: Address::repeat_byte(0xab),
            transaction_hash: TxHash::repeat_byte(0x01),
        };
        let s = key.to_string();
        assert!(s.contains('_'));
        assert!(s.starts_with("0x"));
        assert!(s.ends_with(&"01".repeat(32)));
    }

    #[test]
    fn test_event_kind() {
        let ev = PairEvent::Unsupported { topic0: None };
        assert_eq!(ev.kind(), EventKind::Other);
        let mint = PairEvent::Mint {
            sender: Address::ZERO,
            amount0: U256::from(1),
            amount1: U256::from(2),
        };
        assert_eq!(mint.kind(), EventKind::Mint);
        assert_eq!(mint.kind().to_string(), "Mint");
    }
}
