//! Exchange errors and revert decoding
//!
//! Revert data is matched against the router's custom errors first and the
//! pair's second, since router calls revert with pair errors when the
//! failure happens inside the pair.

use crate::contracts::IArcadeSwapPair::IArcadeSwapPairErrors;
use crate::contracts::IArcadeSwapRouter::IArcadeSwapRouterErrors;
use alloy::primitives::TxHash;
use alloy::sol_types::SolInterface;
use std::fmt;
use thiserror::Error;

/// Contract that declared a decoded custom error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertSource {
    Router,
    Pair,
}

impl fmt::Display for RevertSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RevertSource::Router => write!(f, "router"),
            RevertSource::Pair => write!(f, "pair"),
        }
    }
}

/// A named custom error decoded from revert data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractRevert {
    pub source: RevertSource,
    pub name: &'static str,
}

impl ContractRevert {
    /// Message shown to the user for this revert
    pub fn user_message(&self) -> &'static str {
        match self.name {
            "InsufficientAAmount" => "InsufficientAAmount!",
            "InsufficientBAmount" => "InsufficientBAmount!",
            _ => "Unknown error!",
        }
    }
}

impl fmt::Display for ContractRevert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.source, self.name)
    }
}

fn router_error_name(err: &IArcadeSwapRouterErrors) -> &'static str {
    match err {
        IArcadeSwapRouterErrors::ExcessiveInputAmount(_) => "ExcessiveInputAmount",
        IArcadeSwapRouterErrors::InsufficientAAmount(_) => "InsufficientAAmount",
        IArcadeSwapRouterErrors::InsufficientBAmount(_) => "InsufficientBAmount",
        IArcadeSwapRouterErrors::InsufficientOutputAmount(_) => "InsufficientOutputAmount",
        IArcadeSwapRouterErrors::SafeTransferFailed(_) => "SafeTransferFailed",
    }
}

fn pair_error_name(err: &IArcadeSwapPairErrors) -> &'static str {
    match err {
        IArcadeSwapPairErrors::AlreadyInitialized(_) => "AlreadyInitialized",
        IArcadeSwapPairErrors::BalanceOverflow(_) => "BalanceOverflow",
        IArcadeSwapPairErrors::InsufficientInputAmount(_) => "InsufficientInputAmount",
        IArcadeSwapPairErrors::InsufficientLiquidity(_) => "InsufficientLiquidity",
        IArcadeSwapPairErrors::InsufficientLiquidityBurned(_) => "InsufficientLiquidityBurned",
        IArcadeSwapPairErrors::InsufficientLiquidityMinted(_) => "InsufficientLiquidityMinted",
        IArcadeSwapPairErrors::InsufficientOutputAmount(_) => "InsufficientOutputAmount",
        IArcadeSwapPairErrors::InvalidK(_) => "InvalidK",
        IArcadeSwapPairErrors::TransferFailed(_) => "TransferFailed",
    }
}

/// Decode revert data into a named contract error (router first, then pair)
pub fn decode_revert(data: &[u8]) -> Option<ContractRevert> {
    if let Ok(err) = IArcadeSwapRouterErrors::abi_decode(data) {
        return Some(ContractRevert {
            source: RevertSource::Router,
            name: router_error_name(&err),
        });
    }
    if let Ok(err) = IArcadeSwapPairErrors::abi_decode(data) {
        return Some(ContractRevert {
            source: RevertSource::Pair,
            name: pair_error_name(&err),
        });
    }
    None
}

/// Errors from quoting, approving, swapping and adding liquidity
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("contract reverted: {0}")]
    Contract(ContractRevert),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("token {0} is not part of pair {1}")]
    UnknownToken(String, String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl ExchangeError {
    /// Message shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            ExchangeError::Contract(revert) => revert.user_message(),
            _ => "Failed!",
        }
    }
}

impl From<alloy::contract::Error> for ExchangeError {
    fn from(err: alloy::contract::Error) -> Self {
        if let Some(revert) = err.as_revert_data().and_then(|data| decode_revert(&data)) {
            return ExchangeError::Contract(revert);
        }
        ExchangeError::Rpc(err.to_string())
    }
}

impl From<alloy::providers::PendingTransactionError> for ExchangeError {
    fn from(err: alloy::providers::PendingTransactionError) -> Self {
        ExchangeError::Rpc(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{IArcadeSwapPair, IArcadeSwapRouter};
    use alloy::sol_types::SolError;

    #[test]
    fn test_decode_router_errors() {
        let data = IArcadeSwapRouter::InsufficientAAmount {}.abi_encode();
        let revert = decode_revert(&data).unwrap();
        assert_eq!(revert.source, RevertSource::Router);
        assert_eq!(revert.name, "InsufficientAAmount");
        assert_eq!(revert.user_message(), "InsufficientAAmount!");

        let data = IArcadeSwapRouter::InsufficientBAmount {}.abi_encode();
        assert_eq!(decode_revert(&data).unwrap().user_message(), "InsufficientBAmount!");
    }

    #[test]
    fn test_router_checked_before_pair() {
        // Both contracts declare InsufficientOutputAmount() (same selector)
        let data = IArcadeSwapPair::InsufficientOutputAmount {}.abi_encode();
        let revert = decode_revert(&data).unwrap();
        assert_eq!(revert.source, RevertSource::Router);
    }

    #[test]
    fn test_pair_error_fallback() {
        let data = IArcadeSwapPair::InsufficientLiquidityMinted {}.abi_encode();
        let revert = decode_revert(&data).unwrap();
        assert_eq!(revert.source, RevertSource::Pair);
        assert_eq!(revert.name, "InsufficientLiquidityMinted");
        assert_eq!(revert.user_message(), "Unknown error!");
        assert_eq!(revert.to_string(), "pair::InsufficientLiquidityMinted");
    }

    #[test]
    fn test_unknown_revert_data() {
        assert!(decode_revert(&[0xde, 0xad, 0xbe, 0xef]).is_none());
        assert!(decode_revert(&[]).is_none());
        assert_eq!(ExchangeError::Rpc("boom".into()).user_message(), "Failed!");
    }
}
