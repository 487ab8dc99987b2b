//! Exchange operations: quoting, swapping, adding liquidity
//!
//! All pricing and reserve math stays in the contracts; these clients read
//! state, encode calls and map reverts to named errors. Every client takes
//! its provider explicitly (a signing provider for transactions).

pub mod errors;
pub mod liquidity;
pub mod swap;

pub use errors::{decode_revert, ContractRevert, ExchangeError, RevertSource};
pub use liquidity::LiquidityClient;
pub use swap::SwapClient;

use crate::contracts::IERC20;
use alloy::network::ReceiptResponse;
use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::Provider;
use tracing::{debug, info};

/// Basis-point denominator
const BPS: u64 = 10_000;

/// A mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Parse a user-entered 18-decimal amount. Empty input means zero.
pub fn parse_amount(input: &str) -> Result<U256, ExchangeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    parse_ether(trimmed).map_err(|e| ExchangeError::InvalidAmount {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Minimum acceptable output after `slippage_bps` tolerance
pub fn min_out(quote: U256, slippage_bps: u32) -> U256 {
    let bps = U256::from(BPS);
    let keep = bps.saturating_sub(U256::from(slippage_bps));
    quote * keep / bps
}

/// Approve `spender` for `U256::MAX` when the current allowance is below `amount`.
/// Returns the approval transaction if one was sent.
pub async fn ensure_allowance<P: Provider>(
    provider: &P,
    token: Address,
    owner: Address,
    spender: Address,
    amount: U256,
) -> Result<Option<TxOutcome>, ExchangeError> {
    let erc20 = IERC20::new(token, provider);
    let allowance = erc20.allowance(owner, spender).call().await?;

    if allowance >= amount {
        debug!("Sufficient allowance for {}: {} >= {}", token, allowance, amount);
        return Ok(None);
    }

    info!("Approving {} for spender {}", token, spender);
    let outcome = confirm(erc20.approve(spender, U256::MAX).send().await?.get_receipt().await?)?;
    info!("Approval confirmed: {}", outcome.tx_hash);
    Ok(Some(outcome))
}

/// Turn a receipt into an outcome, failing on reverted status
pub(crate) fn confirm<R: ReceiptResponse>(receipt: R) -> Result<TxOutcome, ExchangeError> {
    let tx_hash = receipt.transaction_hash();
    if !receipt.status() {
        return Err(ExchangeError::Reverted(tx_hash));
    }
    Ok(TxOutcome {
        tx_hash,
        block_number: receipt.block_number(),
    })
}
