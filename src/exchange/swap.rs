//! Quoting and exact-input swaps through the router

use super::{confirm, ensure_allowance, ExchangeError, TxOutcome};
use crate::config::AppConfig;
use crate::contracts::{IArcadeSwapLibrary, IArcadeSwapPair, IArcadeSwapRouter};
use crate::pair_address::sort_tokens;
use crate::types::TrackedPair;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use std::sync::Arc;
use tracing::{debug, info};

/// Reserves ordered as (reserve of `token_in`, reserve of the other token)
pub fn orient_reserves(
    pair: &TrackedPair,
    token_in: Address,
    reserve0: U256,
    reserve1: U256,
) -> Result<(U256, U256), ExchangeError> {
    let (a, b) = (pair.token0.address, pair.token1.address);
    if token_in != a && token_in != b {
        return Err(ExchangeError::UnknownToken(
            token_in.to_string(),
            pair.pair_id(),
        ));
    }
    let (sorted0, _) = sort_tokens(a, b);
    if token_in == sorted0 {
        Ok((reserve0, reserve1))
    } else {
        Ok((reserve1, reserve0))
    }
}

/// Swap client bound to one owner account
pub struct SwapClient<P: Provider> {
    provider: Arc<P>,
    owner: Address,
    router: Address,
    library: Address,
}

impl<P: Provider> SwapClient<P> {
    pub fn new(provider: Arc<P>, owner: Address, config: &AppConfig) -> Self {
        Self {
            provider,
            owner,
            router: config.router_address,
            library: config.library_address,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Current reserves of `pair`, oriented for a swap of `token_in`
    pub async fn reserves(
        &self,
        pair: &TrackedPair,
        token_in: Address,
    ) -> Result<(U256, U256), ExchangeError> {
        let contract = IArcadeSwapPair::new(pair.address, Arc::clone(&self.provider));
        let reserves = contract.getReserves().call().await?;
        orient_reserves(
            pair,
            token_in,
            U256::from(reserves.reserve0),
            U256::from(reserves.reserve1),
        )
    }

    /// Expected output for `amount_in` of `token_in`. Zero in, zero out.
    pub async fn quote(
        &self,
        pair: &TrackedPair,
        token_in: Address,
        amount_in: U256,
    ) -> Result<U256, ExchangeError> {
        if amount_in.is_zero() {
            return Ok(U256::ZERO);
        }
        let (reserve_in, reserve_out) = self.reserves(pair, token_in).await?;
        let library = IArcadeSwapLibrary::new(self.library, Arc::clone(&self.provider));
        let amount_out = library
            .getAmountOut(amount_in, reserve_in, reserve_out)
            .call()
            .await?;
        debug!(
            "Quote {}: {} in (reserves {}/{}) -> {} out",
            pair.pair_id(),
            amount_in,
            reserve_in,
            reserve_out,
            amount_out
        );
        Ok(amount_out)
    }

    /// Approve the router for `token` if needed
    pub async fn ensure_allowance(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<Option<TxOutcome>, ExchangeError> {
        ensure_allowance(self.provider.as_ref(), token, self.owner, self.router, amount).await
    }

    /// Swap exactly `amount_in` of `path[0]` along `path`, receiving at least `amount_out_min`
    pub async fn swap_exact_in(
        &self,
        amount_in: U256,
        amount_out_min: U256,
        path: Vec<Address>,
    ) -> Result<TxOutcome, ExchangeError> {
        let token_in = *path.first().ok_or_else(|| ExchangeError::InvalidAmount {
            input: String::new(),
            reason: "swap path is empty".to_string(),
        })?;
        self.ensure_allowance(token_in, amount_in).await?;

        info!(
            "Swapping {} along {} hops (min out {})",
            amount_in,
            path.len().saturating_sub(1),
            amount_out_min
        );
        let router = IArcadeSwapRouter::new(self.router, Arc::clone(&self.provider));
        let receipt = router
            .swapExactTokensForTokens(amount_in, amount_out_min, path, self.owner)
            .send()
            .await?
            .get_receipt()
            .await?;
        let outcome = confirm(receipt)?;
        info!("Swap confirmed: {}", outcome.tx_hash);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenInfo;

    fn pair(t0: Address, t1: Address) -> TrackedPair {
        TrackedPair::new(
            Address::repeat_byte(0x10),
            TokenInfo::new("AAA", t0),
            TokenInfo::new("BBB", t1),
        )
    }

    #[test]
    fn test_orient_reserves_sorted() {
        let low = Address::repeat_byte(0x01);
        let high = Address::repeat_byte(0x02);
        let p = pair(low, high);
        let r0 = U256::from(100u64);
        let r1 = U256::from(200u64);

        assert_eq!(orient_reserves(&p, low, r0, r1).unwrap(), (r0, r1));
        assert_eq!(orient_reserves(&p, high, r0, r1).unwrap(), (r1, r0));
    }

    #[test]
    fn test_orient_reserves_config_order_ignored() {
        // Configured as (high, low); on-chain token0 is still the lower address
        let low = Address::repeat_byte(0x01);
        let high = Address::repeat_byte(0x02);
        let p = pair(high, low);
        let r0 = U256::from(100u64);
        let r1 = U256::from(200u64);

        assert_eq!(orient_reserves(&p, low, r0, r1).unwrap(), (r0, r1));
        assert_eq!(orient_reserves(&p, high, r0, r1).unwrap(), (r1, r0));
    }

    #[test]
    fn test_orient_reserves_unknown_token() {
        let p = pair(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        let err = orient_reserves(&p, Address::repeat_byte(0x03), U256::ZERO, U256::ZERO)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownToken(_, _)));
        assert_eq!(err.user_message(), "Failed!");
    }
}
