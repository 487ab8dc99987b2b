//! Adding liquidity through the router

use super::{confirm, ensure_allowance, ExchangeError, TxOutcome};
use crate::config::AppConfig;
use crate::contracts::IArcadeSwapRouter;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use std::sync::Arc;
use tracing::info;

pub struct LiquidityClient<P: Provider> {
    provider: Arc<P>,
    owner: Address,
    router: Address,
}

impl<P: Provider> LiquidityClient<P> {
    pub fn new(provider: Arc<P>, owner: Address, config: &AppConfig) -> Self {
        Self {
            provider,
            owner,
            router: config.router_address,
        }
    }

    /// Deposit exactly `amount_a` of `token_a` and `amount_b` of `token_b`.
    ///
    /// Approvals are sent for A then B where the allowance falls short. The
    /// minimums equal the desired amounts, so the router reverts with
    /// InsufficientAAmount / InsufficientBAmount if the pool ratio moved.
    pub async fn add_liquidity(
        &self,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
    ) -> Result<TxOutcome, ExchangeError> {
        let provider = self.provider.as_ref();
        ensure_allowance(provider, token_a, self.owner, self.router, amount_a).await?;
        ensure_allowance(provider, token_b, self.owner, self.router, amount_b).await?;

        info!(
            "Adding liquidity: {} of {}, {} of {}",
            amount_a, token_a, amount_b, token_b
        );
        let router = IArcadeSwapRouter::new(self.router, Arc::clone(&self.provider));
        let receipt = router
            .addLiquidity(
                token_a, token_b, amount_a, amount_b, amount_a, amount_b, self.owner,
            )
            .send()
            .await?
            .get_receipt()
            .await?;
        let outcome = confirm(receipt)?;
        info!("Liquidity added: {}", outcome.tx_hash);
        Ok(outcome)
    }
}
