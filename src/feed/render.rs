//! Text rendering of feed events
//!
//! Only renderable kinds (Mint, Swap) produce rows. Amounts are shown in
//! 18-decimal units.

use super::reconciler::is_renderable;
use crate::pair_address::sort_tokens;
use crate::types::{DisplayList, LogEvent, PairEvent, TokenInfo, TrackedPair};
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use serde::Serialize;

/// "0x1234...abcd" from the checksummed address
pub fn short_address(address: Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Ether-style amount with trailing zeros trimmed ("1.5", "0.0")
pub fn render_amount(amount: U256) -> String {
    let formatted = format_ether(amount);
    match formatted.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{}.0", int)
            } else {
                format!("{}.{}", int, frac)
            }
        }
        None => formatted,
    }
}

fn find_pair<'a>(pairs: &'a [TrackedPair], address: Address) -> Option<&'a TrackedPair> {
    pairs.iter().find(|p| p.address == address)
}

/// The pair's token1 as the contract sees it (the higher address)
fn onchain_token1(pair: &TrackedPair) -> Option<&TokenInfo> {
    let (_, token1) = sort_tokens(pair.token0.address, pair.token1.address);
    pair.token_by_address(token1)
}

/// Body of one row, or None for kinds that are not rendered
pub fn render_event(event: &LogEvent, pair: Option<&TrackedPair>) -> Option<String> {
    if !is_renderable(event) {
        return None;
    }
    match &event.event {
        PairEvent::Mint {
            amount0, amount1, ..
        } => Some(format!(
            "Mint => amounts: [{}, {}]",
            render_amount(*amount0),
            render_amount(*amount1)
        )),
        PairEvent::Swap {
            amount1_out, to, ..
        } => {
            let symbol = pair
                .and_then(onchain_token1)
                .map(|t| t.symbol.as_str())
                .unwrap_or("token1");
            Some(format!(
                "Swap => {}: {} to [{}]",
                symbol,
                render_amount(*amount1_out),
                short_address(*to)
            ))
        }
        PairEvent::Unsupported { .. } => None,
    }
}

/// One rendered row, also the JSON output shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRow {
    pub pair: String,
    pub kind: String,
    pub block: u64,
    pub log_index: u64,
    pub tx: String,
    pub content: String,
}

impl FeedRow {
    /// Table line: "<pair>  <content>"
    pub fn line(&self) -> String {
        format!("{:<10}  {}", self.pair, self.content)
    }
}

/// Rows for every renderable event, in list order
pub fn render_feed(list: &DisplayList, pairs: &[TrackedPair]) -> Vec<FeedRow> {
    list.iter()
        .filter_map(|event| {
            let pair = find_pair(pairs, event.address);
            let content = render_event(event, pair)?;
            Some(FeedRow {
                pair: event
                    .pair_id
                    .clone()
                    .or_else(|| pair.map(|p| p.pair_id()))
                    .unwrap_or_default(),
                kind: event.kind().to_string(),
                block: event.block_number,
                log_index: event.log_index,
                tx: event.transaction_hash.to_string(),
                content,
            })
        })
        .collect()
}
