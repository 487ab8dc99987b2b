//! Event sources
//!
//! An `EventSource` answers two questions for a tracked pair: what did it
//! emit so far (historical query), and what does it emit from now on (live
//! subscription). Subscriptions return an explicit `SubscriptionId` that is
//! later passed to `unsubscribe`.
//!
//! `ChainEventSource` implements this over an alloy provider: `eth_getLogs`
//! for history and `eth_subscribe("logs")` (WebSocket) for live events.

use crate::contracts::IArcadeSwapPair;
use crate::types::{LogEvent, PairEvent, TrackedPair};
use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use alloy::sol_types::SolEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::reconciler::tag;

/// Handle returned by `subscribe`, passed back to `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Messages consumed by the feed's reconciler task
#[derive(Debug)]
pub(crate) enum FeedMessage {
    Batch(Vec<LogEvent>),
    Flush(tokio::sync::oneshot::Sender<crate::types::DisplayList>),
}

/// Where a source delivers live events for one pair.
///
/// Events are tagged with the pair's identifier before they are queued.
#[derive(Debug, Clone)]
pub struct EventSink {
    pair: TrackedPair,
    tx: mpsc::UnboundedSender<FeedMessage>,
}

impl EventSink {
    pub(crate) fn new(pair: TrackedPair, tx: mpsc::UnboundedSender<FeedMessage>) -> Self {
        Self { pair, tx }
    }

    pub fn pair(&self) -> &TrackedPair {
        &self.pair
    }

    /// Queue one live event. Returns false once the feed has shut down.
    pub fn send(&self, event: LogEvent) -> bool {
        self.tx
            .send(FeedMessage::Batch(vec![tag(event, &self.pair)]))
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Source of pair events (historical + live)
#[async_trait]
pub trait EventSource: Send + Sync {
    /// All Mint and Swap events of the pair from the earliest to the latest
    /// block. No events is `Ok(vec![])`.
    async fn fetch_historical(&self, pair: &TrackedPair) -> Result<Vec<LogEvent>>;

    /// Forward every matching log as it is mined into `sink`
    async fn subscribe(&self, pair: &TrackedPair, sink: EventSink) -> Result<SubscriptionId>;

    /// Cancel one subscription. Returns false if the id is unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Cancel every subscription, returning how many were removed
    fn unsubscribe_all(&self) -> usize;
}

// ── Log decoding ─────────────────────────────────────────────────────

/// Log filter for the tracked event kinds of one pair contract
pub fn pair_event_filter(pair_address: Address) -> Filter {
    Filter::new()
        .address(pair_address)
        .event_signature(vec![
            IArcadeSwapPair::Mint::SIGNATURE_HASH,
            IArcadeSwapPair::Swap::SIGNATURE_HASH,
        ])
}

/// Decode an RPC log into a `LogEvent`.
///
/// Returns `Ok(None)` for logs that cannot be placed in the feed (pending
/// logs without block position, or logs removed by a reorg). Logs with an
/// unknown topic become `PairEvent::Unsupported`. A Mint/Swap log whose data
/// does not match the event schema is an error.
pub fn decode_pair_log(log: &Log) -> Result<Option<LogEvent>> {
    if log.removed {
        debug!("Skipping removed log {:?}", log.transaction_hash);
        return Ok(None);
    }

    let (Some(block_number), Some(transaction_hash), Some(log_index)) =
        (log.block_number, log.transaction_hash, log.log_index)
    else {
        debug!("Skipping pending log from {}", log.address());
        return Ok(None);
    };

    let topic0 = log.topics().first().copied();
    let event = match topic0 {
        Some(t) if t == IArcadeSwapPair::Mint::SIGNATURE_HASH => {
            let mint = IArcadeSwapPair::Mint::decode_log_data(log.data())
                .with_context(|| format!("Malformed Mint log in tx {}", transaction_hash))?;
            PairEvent::Mint {
                sender: mint.sender,
                amount0: mint.amount0,
                amount1: mint.amount1,
            }
        }
        Some(t) if t == IArcadeSwapPair::Swap::SIGNATURE_HASH => {
            let swap = IArcadeSwapPair::Swap::decode_log_data(log.data())
                .with_context(|| format!("Malformed Swap log in tx {}", transaction_hash))?;
            PairEvent::Swap {
                sender: swap.sender,
                amount0_out: swap.amount0Out,
                amount1_out: swap.amount1Out,
                to: swap.to,
            }
        }
        other => PairEvent::Unsupported { topic0: other },
    };

    Ok(Some(LogEvent {
        address: log.address(),
        transaction_hash,
        block_number,
        log_index,
        event,
        pair_id: None,
    }))
}

// ── Chain-backed source ──────────────────────────────────────────────

/// `EventSource` over an alloy provider (WebSocket required for `subscribe`)
pub struct ChainEventSource<P> {
    provider: Arc<P>,
    /// Live forwarding tasks, one per subscription
    subscriptions: DashMap<SubscriptionId, JoinHandle<()>>,
    next_id: AtomicU64,
}

impl<P: Provider + 'static> ChainEventSource<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }
}

#[async_trait]
impl<P: Provider + 'static> EventSource for ChainEventSource<P> {
    async fn fetch_historical(&self, pair: &TrackedPair) -> Result<Vec<LogEvent>> {
        let filter = pair_event_filter(pair.address)
            .from_block(BlockNumberOrTag::Earliest)
            .to_block(BlockNumberOrTag::Latest);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .with_context(|| format!("Historical log query failed for {}", pair.pair_id()))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(event) = decode_pair_log(log)? {
                events.push(event);
            }
        }

        info!(
            "{}: {} historical events ({} logs)",
            pair.pair_id(),
            events.len(),
            logs.len()
        );
        Ok(events)
    }

    async fn subscribe(&self, pair: &TrackedPair, sink: EventSink) -> Result<SubscriptionId> {
        let filter = pair_event_filter(pair.address);
        let subscription = self
            .provider
            .subscribe_logs(&filter)
            .await
            .with_context(|| format!("Log subscription failed for {}", pair.pair_id()))?;

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let pair_id = pair.pair_id();
        let mut stream = subscription.into_stream();

        let handle = tokio::spawn(async move {
            while let Some(log) = stream.next().await {
                match decode_pair_log(&log) {
                    Ok(Some(event)) => {
                        debug!(
                            "{} live {} at block {} (log {})",
                            pair_id,
                            event.kind(),
                            event.block_number,
                            event.log_index
                        );
                        if !sink.send(event) {
                            debug!("{}: feed closed, stopping {}", pair_id, id);
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => error!("{}: dropping undecodable live log: {:#}", pair_id, e),
                }
            }
            warn!("{}: log subscription stream ended ({})", pair_id, id);
        });

        self.subscriptions.insert(id, handle);
        info!("{}: subscribed to live events ({})", pair.pair_id(), id);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.subscriptions.remove(&id) {
            Some((_, handle)) => {
                handle.abort();
                debug!("Unsubscribed {}", id);
                true
            }
            None => false,
        }
    }

    fn unsubscribe_all(&self) -> usize {
        let ids: Vec<SubscriptionId> = self.subscriptions.iter().map(|e| *e.key()).collect();
        ids.into_iter().filter(|id| self.unsubscribe(*id)).count()
    }
}

impl<P> Drop for ChainEventSource<P> {
    fn drop(&mut self) {
        for entry in self.subscriptions.iter() {
            entry.value().abort();
        }
    }
}
