//! Event feed for tracked pairs
//!
//! For every tracked pair the feed subscribes to live Mint/Swap events and
//! queries the pair's history. Both paths push batches into one channel
//! drained by a single reconciler task, which is the only writer of the
//! accumulated list and publishes each rebuilt `DisplayList` on a watch
//! channel.
//!
//! Teardown unsubscribes everything and stops the reconciler. Historical
//! queries still in flight are not cancelled; whatever they return after
//! teardown is dropped.

pub mod reconciler;
pub mod render;
pub mod source;

pub use reconciler::{is_renderable, merge, pair_id, tag, tag_all};
pub use render::{render_event, render_feed, short_address, FeedRow};
pub use source::{decode_pair_log, ChainEventSource, EventSink, EventSource, SubscriptionId};

use crate::types::{DisplayList, TrackedPair};
use anyhow::{anyhow, Result};
use source::FeedMessage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Running event feed over a set of tracked pairs
pub struct EventFeed<S: EventSource + ?Sized> {
    source: Arc<S>,
    pairs: Vec<TrackedPair>,
    subscriptions: Vec<SubscriptionId>,
    historical: Vec<JoinHandle<()>>,
    messages: mpsc::UnboundedSender<FeedMessage>,
    updates: watch::Receiver<DisplayList>,
    stop: Option<oneshot::Sender<()>>,
    reconciler: JoinHandle<DisplayList>,
}

impl<S: EventSource + ?Sized + 'static> EventFeed<S> {
    /// Subscribe to and backfill every pair.
    ///
    /// A pair whose subscription fails is logged and skipped for live
    /// events; its history is still queried. A failed historical query
    /// only affects that pair.
    pub async fn start(source: Arc<S>, pairs: Vec<TrackedPair>) -> Self {
        let (messages, rx) = mpsc::unbounded_channel();
        let (updates_tx, updates) = watch::channel(DisplayList::new());
        let (stop_tx, stop_rx) = oneshot::channel();
        let reconciler = tokio::spawn(run_reconciler(rx, updates_tx, stop_rx));

        let mut subscriptions = Vec::with_capacity(pairs.len());
        let mut historical = Vec::with_capacity(pairs.len());

        for pair in &pairs {
            let sink = EventSink::new(pair.clone(), messages.clone());
            match source.subscribe(pair, sink).await {
                Ok(id) => subscriptions.push(id),
                Err(e) => error!("{}: live subscription failed: {:#}", pair.pair_id(), e),
            }

            let source = Arc::clone(&source);
            let pair = pair.clone();
            let messages = messages.clone();
            historical.push(tokio::spawn(async move {
                match source.fetch_historical(&pair).await {
                    Ok(events) => {
                        let batch = tag_all(events, &pair);
                        if messages.send(FeedMessage::Batch(batch)).is_err() {
                            debug!(
                                "{}: feed closed, dropping late historical batch",
                                pair.pair_id()
                            );
                        }
                    }
                    Err(e) => error!("{}: historical query failed: {:#}", pair.pair_id(), e),
                }
            }));
        }

        info!(
            "Event feed started: {} pairs, {} live subscriptions",
            pairs.len(),
            subscriptions.len()
        );

        Self {
            source,
            pairs,
            subscriptions,
            historical,
            messages,
            updates,
            stop: Some(stop_tx),
            reconciler,
        }
    }

    pub fn pairs(&self) -> &[TrackedPair] {
        &self.pairs
    }

    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    /// Latest published list
    pub fn snapshot(&self) -> DisplayList {
        self.updates.borrow().clone()
    }

    /// Receiver notified on every rebuilt list
    pub fn updates(&self) -> watch::Receiver<DisplayList> {
        self.updates.clone()
    }

    /// Wait for every historical query to finish, then for the reconciler
    /// to apply everything queued so far. Returns the resulting list.
    pub async fn settle(&mut self) -> Result<DisplayList> {
        for handle in std::mem::take(&mut self.historical) {
            if let Err(e) = handle.await {
                warn!("Historical task aborted: {}", e);
            }
        }

        let (tx, rx) = oneshot::channel();
        self.messages
            .send(FeedMessage::Flush(tx))
            .map_err(|_| anyhow!("event feed reconciler is not running"))?;
        rx.await.map_err(|_| anyhow!("event feed reconciler stopped before flush"))
    }

    /// Remove all listeners and stop reconciling. Events in flight are dropped.
    pub async fn shutdown(mut self) -> Result<DisplayList> {
        let removed = self
            .subscriptions
            .iter()
            .filter(|id| self.source.unsubscribe(**id))
            .count();
        info!("Event feed shutting down: {} subscriptions removed", removed);

        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let final_list = (&mut self.reconciler)
            .await
            .map_err(|e| anyhow!("event feed reconciler failed: {}", e))?;
        Ok(final_list)
    }
}

/// Dropping a feed that was not shut down removes its listeners and stops
/// its tasks; nothing is flushed.
impl<S: EventSource + ?Sized> Drop for EventFeed<S> {
    fn drop(&mut self) {
        if self.stop.is_none() {
            return;
        }
        let removed = self
            .subscriptions
            .iter()
            .filter(|id| self.source.unsubscribe(**id))
            .count();
        for handle in &self.historical {
            handle.abort();
        }
        self.reconciler.abort();
        debug!("Event feed dropped without shutdown: {} subscriptions removed", removed);
    }
}

/// Sole owner of the accumulated list
async fn run_reconciler(
    mut rx: mpsc::UnboundedReceiver<FeedMessage>,
    updates: watch::Sender<DisplayList>,
    mut stop: oneshot::Receiver<()>,
) -> DisplayList {
    let mut current = DisplayList::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            msg = rx.recv() => match msg {
                Some(FeedMessage::Batch(batch)) => {
                    if batch.is_empty() {
                        continue;
                    }
                    let received = batch.len();
                    current = merge(&current, batch);
                    debug!("Reconciled {} events, list now {}", received, current.len());
                    updates.send_replace(current.clone());
                }
                Some(FeedMessage::Flush(reply)) => {
                    let _ = reply.send(current.clone());
                }
                None => break,
            },
        }
    }

    rx.close();
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogEvent, PairEvent, TokenInfo};
    use alloy::primitives::{Address, TxHash, U256};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// In-memory source: canned history per pair, live events pushed by the test
    #[derive(Default)]
    struct MockSource {
        history: HashMap<Address, Result<Vec<LogEvent>, String>>,
        sinks: Mutex<HashMap<SubscriptionId, EventSink>>,
        fail_subscribe: Vec<Address>,
        history_gate: Option<Arc<Notify>>,
        next_id: AtomicU64,
    }

    impl MockSource {
        fn push_live(&self, pair: Address, event: LogEvent) -> usize {
            let sinks = self.sinks.lock().unwrap();
            sinks
                .values()
                .filter(|s| s.pair().address == pair)
                .filter(|s| s.send(event.clone()))
                .count()
        }

        fn live_count(&self) -> usize {
            self.sinks.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EventSource for MockSource {
        async fn fetch_historical(&self, pair: &TrackedPair) -> anyhow::Result<Vec<LogEvent>> {
            if let Some(gate) = &self.history_gate {
                gate.notified().await;
            }
            match self.history.get(&pair.address) {
                Some(Ok(events)) => Ok(events.clone()),
                Some(Err(msg)) => Err(anyhow!(msg.clone())),
                None => Ok(vec![]),
            }
        }

        async fn subscribe(
            &self,
            pair: &TrackedPair,
            sink: EventSink,
        ) -> anyhow::Result<SubscriptionId> {
            if self.fail_subscribe.contains(&pair.address) {
                return Err(anyhow!("subscription refused"));
            }
            let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.sinks.lock().unwrap().insert(id, sink);
            Ok(id)
        }

        fn unsubscribe(&self, id: SubscriptionId) -> bool {
            self.sinks.lock().unwrap().remove(&id).is_some()
        }

        fn unsubscribe_all(&self) -> usize {
            let mut sinks = self.sinks.lock().unwrap();
            let n = sinks.len();
            sinks.clear();
            n
        }
    }

    fn pair(b: u8, sym0: &str, sym1: &str) -> TrackedPair {
        TrackedPair::new(
            Address::repeat_byte(b),
            TokenInfo::new(sym0, Address::repeat_byte(b.wrapping_add(1))),
            TokenInfo::new(sym1, Address::repeat_byte(b.wrapping_add(2))),
        )
    }

    fn mint(pair: &TrackedPair, tx: u8, block: u64, log_index: u64) -> LogEvent {
        LogEvent {
            address: pair.address,
            transaction_hash: TxHash::repeat_byte(tx),
            block_number: block,
            log_index,
            event: PairEvent::Mint {
                sender: Address::ZERO,
                amount0: U256::from(1u64),
                amount1: U256::from(1u64),
            },
            pair_id: None,
        }
    }

    #[tokio::test]
    async fn test_historical_events_are_tagged_and_ordered() {
        let eth_usdc = pair(0x10, "ETH", "USDC");
        let btc_usdc = pair(0x20, "BTC", "USDC");
        let mut source = MockSource::default();
        source.history.insert(
            eth_usdc.address,
            Ok(vec![mint(&eth_usdc, 1, 5, 0), mint(&eth_usdc, 2, 8, 1)]),
        );
        source.history.insert(btc_usdc.address, Ok(vec![mint(&btc_usdc, 3, 6, 0)]));

        let mut feed = EventFeed::start(Arc::new(source), vec![eth_usdc, btc_usdc]).await;
        let list = feed.settle().await.unwrap();

        let blocks: Vec<u64> = list.iter().map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![8, 6, 5]);
        assert_eq!(list.events()[1].pair_id.as_deref(), Some("BTC/USDC"));
        assert_eq!(list.events()[0].pair_id.as_deref(), Some("ETH/USDC"));

        feed.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_history_is_not_an_error() {
        let p = pair(0x10, "ETH", "USDC");
        let mut feed = EventFeed::start(Arc::new(MockSource::default()), vec![p]).await;
        let list = feed.settle().await.unwrap();
        assert!(list.is_empty());
        assert_eq!(feed.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn test_live_duplicate_of_historical_kept_once() {
        let p = pair(0x10, "ETH", "USDC");
        let mut source = MockSource::default();
        source.history.insert(p.address, Ok(vec![mint(&p, 1, 5, 0)]));
        let source = Arc::new(source);

        let mut feed = EventFeed::start(Arc::clone(&source), vec![p.clone()]).await;
        feed.settle().await.unwrap();

        assert_eq!(source.push_live(p.address, mint(&p, 1, 5, 0)), 1);
        assert_eq!(source.push_live(p.address, mint(&p, 9, 7, 0)), 1);
        let list = feed.settle().await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.events()[0].transaction_hash, TxHash::repeat_byte(9));
        assert_eq!(list.events()[0].pair_id.as_deref(), Some("ETH/USDC"));
        assert_eq!(feed.snapshot(), list);
    }

    #[tokio::test]
    async fn test_failed_pair_does_not_affect_others() {
        let good = pair(0x10, "ETH", "USDC");
        let bad = pair(0x20, "BTC", "USDC");
        let mut source = MockSource::default();
        source.history.insert(good.address, Ok(vec![mint(&good, 1, 5, 0)]));
        source.history.insert(bad.address, Err("rpc down".to_string()));
        source.fail_subscribe.push(bad.address);

        let mut feed = EventFeed::start(Arc::new(source), vec![good, bad]).await;
        let list = feed.settle().await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.events()[0].pair_id.as_deref(), Some("ETH/USDC"));
        assert_eq!(feed.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_removes_listeners() {
        let p = pair(0x10, "ETH", "USDC");
        let source = Arc::new(MockSource::default());
        let mut feed = EventFeed::start(Arc::clone(&source), vec![p.clone()]).await;
        feed.settle().await.unwrap();
        assert_eq!(source.live_count(), 1);

        let final_list = feed.shutdown().await.unwrap();
        assert!(final_list.is_empty());
        assert_eq!(source.live_count(), 0);
        assert_eq!(source.push_live(p.address, mint(&p, 1, 1, 0)), 0);
    }

    #[tokio::test]
    async fn test_drop_without_shutdown_releases_feed() {
        let p = pair(0x10, "ETH", "USDC");
        let source = Arc::new(MockSource::default());
        let mut feed = EventFeed::start(Arc::clone(&source), vec![p.clone()]).await;
        feed.settle().await.unwrap();
        let mut updates = feed.updates();
        assert_eq!(source.live_count(), 1);

        drop(feed);

        assert_eq!(source.live_count(), 0);
        assert_eq!(source.push_live(p.address, mint(&p, 1, 1, 0)), 0);
        // Reconciler is gone, so its publisher is too
        assert!(updates.changed().await.is_err());
    }

    #[tokio::test]
    async fn test_late_historical_results_dropped_after_shutdown() {
        let p = pair(0x10, "ETH", "USDC");
        let gate = Arc::new(Notify::new());
        let mut source = MockSource::default();
        source.history.insert(p.address, Ok(vec![mint(&p, 1, 5, 0)]));
        source.history_gate = Some(Arc::clone(&gate));

        let feed = EventFeed::start(Arc::new(source), vec![p]).await;
        let mut updates = feed.updates();

        let final_list = feed.shutdown().await.unwrap();
        assert!(final_list.is_empty());

        // Release the in-flight query: its batch has nowhere to go
        gate.notify_one();
        assert!(updates.changed().await.is_err());
        assert!(updates.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_updates_published_on_merge() {
        let p = pair(0x10, "ETH", "USDC");
        let mut source = MockSource::default();
        source.history.insert(p.address, Ok(vec![mint(&p, 1, 5, 0)]));

        let feed = EventFeed::start(Arc::new(source), vec![p]).await;
        let mut updates = feed.updates();
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().len(), 1);

        feed.shutdown().await.unwrap();
    }
}
