//! Event reconciliation
//!
//! Historical and live events for the same transaction can both arrive, in
//! any order. `merge` folds a batch into the current list keeping one event
//! per (origin address, transaction hash), last write wins, and returns a
//! fresh list ordered newest first.

use crate::types::{DisplayList, EventKey, EventKind, LogEvent, TrackedPair};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Display identifier of a pair, "token0Symbol/token1Symbol"
pub fn pair_id(pair: &TrackedPair) -> String {
    pair.pair_id()
}

/// Attach the pair's display identifier to an event
pub fn tag(mut event: LogEvent, pair: &TrackedPair) -> LogEvent {
    event.pair_id = Some(pair_id(pair));
    event
}

/// Tag a whole batch
pub fn tag_all(events: Vec<LogEvent>, pair: &TrackedPair) -> Vec<LogEvent> {
    events.into_iter().map(|ev| tag(ev, pair)).collect()
}

/// Only Mint and Swap are rendered; other kinds stay in the list
pub fn is_renderable(event: &LogEvent) -> bool {
    matches!(event.kind(), EventKind::Mint | EventKind::Swap)
}

/// Block descending, then log index descending. Key breaks remaining ties
/// so the output does not depend on hash-map iteration order.
fn display_order(a: &LogEvent, b: &LogEvent) -> Ordering {
    b.block_number
        .cmp(&a.block_number)
        .then_with(|| b.log_index.cmp(&a.log_index))
        .then_with(|| a.key().cmp(&b.key()))
}

/// Merge `incoming` into `existing`, deduplicating by [`EventKey`]
pub fn merge<I>(existing: &DisplayList, incoming: I) -> DisplayList
where
    I: IntoIterator<Item = LogEvent>,
{
    let mut by_key: HashMap<EventKey, LogEvent> = HashMap::with_capacity(existing.len());
    for event in existing.iter().cloned().chain(incoming) {
        by_key.insert(event.key(), event);
    }

    let mut events: Vec<LogEvent> = by_key.into_values().collect();
    events.sort_by(display_order);
    DisplayList::from_sorted(events)
}
