//! Trailing-edge debounce for input streams
//!
//! Each value restarts the quiet timer; only the last value of a burst is
//! forwarded once `period` passes with no new input. A pending value is
//! flushed when the input closes.

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

/// Spawn a debouncer between `rx` and the returned receiver
pub fn debounce<T: Send + 'static>(
    mut rx: mpsc::Receiver<T>,
    period: Duration,
) -> mpsc::Receiver<T> {
    let (tx, out) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut pending: Option<(T, Instant)> = None;

        loop {
            let deadline = pending.as_ref().map(|(_, at)| *at);
            tokio::select! {
                biased;

                value = rx.recv() => match value {
                    Some(value) => pending = Some((value, Instant::now() + period)),
                    None => break,
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((value, _)) = pending.take() {
                        if tx.send(value).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }

        if let Some((value, _)) = pending.take() {
            let _ = tx.send(value).await;
        }
    });

    out
}
