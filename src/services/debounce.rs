//! Preview debouncer: single re-armable timer per workspace.
//!
//! DESIGN
//! ======
//! Each qualifying edit aborts the pending timer task and spawns a new one
//! that sleeps until `edit instant + delay`, then publishes the snapshot on
//! a `watch` channel. The deadline is fixed at edit time so scheduling
//! latency of the timer task never stretches the window. Only one timer is
//! ever pending. A snapshot equal to the published one wakes no subscriber.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::preview::PreviewSnapshot;

pub const DEFAULT_PREVIEW_DEBOUNCE_MS: u64 = 500;

pub struct Debouncer {
    delay: Duration,
    tx: Arc<watch::Sender<PreviewSnapshot>>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(PreviewSnapshot::default());
        Self { delay, tx: Arc::new(tx), pending: None }
    }

    /// (Re)start the countdown with `snapshot` as the value to publish.
    /// Subscribers are notified only if it differs from the current value.
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&mut self, snapshot: PreviewSnapshot) {
        self.cancel();
        let deadline = Instant::now() + self.delay;
        let tx = Arc::clone(&self.tx);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tx.send_if_modified(|current| {
                if *current == snapshot {
                    return false;
                }
                *current = snapshot;
                true
            });
        }));
    }

    /// Drop the pending update, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn current(&self) -> PreviewSnapshot {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PreviewSnapshot> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "debounce_test.rs"]
mod tests;
