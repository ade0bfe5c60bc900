//! One-shot quit broadcast.
//!
//! Fired by the first system action that begins a terminal transition and
//! observed by the log relay, which stops accepting connections once it
//! fires. Firing is idempotent: two signals racing into two terminal actions
//! both call [`QuitBroadcast::fire`], and only the first one has an effect.

use std::sync::Arc;
use tokio::sync::watch;

/// Single-fire latch shared between system actions and the log relay.
#[derive(Debug, Clone)]
pub struct QuitBroadcast {
    tx: Arc<watch::Sender<bool>>,
}

impl QuitBroadcast {
    /// Create a broadcast that has not fired yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the broadcast.
    ///
    /// Returns `true` if this call fired it, `false` if it had already fired.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    /// Whether the broadcast has fired.
    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the broadcast fires. Returns immediately if it already has.
    pub async fn fired(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for QuitBroadcast {
    fn default() -> Self {
        Self::new()
    }
}
