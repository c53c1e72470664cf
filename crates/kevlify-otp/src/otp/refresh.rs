//! Per-account refresh loop.
//!
//! Each displayed account gets its own `CodeTicker`: one tokio task that
//! recomputes the account's `CodeState` once per second and publishes it
//! through a `tokio::sync::watch` channel. Consumers either poll
//! `current()` or subscribe and await changes. Dropping the ticker
//! aborts its task, so unmounting an account card stops its loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::otp::core;
use crate::otp::types::{Account, CodeState};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code ticker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handle to a background task refreshing one account's code.
pub struct CodeTicker {
    rx: watch::Receiver<CodeState>,
    handle: JoinHandle<()>,
}

impl CodeTicker {
    /// Compute the account's current state synchronously, then spawn the
    /// one-second refresh task. Must be called from within a tokio
    /// runtime.
    pub fn spawn(account: Account) -> Self {
        let initial = core::code_state(&account);
        let (tx, rx) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // A stalled consumer should not cause a burst of catch-up
            // recomputes; skipping lands us back on the second boundary.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately; the initial state was
            // already published at construction.
            interval.tick().await;

            loop {
                interval.tick().await;
                tx.send_replace(core::code_state(&account));
            }
        });

        Self { rx, handle }
    }

    /// Most recently published state.
    pub fn current(&self) -> CodeState {
        self.rx.borrow().clone()
    }

    /// New receiver on the state channel for awaiting updates.
    pub fn subscribe(&self) -> watch::Receiver<CodeState> {
        self.rx.clone()
    }

    /// Wait for the next published state.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

impl Drop for CodeTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
