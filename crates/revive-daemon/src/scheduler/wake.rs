//! Wake signal between alert intake and the recovery loop

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Coalescing wake-up for an idle recovery loop.
///
/// Any number of wakes before the loop waits collapse into one.
#[derive(Debug, Default)]
pub struct WakeSignal {
    notify: Notify,
    active: AtomicBool,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the loop if it is idle.
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    /// Wait for the next wake. Returns immediately if one is pending.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    /// Whether the loop currently has devices to work on.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}
