//! Shutdown coordination for the server.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Closed flag shared by the accept loop and the server handle.
///
/// The accept loop checks [`is_closed`](Self::is_closed) before every accept
/// and races each accept against [`closed`](Self::closed).
#[derive(Debug, Default)]
pub struct Shutdown {
    closed: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Create a shutdown coordinator in the open state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the server closed and wake the accept loop.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn trigger(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolve once [`trigger`](Self::trigger) has been called.
    pub async fn closed(&self) {
        let notified = self.notify.notified();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}
