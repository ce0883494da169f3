//! Connectivity signal consumed by the sync engine.
//!
//! The platform decides what "connected" means. The engine asks
//! `is_connected()` at the moment an attempt starts and listens on
//! `subscribe()` for transitions; dropping the receiver unsubscribes.

use tokio::sync::watch;
use tracing::debug;

pub trait NetworkMonitor: Send + Sync {
    /// Point-in-time connectivity. May lag behind a pending change event.
    fn is_connected(&self) -> bool;

    /// Stream of connectivity values, starting with the current one.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Monitor whose value is pushed by its owner (platform glue, a probe task,
/// or a test).
#[derive(Debug)]
pub struct WatchNetworkMonitor {
    tx: watch::Sender<bool>,
}

impl WatchNetworkMonitor {
    pub fn new(connected: bool) -> Self {
        let (tx, _) = watch::channel(connected);
        Self { tx }
    }

    /// Record a connectivity reading. Subscribers only wake on a change.
    pub fn set_connected(&self, connected: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            debug!(connected, "Connectivity changed");
        }
    }
}

impl Default for WatchNetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkMonitor for WatchNetworkMonitor {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_reflects_last_set() {
        let monitor = WatchNetworkMonitor::new(false);
        assert!(!monitor.is_connected());
        monitor.set_connected(true);
        assert!(monitor.is_connected());
    }

    #[tokio::test]
    async fn test_subscriber_sees_change() {
        let monitor = WatchNetworkMonitor::new(false);
        let mut rx = monitor.subscribe();
        assert!(!*rx.borrow_and_update());

        monitor.set_connected(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[test]
    fn test_repeated_value_does_not_notify() {
        let monitor = WatchNetworkMonitor::new(true);
        let mut rx = monitor.subscribe();
        rx.borrow_and_update();
        monitor.set_connected(true);
        assert!(!rx.has_changed().unwrap());
    }
}
