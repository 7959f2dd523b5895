//! Deferred "server is open" notifications, keyed by reservation id.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// At most one pending notification per reservation. The fire path removes
/// the entry before delivering, the cancel path removes then aborts, so
/// fire-then-cancel and cancel-then-fire are both no-ops for the loser.
#[derive(Debug, Default)]
pub struct Notifier {
    pending: Arc<DashMap<u64, JoinHandle<()>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `notify` to run after `delay`. A second schedule for the
    /// same reservation replaces the first.
    pub fn schedule<F>(&self, reservation_id: u64, delay: Duration, notify: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Losing the race against cancel means the entry is gone and
            // the notification must not be delivered.
            if pending.remove(&reservation_id).is_some() {
                notify.await;
            }
        });
        if let Some(previous) = self.pending.insert(reservation_id, handle) {
            debug!(reservation_id, "replacing pending notification");
            previous.abort();
        }
    }

    /// Returns whether a notification was still pending.
    pub fn cancel(&self, reservation_id: u64) -> bool {
        match self.pending.remove(&reservation_id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn flag_future(flag: Arc<AtomicBool>) -> impl Future<Output = ()> + Send + 'static {
        async move {
            flag.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn fires_after_the_delay() {
        let notifier = Notifier::new();
        let fired = Arc::new(AtomicBool::new(false));
        notifier.schedule(1, Duration::from_millis(20), flag_future(fired.clone()));
        assert_eq!(notifier.pending_count(), 1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(notifier.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_before_fire_suppresses_the_notification() {
        let notifier = Notifier::new();
        let fired = Arc::new(AtomicBool::new(false));
        // Start well in the future, end it immediately.
        notifier.schedule(1, Duration::from_secs(600), flag_future(fired.clone()));
        assert!(notifier.cancel(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert_eq!(notifier.pending_count(), 0);
    }

    #[tokio::test]
    async fn cancel_after_fire_is_a_no_op() {
        let notifier = Notifier::new();
        let fired = Arc::new(AtomicBool::new(false));
        notifier.schedule(1, Duration::from_millis(10), flag_future(fired.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!notifier.cancel(1));
    }

    #[tokio::test]
    async fn rescheduling_replaces_the_previous_notification() {
        let notifier = Notifier::new();
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));
        notifier.schedule(1, Duration::from_millis(20), flag_future(first.clone()));
        notifier.schedule(1, Duration::from_millis(20), flag_future(second.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
    }
}
