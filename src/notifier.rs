// file: src/notifier.rs
// description: reconnect notifications so consumers can refetch state lost while disconnected

use crate::registry::lock_recover;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use tracing::{info, warn};

pub type ReconnectFn = dyn Fn() + Send + Sync;

#[derive(Default)]
struct NotifierInner {
    callbacks: Vec<(u64, Arc<ReconnectFn>)>,
    next_token: u64,
}

/// Fires registered callbacks when the link recovers after it was ready
/// before. The recovery edge itself is detected by the readiness controller;
/// this type only owns the callback table.
pub struct ReconnectNotifier {
    inner: Mutex<NotifierInner>,
}

impl ReconnectNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(NotifierInner::default()),
        })
    }

    pub fn on_reconnect(self: &Arc<Self>, callback: Arc<ReconnectFn>) -> ReconnectSubscription {
        let mut inner = lock_recover(&self.inner);
        let token = inner.next_token;
        inner.next_token += 1;
        inner.callbacks.push((token, callback));
        ReconnectSubscription {
            notifier: Arc::downgrade(self),
            token: Some(token),
        }
    }

    /// Invokes every registered callback once. Panics are isolated per
    /// callback, mirroring listener dispatch.
    pub fn notify(&self) {
        let snapshot: Vec<Arc<ReconnectFn>> = lock_recover(&self.inner)
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        info!(consumers = snapshot.len(), "link recovered; notifying consumers to refetch");
        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                warn!("reconnect callback panicked; continuing");
            }
        }
    }

    pub fn callback_count(&self) -> usize {
        lock_recover(&self.inner).callbacks.len()
    }

    fn remove(&self, token: u64) {
        lock_recover(&self.inner)
            .callbacks
            .retain(|(registered, _)| *registered != token);
    }
}

/// Owning handle for one reconnect registration; RAII like
/// [`crate::registry::Subscription`].
pub struct ReconnectSubscription {
    notifier: Weak<ReconnectNotifier>,
    token: Option<u64>,
}

impl ReconnectSubscription {
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            if let Some(notifier) = self.notifier.upgrade() {
                notifier.remove(token);
            }
        }
    }
}

impl Drop for ReconnectSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(counter: &Arc<AtomicUsize>) -> Arc<ReconnectFn> {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn notify_invokes_each_callback_once() {
        let notifier = ReconnectNotifier::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let _a = notifier.on_reconnect(counting_callback(&first));
        let _b = notifier.on_reconnect(counting_callback(&second));

        notifier.notify();
        notifier.notify();

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cancelled_callback_stops_firing() {
        let notifier = ReconnectNotifier::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let mut subscription = notifier.on_reconnect(counting_callback(&counter));
        notifier.notify();
        subscription.cancel();
        subscription.cancel();
        notifier.notify();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.callback_count(), 0);
    }

    #[test]
    fn dropped_subscription_unregisters() {
        let notifier = ReconnectNotifier::new();
        let counter = Arc::new(AtomicUsize::new(0));

        drop(notifier.on_reconnect(counting_callback(&counter)));
        notifier.notify();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_callback_does_not_suppress_siblings() {
        let notifier = ReconnectNotifier::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        let _bad = notifier.on_reconnect(Arc::new(|| panic!("callback failure")) as Arc<ReconnectFn>);
        let _good = notifier.on_reconnect(counting_callback(&delivered));

        notifier.notify();
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
