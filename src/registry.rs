// file: src/registry.rs
// description: event listener registry with fan-out dispatch and RAII subscriptions

use crate::types::Event;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, trace, warn};

pub type ListenerFn = dyn Fn(&Event) + Send + Sync;

/// Lock that survives a panicking listener. Registry state is plain data, so
/// a poisoned mutex is still internally consistent.
pub(crate) fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Registration {
    token: u64,
    callback: Arc<ListenerFn>,
}

#[derive(Default)]
struct RegistryInner {
    listeners: HashMap<String, Vec<Registration>>,
    next_token: u64,
}

/// Fan-out table mapping event id to its registered listeners.
///
/// Dispatch snapshots the listener set first, so subscriptions added or
/// cancelled by a running callback never affect the in-flight pass, and a
/// panicking callback never suppresses delivery to its siblings.
pub struct ListenerRegistry {
    inner: Mutex<RegistryInner>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RegistryInner::default()),
        })
    }

    /// Registers `callback` for `event_id` and returns the owning handle.
    ///
    /// Registering the same callback (by `Arc` identity) twice for the same
    /// id is a no-op: the returned handle is inert and the existing
    /// registration stays in place.
    pub fn subscribe(
        self: &Arc<Self>,
        event_id: impl Into<String>,
        callback: Arc<ListenerFn>,
    ) -> Subscription {
        let event_id = event_id.into();
        let mut inner = lock_recover(&self.inner);
        let token = inner.next_token;
        inner.next_token += 1;

        let entries = inner.listeners.entry(event_id.clone()).or_default();
        if entries
            .iter()
            .any(|registration| Arc::ptr_eq(&registration.callback, &callback))
        {
            debug!(id = %event_id, "duplicate subscribe ignored");
            return Subscription {
                registry: Weak::new(),
                event_id,
                token: None,
            };
        }

        entries.push(Registration { token, callback });
        trace!(id = %event_id, listeners = entries.len(), "listener registered");
        Subscription {
            registry: Arc::downgrade(self),
            event_id,
            token: Some(token),
        }
    }

    /// Delivers `event` to every listener registered for its id at the time
    /// of the call, in registration order.
    pub fn dispatch(&self, event: &Event) {
        let snapshot: Vec<Arc<ListenerFn>> = {
            let inner = lock_recover(&self.inner);
            match inner.listeners.get(&event.id) {
                Some(entries) => entries
                    .iter()
                    .map(|registration| Arc::clone(&registration.callback))
                    .collect(),
                None => {
                    trace!(id = %event.id, "event dropped; no listeners registered");
                    return;
                }
            }
        };

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(id = %event.id, "listener panicked during dispatch; continuing");
            }
        }
    }

    pub fn listener_count(&self, event_id: &str) -> usize {
        lock_recover(&self.inner)
            .listeners
            .get(event_id)
            .map_or(0, Vec::len)
    }

    fn remove(&self, event_id: &str, token: u64) {
        let mut inner = lock_recover(&self.inner);
        if let Some(entries) = inner.listeners.get_mut(event_id) {
            entries.retain(|registration| registration.token != token);
            if entries.is_empty() {
                inner.listeners.remove(event_id);
            }
        }
    }
}

/// Owning handle for one listener registration. Dropping it (or calling
/// [`Subscription::cancel`]) unregisters the listener; both are idempotent
/// and safe after the registry itself is gone.
pub struct Subscription {
    registry: Weak<ListenerRegistry>,
    event_id: String,
    token: Option<u64>,
}

impl Subscription {
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove(&self.event_id, token);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
