//! ==============================================================================
//! store.rs - observable snapshot store
//! ==============================================================================
//!
//! purpose:
//!     holds the current `Snapshot` for the whole session. there is exactly
//!     one `StoreWriter` (owned by the connection manager) and any number of
//!     read-only `SensorStore` handles for the views.
//!
//! reading:
//!     - `snapshot()`   current value (cheap Arc clone)
//!     - `watch()`      pull-style receiver that wakes on change
//!     - `subscribe()`  push-style listener, returns a `Subscription`
//!
//! writing:
//!     every write builds the next snapshot from a `Patch`, swaps it in, and
//!     only then calls listeners. a listener always sees a whole update.
//!
//! ==============================================================================

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::domain::{ConnectionStatus, SensorReading};
use crate::snapshot::{Limits, Patch, Snapshot};

type Listener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

struct Shared {
    current: watch::Sender<Arc<Snapshot>>,
    listeners: Mutex<Listeners>,
}

/// read-only handle to the store
#[derive(Clone)]
pub struct SensorStore {
    shared: Arc<Shared>,
}

/// the single writer. not `Clone`.
pub struct StoreWriter {
    shared: Arc<Shared>,
    limits: Limits,
}

/// keeps a listener registered until `unsubscribe()` or drop
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    shared: std::sync::Weak<Shared>,
}

impl SensorStore {
    /// create the store for one session, with all-absent defaults
    pub fn new(limits: Limits) -> (StoreWriter, SensorStore) {
        let (current, _) = watch::channel(Arc::new(Snapshot::default()));
        let shared = Arc::new(Shared { current, listeners: Mutex::new(Listeners::default()) });
        (StoreWriter { shared: shared.clone(), limits }, SensorStore { shared })
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.current.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.shared.current.subscribe()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.shared.listeners);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription { id, shared: Arc::downgrade(&self.shared) }
    }
}

impl StoreWriter {
    /// a read handle onto the same store
    pub fn reader(&self) -> SensorStore {
        SensorStore { shared: self.shared.clone() }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.current.borrow().clone()
    }

    /// derive, append history and stamp the time as one update
    pub fn apply_reading(&self, reading: SensorReading, now_ms: u64) -> Arc<Snapshot> {
        self.publish(Patch::Reading(reading), now_ms)
    }

    pub fn set_status(&self, status: ConnectionStatus, now_ms: u64) -> Arc<Snapshot> {
        self.publish(Patch::Status(status), now_ms)
    }

    /// status `connected` plus a fresh last-update time
    pub fn mark_connected(&self, now_ms: u64) -> Arc<Snapshot> {
        self.publish(Patch::Connected, now_ms)
    }

    fn publish(&self, patch: Patch, now_ms: u64) -> Arc<Snapshot> {
        let next = Arc::new(self.snapshot().apply(patch, now_ms, &self.limits));
        self.shared.current.send_replace(next.clone());

        // call outside the lock so a listener may unsubscribe itself
        let listeners: Vec<Listener> = lock(&self.shared.listeners)
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&next);
        }
        next
    }
}

impl Subscription {
    /// stop notifications now; same as dropping the subscription
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(listeners: &Mutex<Listeners>) -> std::sync::MutexGuard<'_, Listeners> {
    // poisoned only by a panicking listener; the list itself is intact
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
