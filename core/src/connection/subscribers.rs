use crate::connection::state::{Diagnostic, Snapshot};
use crate::prelude::{FeedError, FeedResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type SnapshotListener = Box<dyn Fn(&Snapshot) + Send + Sync>;
type DiagnosticListener = Box<dyn Fn(&Diagnostic) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    halted: bool,
    next_id: u64,
    snapshots: Vec<(u64, SnapshotListener)>,
    diagnostics: Vec<(u64, DiagnosticListener)>,
}

/// Listener registry. Delivery happens under the registry lock, so once
/// [`Dispatcher::halt`] returns no listener runs again.
#[derive(Default)]
pub(crate) struct Dispatcher {
    listeners: Mutex<Listeners>,
}

impl Dispatcher {
    fn lock(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add_snapshot_listener(
        self: &Arc<Self>,
        listener: SnapshotListener,
    ) -> FeedResult<Subscription> {
        let mut listeners = self.lock();
        if listeners.halted {
            return Err(FeedError::Stopped);
        }
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.snapshots.push((id, listener));
        Ok(Subscription::new(id, self))
    }

    pub(crate) fn add_diagnostic_listener(
        self: &Arc<Self>,
        listener: DiagnosticListener,
    ) -> FeedResult<Subscription> {
        let mut listeners = self.lock();
        if listeners.halted {
            return Err(FeedError::Stopped);
        }
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.diagnostics.push((id, listener));
        Ok(Subscription::new(id, self))
    }

    fn remove(&self, id: u64) {
        let mut listeners = self.lock();
        listeners.snapshots.retain(|(entry, _)| *entry != id);
        listeners.diagnostics.retain(|(entry, _)| *entry != id);
    }

    /// Delivers `snapshot` to every listener. Returns the ids of listeners
    /// that panicked; a panic never reaches the caller or skips the rest.
    pub(crate) fn publish(&self, snapshot: &Snapshot) -> Vec<u64> {
        let listeners = self.lock();
        if listeners.halted {
            return Vec::new();
        }
        listeners
            .snapshots
            .iter()
            .filter(|(_, listener)| {
                panic::catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_err()
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn report(&self, diagnostic: &Diagnostic) -> Vec<u64> {
        let listeners = self.lock();
        if listeners.halted {
            return Vec::new();
        }
        listeners
            .diagnostics
            .iter()
            .filter(|(_, listener)| {
                panic::catch_unwind(AssertUnwindSafe(|| listener(diagnostic))).is_err()
            })
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn halt(&self) {
        let mut listeners = self.lock();
        listeners.halted = true;
        listeners.snapshots.clear();
        listeners.diagnostics.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        let listeners = self.lock();
        listeners.snapshots.len() + listeners.diagnostics.len()
    }
}

/// Handle returned by `subscribe`; pass it to [`Subscription::unsubscribe`]
/// to stop receiving callbacks. Dropping the handle keeps the listener.
#[derive(Debug)]
#[must_use = "dropping a subscription keeps the listener registered"]
pub struct Subscription {
    id: u64,
    dispatcher: Weak<Dispatcher>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Subscription {
    fn new(id: u64, dispatcher: &Arc<Dispatcher>) -> Self {
        Self {
            id,
            dispatcher: Arc::downgrade(dispatcher),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.remove(self.id);
        }
    }
}
