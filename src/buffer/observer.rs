//! Ordered observer lists.
//!
//! Callbacks only receive the [`BufferId`] of the buffer that changed; they
//! are a signal to re-pull a snapshot, never a carrier of the data itself.

use crate::id::{BufferId, ObserverId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked after a buffer mutation.
pub type ObserverFn = dyn Fn(BufferId) + Send + Sync;

type Entries = Arc<Vec<(ObserverId, Arc<ObserverFn>)>>;

/// Copy-on-write list of observers in registration order.
///
/// Notification clones the current list under the lock and invokes the
/// callbacks after releasing it, so a callback may register or unregister
/// observers on the same buffer.
pub(crate) struct ObserverList {
    next_id: AtomicU64,
    entries: Mutex<Entries>,
}

impl ObserverList {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Arc::new(Vec::new())),
        }
    }

    pub(crate) fn register(&self, callback: Arc<ObserverFn>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock();
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.extend(entries.iter().cloned());
        next.push((id, callback));
        *entries = Arc::new(next);
        id
    }

    pub(crate) fn unregister(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.lock();
        if !entries.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let next: Vec<_> = entries
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        *entries = Arc::new(next);
        true
    }

    pub(crate) fn notify(&self, buffer: BufferId) {
        let snapshot = Arc::clone(&self.entries.lock());
        for (_, callback) in snapshot.iter() {
            callback(buffer);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
