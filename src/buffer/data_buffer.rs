//! Bounded, observable numeric ring buffer.
//!
//! `DataBuffer` is the unit of storage and change notification. Storage never
//! exceeds its capacity: overflowing writes evict the oldest samples first.
//! Every mutation drops the buffer's [`ChangeToken`] and, unless suppressed,
//! notifies observers in registration order.
//!
//! # Write paths
//!
//! - Synchronous writes (`append`, `append_all`, `replace_all`, `clear`) take
//!   the storage lock on the caller's thread.
//! - Deferred writes (`append_deferred`, `append_all_deferred`) are queued to
//!   the buffer's own writer thread and never block the producer. Queued
//!   appends are coalesced into one batch and one notification.
//!
//! # Static buffers
//!
//! A static buffer accepts exactly one write. Once written, every further
//! mutation is silently dropped. This is the latch used for values set once
//! from configuration or edit fields.

use super::observer::{ObserverFn, ObserverList};
use super::token::{ChangeToken, TokenCell};
use super::writer::{self, QueuedWrite};
use crate::id::{BufferId, ObserverId};
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Whether a mutation notifies the buffer's observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notify {
    #[default]
    Observers,
    Silent,
}

/// Running minimum and maximum of the values written since the last clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    pub min: f64,
    pub max: f64,
}

impl Extrema {
    /// Extrema of a slice, ignoring NaN. `None` when nothing comparable.
    pub fn of(values: &[f64]) -> Option<Self> {
        let mut extrema = None;
        for &v in values {
            Self::include(&mut extrema, v);
        }
        extrema
    }

    /// Fold one value into an optional running extrema.
    #[inline]
    pub fn include(extrema: &mut Option<Self>, value: f64) {
        if value.is_nan() {
            return;
        }
        match extrema {
            Some(e) => {
                if value < e.min {
                    e.min = value;
                }
                if value > e.max {
                    e.max = value;
                }
            }
            None => {
                *extrema = Some(Extrema {
                    min: value,
                    max: value,
                })
            }
        }
    }
}

pub(crate) struct BufferState {
    values: VecDeque<f64>,
    capacity: usize,
    written: bool,
    is_static: bool,
    evicted: u64,
    extrema: Option<Extrema>,
}

impl BufferState {
    fn new(capacity: usize, is_static: bool) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
            written: false,
            is_static,
            evicted: 0,
            extrema: None,
        }
    }

    #[inline]
    fn latched(&self) -> bool {
        self.is_static && self.written
    }

    /// Push a batch, then evict from the front until within capacity.
    fn push_all(&mut self, values: &[f64]) {
        self.written |= !values.is_empty();
        for &v in values {
            Extrema::include(&mut self.extrema, v);
        }

        if values.len() >= self.capacity {
            // Everything currently stored plus the head of the batch falls out.
            let dropped = self.values.len() + (values.len() - self.capacity);
            self.evicted += dropped as u64;
            self.values.clear();
            self.values
                .extend(&values[values.len() - self.capacity..]);
            return;
        }

        self.values.extend(values);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.values.len() > self.capacity {
            self.values.pop_front();
            self.evicted += 1;
        }
    }

    fn reset(&mut self) {
        self.values.clear();
        self.evicted = 0;
        self.extrema = None;
    }
}

/// State shared between a `DataBuffer` and its writer thread.
pub(crate) struct BufferShared {
    id: BufferId,
    name: String,
    state: RwLock<BufferState>,
    token: TokenCell,
    observers: ObserverList,
}

impl BufferShared {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Apply a mutation under the write lock. Observers are notified after
    /// the lock is released, and only if the closure reports a change.
    fn mutate<F>(&self, notify: Notify, f: F) -> bool
    where
        F: FnOnce(&mut BufferState) -> bool,
    {
        let changed = {
            let mut state = self.state.write();
            let changed = f(&mut *state);
            if changed {
                self.token.invalidate();
            }
            changed
        };

        if changed && notify == Notify::Observers {
            self.observers.notify(self.id);
        }
        changed
    }

    pub(crate) fn append_all(&self, values: &[f64], notify: Notify) -> bool {
        if values.is_empty() {
            return false;
        }
        self.mutate(notify, |state| {
            if state.latched() {
                return false;
            }
            state.push_all(values);
            true
        })
    }

    fn replace_all(&self, values: &[f64], extrema: Option<Extrema>, notify: Notify) -> bool {
        self.mutate(notify, |state| {
            if state.latched() || (values.is_empty() && state.values.is_empty()) {
                return false;
            }
            state.reset();
            state.push_all(values);
            if let Some(extrema) = extrema {
                state.extrema = Some(extrema);
            }
            true
        })
    }

    fn clear(&self, notify: Notify) -> bool {
        self.mutate(notify, |state| {
            if state.latched() {
                return false;
            }
            state.reset();
            true
        })
    }

    fn set_capacity(&self, capacity: usize) -> bool {
        self.mutate(Notify::Observers, |state| {
            let shrinks = state.values.len() > capacity;
            state.capacity = capacity;
            state.evict_overflow();
            shrinks
        })
    }
}

/// A named, fixed-capacity, thread-safe sequence of `f64` samples.
pub struct DataBuffer {
    shared: Arc<BufferShared>,
    /// Lazily spawned writer thread for deferred writes. `None` inside the
    /// cell means spawning failed and deferred writes apply synchronously.
    writer: OnceLock<Option<Sender<QueuedWrite>>>,
}

impl DataBuffer {
    pub fn new(id: BufferId, name: impl Into<String>, capacity: usize, is_static: bool) -> Self {
        Self {
            shared: Arc::new(BufferShared {
                id,
                name: name.into(),
                state: RwLock::new(BufferState::new(capacity, is_static)),
                token: TokenCell::new(),
                observers: ObserverList::new(),
            }),
            writer: OnceLock::new(),
        }
    }

    pub fn id(&self) -> BufferId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    // ── Writes ──

    /// Append one sample. Dropped silently if the buffer is a written static buffer.
    pub fn append(&self, value: f64) -> bool {
        self.append_with(value, Notify::Observers)
    }

    pub fn append_with(&self, value: f64, notify: Notify) -> bool {
        self.shared.append_all(&[value], notify)
    }

    /// Append a batch as one mutation: one eviction pass, one notification.
    pub fn append_all(&self, values: &[f64]) -> bool {
        self.append_all_with(values, Notify::Observers)
    }

    pub fn append_all_with(&self, values: &[f64], notify: Notify) -> bool {
        self.shared.append_all(values, notify)
    }

    /// Replace the entire contents. Used by non-incremental operators.
    pub fn replace_all(&self, values: &[f64]) -> bool {
        self.shared.replace_all(values, None, Notify::Observers)
    }

    /// Replace the contents with extrema already tracked by the caller.
    pub fn replace_all_with_extrema(&self, values: &[f64], extrema: Option<Extrema>) -> bool {
        self.shared.replace_all(values, extrema, Notify::Observers)
    }

    pub fn replace_all_with(&self, values: &[f64], notify: Notify) -> bool {
        self.shared.replace_all(values, None, notify)
    }

    /// Empty the storage and reset the eviction counter. Capacity is kept.
    pub fn clear(&self) -> bool {
        self.shared.clear(Notify::Observers)
    }

    pub fn clear_with(&self, notify: Notify) -> bool {
        self.shared.clear(notify)
    }

    /// Change the capacity. Shrinking evicts the oldest samples immediately.
    pub fn set_capacity(&self, capacity: usize) {
        self.shared.set_capacity(capacity);
    }

    // ── Deferred writes ──

    /// Queue one sample to the buffer's writer thread without blocking.
    pub fn append_deferred(&self, value: f64) {
        self.enqueue(QueuedWrite::Append(value));
    }

    /// Queue a batch to the buffer's writer thread without blocking.
    pub fn append_all_deferred(&self, values: Vec<f64>) {
        self.enqueue(QueuedWrite::AppendAll(values));
    }

    /// Block until every deferred write queued before this call is applied.
    pub fn flush(&self) {
        let Some(Some(tx)) = self.writer.get() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(QueuedWrite::Barrier(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    fn enqueue(&self, write: QueuedWrite) {
        let writer = self
            .writer
            .get_or_init(|| match writer::spawn(Arc::clone(&self.shared)) {
                Ok(tx) => Some(tx),
                Err(e) => {
                    tracing::warn!(
                        "Could not start writer for buffer '{}', applying deferred writes inline: {}",
                        self.name(),
                        e
                    );
                    None
                }
            });

        let write = match writer {
            Some(tx) => match tx.send(write) {
                Ok(()) => return,
                Err(rejected) => rejected.0,
            },
            None => write,
        };
        writer::apply_inline(&self.shared, write);
    }

    // ── Reads ──

    /// Consistent copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.shared.state.read().values.iter().copied().collect()
    }

    /// Snapshot and the token of exactly that state, taken under one lock.
    pub fn snapshot_with_token(&self) -> (Vec<f64>, ChangeToken) {
        let state = self.shared.state.read();
        let values = state.values.iter().copied().collect();
        (values, self.shared.token.current())
    }

    pub fn len(&self) -> usize {
        self.shared.state.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.read().values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.shared.state.read().values.front().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.shared.state.read().values.back().copied()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.shared.state.read().values.get(index).copied()
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.read().capacity
    }

    /// Samples dropped to honor capacity since the last clear.
    pub fn evicted_count(&self) -> u64 {
        self.shared.state.read().evicted
    }

    pub fn is_written(&self) -> bool {
        self.shared.state.read().written
    }

    pub fn is_static(&self) -> bool {
        self.shared.state.read().is_static
    }

    /// Running extrema of everything written since the last clear or replace.
    pub fn extrema(&self) -> Option<Extrema> {
        self.shared.state.read().extrema
    }

    // ── Change detection ──

    pub fn change_token(&self) -> ChangeToken {
        // Holding the read lock keeps a concurrent mutation from slipping
        // between "state observed" and "token issued".
        let _state = self.shared.state.read();
        self.shared.token.current()
    }

    pub fn is_valid(&self, token: ChangeToken) -> bool {
        self.shared.token.is_valid(token)
    }

    // ── Observers ──

    pub fn register_observer<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(BufferId) + Send + Sync + 'static,
    {
        let callback: Arc<ObserverFn> = Arc::new(callback);
        self.shared.observers.register(callback)
    }

    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.shared.observers.unregister(id)
    }

    pub fn observer_count(&self) -> usize {
        self.shared.observers.len()
    }
}

impl fmt::Debug for DataBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.read();
        f.debug_struct("DataBuffer")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("len", &state.values.len())
            .field("capacity", &state.capacity)
            .field("static", &state.is_static)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn buffer(capacity: usize) -> DataBuffer {
        DataBuffer::new(BufferId(0), "test", capacity, false)
    }

    fn counting(buffer: &DataBuffer) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        buffer.register_observer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hits
    }

    #[test]
    fn test_append_evicts_oldest() {
        let buf = buffer(3);
        for v in 1..=5 {
            buf.append(v as f64);
        }
        assert_eq!(buf.snapshot(), vec![3.0, 4.0, 5.0]);
        assert_eq!(buf.evicted_count(), 2);
        assert_eq!(buf.first(), Some(3.0));
        assert_eq!(buf.last(), Some(5.0));
    }

    #[test]
    fn test_append_all_larger_than_capacity() {
        let buf = buffer(3);
        buf.append_all(&[1.0, 2.0]);
        buf.append_all(&[3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buf.snapshot(), vec![4.0, 5.0, 6.0]);
        assert_eq!(buf.evicted_count(), 3);
    }

    #[test]
    fn test_append_all_notifies_once() {
        let buf = buffer(100);
        let hits = counting(&buf);
        buf.append_all(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        buf.append_all(&[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_silent_write_skips_observers_but_changes_token() {
        let buf = buffer(4);
        let hits = counting(&buf);
        let token = buf.change_token();
        buf.append_with(1.0, Notify::Silent);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!buf.is_valid(token));
    }

    #[test]
    fn test_static_latch() {
        let buf = DataBuffer::new(BufferId(0), "edit", 4, true);
        assert!(buf.append(1.5));
        assert!(!buf.append(2.5));
        assert!(!buf.replace_all(&[9.0]));
        assert!(!buf.clear());
        assert_eq!(buf.snapshot(), vec![1.5]);
    }

    #[test]
    fn test_static_buffer_accepts_replace_as_first_write() {
        let buf = DataBuffer::new(BufferId(0), "edit", 4, true);
        assert!(buf.replace_all(&[3.0, 4.0]));
        assert!(!buf.append(5.0));
        assert_eq!(buf.snapshot(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_clear_resets_eviction_and_keeps_capacity() {
        let buf = buffer(2);
        buf.append_all(&[1.0, 2.0, 3.0]);
        assert_eq!(buf.evicted_count(), 1);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.evicted_count(), 0);
        assert_eq!(buf.capacity(), 2);
        assert_eq!(buf.extrema(), None);
    }

    #[test]
    fn test_shrinking_capacity_truncates_front() {
        let buf = buffer(5);
        buf.append_all(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let hits = counting(&buf);
        buf.set_capacity(2);
        assert_eq!(buf.snapshot(), vec![4.0, 5.0]);
        assert_eq!(buf.evicted_count(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        buf.set_capacity(10);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_change_token_idempotent_until_append() {
        let buf = buffer(4);
        let a = buf.change_token();
        let b = buf.change_token();
        assert_eq!(a, b);
        assert!(buf.is_valid(a));
        buf.append(1.0);
        assert!(!buf.is_valid(a));
        assert_ne!(buf.change_token(), a);
    }

    #[test]
    fn test_dropped_static_write_keeps_token() {
        let buf = DataBuffer::new(BufferId(0), "edit", 1, true);
        buf.append(1.0);
        let token = buf.change_token();
        buf.append(2.0);
        assert!(buf.is_valid(token));
    }

    #[test]
    fn test_extrema_tracked_incrementally() {
        let buf = buffer(2);
        buf.append_all(&[3.0, f64::NAN, -1.0, 7.0]);
        let e = buf.extrema().unwrap();
        assert_eq!(e.min, -1.0);
        assert_eq!(e.max, 7.0);

        buf.replace_all_with_extrema(&[1.0], Some(Extrema { min: 0.0, max: 10.0 }));
        assert_eq!(buf.extrema(), Some(Extrema { min: 0.0, max: 10.0 }));
    }

    #[test]
    fn test_empty_replace_of_empty_buffer_is_not_a_change() {
        let buf = DataBuffer::new(BufferId(0), "out", 4, true);
        let token = buf.change_token();
        assert!(!buf.replace_all(&[]));
        assert!(buf.is_valid(token));
        assert!(!buf.is_written());
        assert!(buf.replace_all(&[1.0]));
    }

    #[test]
    fn test_replace_counts_truncation() {
        let buf = buffer(2);
        buf.append_all(&[1.0, 2.0, 3.0]);
        buf.replace_all(&[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(buf.snapshot(), vec![6.0, 7.0]);
        assert_eq!(buf.evicted_count(), 2);
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let buf = buffer(0);
        buf.append(1.0);
        assert!(buf.is_empty());
        assert!(buf.is_written());
        assert_eq!(buf.evicted_count(), 1);
    }

    #[test]
    fn test_deferred_writes_apply_in_order() {
        let buf = buffer(1000);
        for v in 0..500 {
            buf.append_deferred(v as f64);
        }
        buf.append_all_deferred(vec![500.0, 501.0]);
        buf.flush();
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 502);
        assert_eq!(snap[0], 0.0);
        assert_eq!(snap[501], 501.0);
        assert!(snap.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_flush_without_writer_returns() {
        let buf = buffer(4);
        buf.flush();
        assert!(buf.is_empty());
    }

    proptest! {
        #[test]
        fn prop_capacity_invariant(
            capacity in 0usize..32,
            values in proptest::collection::vec(-1e6f64..1e6, 0..128),
        ) {
            let buf = buffer(capacity);
            for &v in &values {
                buf.append(v);
                prop_assert!(buf.len() <= capacity);
            }
            let keep = values.len().min(capacity);
            prop_assert_eq!(buf.snapshot(), values[values.len() - keep..].to_vec());
            prop_assert_eq!(buf.evicted_count() as usize, values.len() - keep);
        }

        #[test]
        fn prop_batched_matches_repeated(
            capacity in 1usize..16,
            batches in proptest::collection::vec(
                proptest::collection::vec(-100f64..100.0, 0..20), 0..10),
        ) {
            let single = buffer(capacity);
            let batched = buffer(capacity);
            for batch in &batches {
                for &v in batch {
                    single.append(v);
                }
                batched.append_all(batch);
            }
            prop_assert_eq!(single.snapshot(), batched.snapshot());
            prop_assert_eq!(single.evicted_count(), batched.evicted_count());
        }
    }
}
