//! Integration tests for buffers and the registry

mod common;

use proptest::prelude::*;
use sensorflow::{BufferId, BufferRegistry, DataBuffer, Notify};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn buffer(capacity: usize) -> DataBuffer {
    DataBuffer::new(BufferId(0), "test", capacity, false)
}

proptest! {
    #[test]
    fn prop_storage_never_exceeds_capacity(
        capacity in 0usize..32,
        batches in prop::collection::vec(prop::collection::vec(-1e6f64..1e6, 0..40), 0..20),
    ) {
        let buf = buffer(capacity);
        let mut all = Vec::new();
        for batch in &batches {
            buf.append_all(batch);
            all.extend_from_slice(batch);
            prop_assert!(buf.len() <= capacity);
        }

        // The buffer holds exactly the newest `capacity` samples, in order.
        let keep = all.len().min(capacity);
        prop_assert_eq!(buf.snapshot(), all[all.len() - keep..].to_vec());
        prop_assert_eq!(buf.evicted_count(), (all.len() - keep) as u64);
    }

    #[test]
    fn prop_extrema_match_written_values(values in prop::collection::vec(-1e3f64..1e3, 1..50)) {
        let buf = buffer(8);
        for &v in &values {
            buf.append(v);
        }
        let extrema = buf.extrema().unwrap();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(extrema.min, min);
        prop_assert_eq!(extrema.max, max);
    }
}

#[test]
fn test_batch_append_notifies_once() {
    let buf = buffer(100);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    buf.register_observer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    buf.append_all(&[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    buf.append_all(&[]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observers_run_in_registration_order() {
    let buf = buffer(10);
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        buf.register_observer(move |_| order.lock().unwrap().push(tag));
    }

    buf.append(1.0);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_unregistered_observer_is_not_called() {
    let buf = buffer(10);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = buf.register_observer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    buf.append(1.0);
    assert!(buf.unregister_observer(id));
    assert!(!buf.unregister_observer(id));
    buf.append(2.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observer_receives_buffer_id() {
    let mut registry = BufferRegistry::new();
    registry.create("a", 4, false).unwrap();
    let b = registry.create("b", 4, false).unwrap();

    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);
    registry
        .get(b)
        .unwrap()
        .register_observer(move |id| *slot.lock().unwrap() = Some(id));

    registry.by_name("b").unwrap().append(1.0);
    assert_eq!(*seen.lock().unwrap(), Some(b));
}

#[test]
fn test_static_buffer_latches_after_first_write() {
    let buf = DataBuffer::new(BufferId(0), "gain", 4, true);
    assert!(buf.append_all(&[2.0, 3.0]));
    let token = buf.change_token();

    assert!(!buf.append(4.0));
    assert!(!buf.replace_all(&[9.0]));
    assert!(!buf.clear());
    assert_eq!(buf.snapshot(), vec![2.0, 3.0]);
    assert!(buf.is_valid(token));
}

#[test]
fn test_change_token_tracks_mutations() {
    let buf = buffer(4);
    let (values, token) = buf.snapshot_with_token();
    assert!(values.is_empty());
    assert!(buf.is_valid(token));
    assert_eq!(buf.change_token(), token);

    buf.append(1.0);
    assert!(!buf.is_valid(token));

    let fresh = buf.change_token();
    buf.append_with(2.0, Notify::Silent);
    assert!(!buf.is_valid(fresh));
}

#[test]
fn test_clear_all_keeps_latched_buffers() {
    let mut registry = BufferRegistry::new();
    let data = registry.create("data", 10, false).unwrap();
    let gain = registry.create("gain", 1, true).unwrap();
    let unset = registry.create("unset", 1, true).unwrap();

    registry.get(data).unwrap().append_all(&[1.0, 2.0, 3.0]);
    registry.get(gain).unwrap().append(5.0);

    registry.clear_all(Notify::Silent);
    assert!(registry.get(data).unwrap().is_empty());
    assert_eq!(registry.get(gain).unwrap().snapshot(), vec![5.0]);

    // A static buffer that was never written still takes its first value.
    assert!(registry.get(unset).unwrap().append(7.0));
}

#[test]
fn test_duplicate_buffer_name_rejected() {
    let mut registry = BufferRegistry::new();
    registry.create("a", 4, false).unwrap();
    let err = registry.create("a", 8, false).unwrap_err();
    assert!(err.to_string().contains("'a'"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_deferred_writes_coalesce_and_flush() {
    let mut registry = BufferRegistry::new();
    let id = registry.create("stream", 1000, false).unwrap();
    let shared = registry.shared(id).unwrap();

    let producer = std::thread::spawn(move || {
        for i in 0..500 {
            shared.append_deferred(i as f64);
        }
        shared.append_all_deferred((500..600).map(f64::from).collect());
        shared.flush();
    });
    producer.join().unwrap();

    let buf = registry.get(id).unwrap();
    assert_eq!(buf.len(), 600);
    assert_eq!(buf.first(), Some(0.0));
    assert_eq!(buf.last(), Some(599.0));
}

#[test]
fn test_concurrent_producers_never_exceed_capacity() {
    let mut registry = BufferRegistry::new();
    let id = registry.create("shared", 64, false).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|p| {
            let buf = registry.shared(id).unwrap();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    buf.append((p * 1000 + i) as f64);
                    assert!(buf.len() <= 64);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let buf = registry.get(id).unwrap();
    assert_eq!(buf.len(), 64);
    assert_eq!(buf.evicted_count(), 4000 - 64);
}

#[test]
fn test_set_capacity_shrink_keeps_newest() {
    let buf = buffer(5);
    buf.append_all(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    buf.set_capacity(2);
    assert_eq!(buf.snapshot(), vec![4.0, 5.0]);
    assert_eq!(buf.capacity(), 2);
    common::assert_float_eq(buf.get(0).unwrap(), 4.0, 1e-12);
}
