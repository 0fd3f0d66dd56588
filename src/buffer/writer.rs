//! Per-buffer writer thread for fire-and-forget producers.
//!
//! Each buffer owns at most one writer. Producers enqueue onto an unbounded
//! channel and return immediately; the writer drains the queue, coalescing
//! consecutive appends into a single batch so a burst of samples costs one
//! lock acquisition and one observer notification. The thread exits when the
//! owning `DataBuffer` (and with it the sender) is dropped.

use super::data_buffer::{BufferShared, Notify};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

/// Upper bound on samples merged into one batch, so observers still see
/// progress during a sustained flood.
const MAX_COALESCED: usize = 1 << 16;

pub(crate) enum QueuedWrite {
    Append(f64),
    AppendAll(Vec<f64>),
    /// Acknowledged once every write queued before it has been applied.
    Barrier(Sender<()>),
}

pub(crate) fn spawn(shared: Arc<BufferShared>) -> std::io::Result<Sender<QueuedWrite>> {
    let (tx, rx) = unbounded();
    let name = format!("buffer-writer-{}", shared.name());
    std::thread::Builder::new()
        .name(name)
        .spawn(move || run(shared, rx))?;
    Ok(tx)
}

/// Fallback when no writer thread is available.
pub(crate) fn apply_inline(shared: &BufferShared, write: QueuedWrite) {
    match write {
        QueuedWrite::Append(v) => {
            shared.append_all(&[v], Notify::Observers);
        }
        QueuedWrite::AppendAll(values) => {
            shared.append_all(&values, Notify::Observers);
        }
        QueuedWrite::Barrier(ack) => {
            let _ = ack.send(());
        }
    }
}

fn run(shared: Arc<BufferShared>, rx: Receiver<QueuedWrite>) {
    tracing::trace!("Writer for buffer '{}' started", shared.name());

    let mut batch: Vec<f64> = Vec::new();
    let mut acks: Vec<Sender<()>> = Vec::new();

    while let Ok(first) = rx.recv() {
        push(first, &mut batch, &mut acks);
        while batch.len() < MAX_COALESCED {
            match rx.try_recv() {
                Ok(next) => push(next, &mut batch, &mut acks),
                Err(_) => break,
            }
        }

        if !batch.is_empty() {
            shared.append_all(&batch, Notify::Observers);
            batch.clear();
        }
        for ack in acks.drain(..) {
            let _ = ack.send(());
        }
    }

    tracing::trace!("Writer for buffer '{}' exiting", shared.name());
}

fn push(write: QueuedWrite, batch: &mut Vec<f64>, acks: &mut Vec<Sender<()>>) {
    match write {
        QueuedWrite::Append(v) => batch.push(v),
        QueuedWrite::AppendAll(values) => batch.extend_from_slice(&values),
        QueuedWrite::Barrier(ack) => acks.push(ack),
    }
}
