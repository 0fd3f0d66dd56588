//! Thread boundary between the scheduler thread and its owner.
//!
//! The owner (a session, a UI loop, a CLI) holds a [`SchedulerHandle`] and
//! sends [`SchedulerCommand`]s; the scheduler thread reports back through
//! [`SchedulerEvent`]s. Producers never go through the bridge: they write
//! straight into buffers and the pipeline picks the change up through its
//! observers.

use crate::error::{Result, SensorflowError};
use crate::pipeline::executor::{Pipeline, WaveStats};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::JoinHandle;

/// Commands sent from the owner to the scheduler thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerCommand {
    /// Stop evaluating waves. Buffers keep accepting data.
    Pause,
    /// Resume evaluating waves.
    Resume,
    /// Run one wave immediately, ignoring the frame rate.
    EvaluateNow,
    /// Clear every buffer and re-evaluate the whole graph.
    ResetRecording,
    /// Change the maximum wave rate. 0 removes the limit.
    SetFrameRate(u32),
    /// Exit the scheduler thread.
    Shutdown,
}

/// Messages sent from the scheduler thread to the owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A wave ran at least one module.
    WaveComplete(WaveStats),
    /// A recording reset has been applied.
    RecordingReset,
    /// The scheduler thread is exiting.
    Shutdown,
}

/// Channel capacity for commands (owner → scheduler).
pub(crate) const CMD_CHANNEL_CAPACITY: usize = 256;

/// Create the channel pairs for one scheduler thread:
/// `(cmd_tx, cmd_rx, event_tx, event_rx)`.
pub(crate) fn channels(
    event_capacity: usize,
) -> (
    Sender<SchedulerCommand>,
    Receiver<SchedulerCommand>,
    Sender<SchedulerEvent>,
    Receiver<SchedulerEvent>,
) {
    let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = bounded(event_capacity.max(1));
    (cmd_tx, cmd_rx, event_tx, event_rx)
}

/// Owner-side handle for a running scheduler thread.
///
/// Joining (or dropping) the handle stops the thread. [`join`](Self::join)
/// hands the pipeline back so it can be inspected or restarted.
pub struct SchedulerHandle {
    cmd_tx: Sender<SchedulerCommand>,
    event_rx: Receiver<SchedulerEvent>,
    thread: Option<JoinHandle<Pipeline>>,
}

impl SchedulerHandle {
    pub(crate) fn new(
        cmd_tx: Sender<SchedulerCommand>,
        event_rx: Receiver<SchedulerEvent>,
        thread: JoinHandle<Pipeline>,
    ) -> Self {
        Self {
            cmd_tx,
            event_rx,
            thread: Some(thread),
        }
    }

    // --- Events ---

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Try to receive a single event without blocking.
    pub fn try_recv(&self) -> Option<SchedulerEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Event receiver, for callers that want to block or `select!`.
    pub fn events(&self) -> &Receiver<SchedulerEvent> {
        &self.event_rx
    }

    // --- Commands ---

    pub fn send(&self, cmd: SchedulerCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn pause(&self) {
        let _ = self.cmd_tx.send(SchedulerCommand::Pause);
    }

    pub fn resume(&self) {
        let _ = self.cmd_tx.send(SchedulerCommand::Resume);
    }

    pub fn evaluate_now(&self) {
        let _ = self.cmd_tx.send(SchedulerCommand::EvaluateNow);
    }

    pub fn reset_recording(&self) {
        let _ = self.cmd_tx.send(SchedulerCommand::ResetRecording);
    }

    pub fn set_frame_rate(&self, hz: u32) {
        let _ = self.cmd_tx.send(SchedulerCommand::SetFrameRate(hz));
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(SchedulerCommand::Shutdown);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the scheduler thread and take the pipeline back.
    pub fn join(mut self) -> Result<Pipeline> {
        self.shutdown();
        let thread = self
            .thread
            .take()
            .ok_or_else(|| SensorflowError::Scheduler("scheduler already joined".into()))?;
        thread
            .join()
            .map_err(|_| SensorflowError::Scheduler("scheduler thread panicked".into()))
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.cmd_tx.send(SchedulerCommand::Shutdown);
            let _ = thread.join();
        }
    }
}
