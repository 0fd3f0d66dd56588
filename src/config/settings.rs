//! Scheduler settings
//!
//! Controls how often the scheduler thread is allowed to run an evaluation
//! wave and how it reports back to consumers.
//!
//! # Frame rate
//!
//! Producers may write far faster than any display refreshes. The scheduler
//! coalesces every change that arrives between two waves, so at most
//! `frame_rate_hz` waves run per second. Buffers keep up to their capacity
//! regardless of how slowly consumers pull.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default display frame rate in Hz
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

/// Default wait for a change signal before re-checking commands
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 50;

/// Default capacity of the scheduler event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Settings for the scheduler thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum evaluation waves per second (0 = unthrottled)
    pub frame_rate_hz: u32,

    /// How long the scheduler blocks waiting for changes before polling
    /// its command channel again
    pub idle_timeout_ms: u64,

    /// Capacity of the event channel; events are dropped when it is full
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// Minimum spacing between two waves
    pub fn frame_interval(&self) -> Duration {
        frame_interval(self.frame_rate_hz)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms.max(1))
    }
}

/// Spacing between waves for a frame rate; zero when unthrottled
pub fn frame_interval(frame_rate_hz: u32) -> Duration {
    if frame_rate_hz == 0 {
        Duration::ZERO
    } else {
        Duration::from_nanos(1_000_000_000 / frame_rate_hz as u64)
    }
}
