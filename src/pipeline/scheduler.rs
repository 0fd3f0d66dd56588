//! Scheduler thread: runs evaluation waves as source buffers change.
//!
//! The loop blocks on the pipeline's change signals (with an idle timeout so
//! commands stay responsive), then runs a wave. Waves are spaced by the
//! frame interval; everything written in between is coalesced into the next
//! wave, so a producer running at 10 kHz costs at most `frame_rate_hz` waves
//! per second.

use crate::config::{frame_interval, SchedulerConfig};
use crate::error::Result;
use crate::pipeline::bridge::{channels, SchedulerCommand, SchedulerEvent, SchedulerHandle};
use crate::pipeline::executor::Pipeline;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

pub struct Scheduler {
    pipeline: Pipeline,
    cmd_rx: Receiver<SchedulerCommand>,
    event_tx: Sender<SchedulerEvent>,
    frame_interval: Duration,
    idle_timeout: Duration,
    running: bool,
    paused: bool,
    /// Run a wave on the next iteration even without a change signal.
    force: bool,
    last_wave: Option<Instant>,
}

impl Scheduler {
    /// Move `pipeline` onto its own thread and start evaluating.
    pub fn spawn(pipeline: Pipeline, config: &SchedulerConfig) -> Result<SchedulerHandle> {
        let (cmd_tx, cmd_rx, event_tx, event_rx) = channels(config.event_capacity);
        let scheduler = Scheduler {
            pipeline,
            cmd_rx,
            event_tx,
            frame_interval: config.frame_interval(),
            idle_timeout: config.idle_timeout(),
            running: true,
            paused: false,
            force: true,
            last_wave: None,
        };

        let thread = std::thread::Builder::new()
            .name("sensorflow-scheduler".into())
            .spawn(move || scheduler.run())?;
        Ok(SchedulerHandle::new(cmd_tx, event_rx, thread))
    }

    fn run(mut self) -> Pipeline {
        tracing::info!(
            "Scheduler thread started ({} modules, frame interval {:?})",
            self.pipeline.modules().len(),
            self.frame_interval
        );

        while self.running {
            self.process_commands();
            if !self.running {
                break;
            }

            if self.paused {
                match self.cmd_rx.recv_timeout(self.idle_timeout) {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => self.running = false,
                }
                continue;
            }

            if std::mem::take(&mut self.force) || self.pipeline.wait_for_change(self.idle_timeout)
            {
                self.rate_limit();
                self.wave();
            }
        }

        let _ = self.event_tx.try_send(SchedulerEvent::Shutdown);
        tracing::info!(
            "Scheduler thread exiting after {} waves",
            self.pipeline.waves()
        );
        self.pipeline
    }

    fn process_commands(&mut self) {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("Scheduler handle dropped, stopping");
                    self.running = false;
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::Pause => self.paused = true,
            SchedulerCommand::Resume => {
                self.paused = false;
                self.force = true;
            }
            SchedulerCommand::EvaluateNow => self.wave(),
            SchedulerCommand::ResetRecording => {
                self.pipeline.reset_recording();
                let _ = self.event_tx.try_send(SchedulerEvent::RecordingReset);
                self.force = true;
            }
            SchedulerCommand::SetFrameRate(hz) => {
                self.frame_interval = frame_interval(hz);
                tracing::debug!("Frame rate set to {} Hz", hz);
            }
            SchedulerCommand::Shutdown => self.running = false,
        }
    }

    /// Hold the next wave back until a full frame interval has passed.
    fn rate_limit(&self) {
        if self.frame_interval.is_zero() {
            return;
        }
        if let Some(last) = self.last_wave {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
    }

    fn wave(&mut self) {
        let stats = self.pipeline.evaluate();
        self.last_wave = Some(Instant::now());
        if stats.executed > 0
            && self
                .event_tx
                .try_send(SchedulerEvent::WaveComplete(stats))
                .is_err()
        {
            tracing::trace!("Event channel full, dropping wave report");
        }
    }
}
