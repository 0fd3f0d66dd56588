//! Experiment sessions
//!
//! A session owns the buffer registry for one loaded experiment and the
//! pipeline that analyses it. While idle the session holds the pipeline and
//! waves run only on [`Session::evaluate`]; [`Session::start`] moves the
//! pipeline onto the scheduler thread and [`Session::stop`] takes it back.
//!
//! Producers write through [`Session::shared`] handles from any thread, in
//! either state.

pub mod types;

pub use types::SessionState;

use crate::buffer::{BufferRegistry, DataBuffer};
use crate::config::{ExperimentConfig, SchedulerConfig};
use crate::error::{Result, ResultExt, SensorflowError};
use crate::pipeline::{
    Pipeline, PipelineBuilder, Scheduler, SchedulerEvent, SchedulerHandle, WaveStats,
};
use std::path::Path;
use std::sync::Arc;

pub struct Session {
    title: Option<String>,
    registry: Arc<BufferRegistry>,
    scheduler_config: SchedulerConfig,
    /// Present while idle
    pipeline: Option<Pipeline>,
    /// Present while running
    scheduler: Option<SchedulerHandle>,
}

impl Session {
    /// Create buffers, write their initial contents and compile the modules.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        let mut registry = BufferRegistry::new();
        let mut initial = Vec::new();
        for buffer in &config.buffers {
            let id = registry.create(buffer.name.as_str(), buffer.capacity, buffer.static_buffer)?;
            if !buffer.initial.is_empty() {
                if let Some(created) = registry.get(id) {
                    created.append_all(&buffer.initial);
                }
                initial.push((id, buffer.initial.clone()));
            }
        }

        let registry = Arc::new(registry);
        let mut builder =
            PipelineBuilder::new(Arc::clone(&registry)).modules(config.modules.iter().cloned());
        for (id, values) in initial {
            builder = builder.initial_values(id, values);
        }
        let pipeline = builder.build()?;

        tracing::info!(
            "Session loaded: {} ({} buffers, {} modules)",
            config.title.as_deref().unwrap_or("untitled"),
            registry.len(),
            config.modules.len()
        );

        Ok(Self {
            title: config.title.clone(),
            registry,
            scheduler_config: config.scheduler.clone(),
            pipeline: Some(pipeline),
            scheduler: None,
        })
    }

    /// Load an experiment file and create a session from it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = ExperimentConfig::load(path)?;
        Self::from_config(&config).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn state(&self) -> SessionState {
        if self.scheduler.is_some() {
            SessionState::Running
        } else {
            SessionState::Idle
        }
    }

    pub fn registry(&self) -> &Arc<BufferRegistry> {
        &self.registry
    }

    pub fn buffer(&self, name: &str) -> Option<&DataBuffer> {
        self.registry.by_name(name)
    }

    /// Shared handle for a producer thread.
    pub fn shared(&self, name: &str) -> Option<Arc<DataBuffer>> {
        self.registry
            .id_of(name)
            .and_then(|id| self.registry.shared(id))
    }

    /// The pipeline, while idle.
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Move the pipeline onto the scheduler thread.
    pub fn start(&mut self) -> Result<()> {
        if self.scheduler.is_some() {
            tracing::warn!("Session already running");
            return Ok(());
        }
        let pipeline = self.take_pipeline()?;
        self.scheduler = Some(Scheduler::spawn(pipeline, &self.scheduler_config)?);
        tracing::info!("Session started");
        Ok(())
    }

    /// Stop the scheduler thread and take the pipeline back.
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.scheduler.take() else {
            return Ok(());
        };
        let pipeline = handle.join().context("Failed to stop session")?;
        tracing::info!("Session stopped after {} waves", pipeline.waves());
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Start a new recording: clear every buffer and re-evaluate everything.
    ///
    /// While running the reset is applied by the scheduler thread and
    /// acknowledged with [`SchedulerEvent::RecordingReset`].
    pub fn reset_recording(&mut self) {
        if let Some(handle) = &self.scheduler {
            handle.reset_recording();
        } else if let Some(pipeline) = &mut self.pipeline {
            pipeline.reset_recording();
        }
    }

    /// Run one wave synchronously. Only allowed while idle.
    pub fn evaluate(&mut self) -> Result<WaveStats> {
        match &mut self.pipeline {
            Some(pipeline) if self.scheduler.is_none() => Ok(pipeline.evaluate()),
            _ => Err(SensorflowError::Scheduler(
                "cannot evaluate synchronously while the scheduler is running".into(),
            )),
        }
    }

    /// Ask the running scheduler for an immediate wave.
    pub fn evaluate_now(&self) {
        if let Some(handle) = &self.scheduler {
            handle.evaluate_now();
        }
    }

    pub fn set_frame_rate(&mut self, hz: u32) {
        self.scheduler_config.frame_rate_hz = hz;
        if let Some(handle) = &self.scheduler {
            handle.set_frame_rate(hz);
        }
    }

    /// Drain scheduler events. Empty while idle.
    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.scheduler
            .as_ref()
            .map(SchedulerHandle::drain)
            .unwrap_or_default()
    }

    fn take_pipeline(&mut self) -> Result<Pipeline> {
        self.pipeline.take().ok_or_else(|| {
            SensorflowError::Scheduler("pipeline was lost when the scheduler failed".into())
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("{}", e);
        }
    }
}
