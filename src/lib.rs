//! # sensorflow: bounded sample buffers and a real-time analysis dataflow
//!
//! Producers (sensors, simulations, file replays) write `f64` samples into
//! named, fixed-capacity buffers. Analysis modules read buffers, compute,
//! and write derived buffers. The pipeline re-evaluates only what changed,
//! on a dedicated scheduler thread, at most once per display frame.
//!
//! ## Architecture
//!
//! - **Buffers**: [`buffer::DataBuffer`] ring storage with change tokens,
//!   running extrema and ordered observers, owned by a
//!   [`buffer::BufferRegistry`]
//! - **Kernels**: [`analysis`] holds the pure numeric code (broadcasting
//!   arithmetic, reductions, prefix sums)
//! - **Pipeline**: [`pipeline`] compiles module definitions into a
//!   topologically ordered plan and evaluates it in waves
//! - **Sessions**: [`session::Session`] ties an experiment definition to its
//!   buffers, pipeline and scheduler thread
//!
//! ## Example
//!
//! ```no_run
//! use sensorflow::config::{BufferConfig, ExperimentConfig, ModuleConfig};
//! use sensorflow::pipeline::ModuleKind;
//! use sensorflow::session::Session;
//!
//! fn main() -> sensorflow::Result<()> {
//!     let config = ExperimentConfig::new()
//!         .with_buffer(BufferConfig::new("accel", 1000))
//!         .with_buffer(BufferConfig::new("velocity", 1000))
//!         .with_module(
//!             ModuleConfig::new("integrate", ModuleKind::Integrate)
//!                 .input_buffer("in", "accel")
//!                 .output("out", "velocity"),
//!         );
//!
//!     let mut session = Session::from_config(&config)?;
//!     session.buffer("accel").unwrap().append_all(&[1.0, 1.0, 1.0]);
//!     session.evaluate()?;
//!     assert_eq!(session.buffer("velocity").unwrap().snapshot(), vec![1.0, 2.0, 3.0]);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod buffer;
pub mod config;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod session;

// Re-export commonly used types
pub use buffer::{BufferRegistry, ChangeToken, DataBuffer, Extrema, Notify};
pub use config::{BufferConfig, ExperimentConfig, ModuleConfig, SchedulerConfig};
pub use error::{Result, SensorflowError};
pub use id::{BufferId, ObserverId};
pub use pipeline::{ModuleKind, Pipeline, PipelineBuilder, PipelineError, WaveStats};
pub use session::{Session, SessionState};
