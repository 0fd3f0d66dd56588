//! Dataflow engine over named buffers.
//!
//! Analysis modules read buffers, compute, and write buffers. The pipeline
//! compiles the module definitions into a topologically ordered plan, then
//! re-evaluates only the modules whose inputs changed.
//!
//! # Architecture
//!
//! ```text
//! producer ──► [accel] ──► Integrate ──► [velocity] ──► Integrate ──► [position]
//!                 │
//!                 └──────► Max (multiple) ──► [peaks], [peak_times]
//! ```
//!
//! # Design
//!
//! - **Enum dispatch**: `BuiltinModule` enum for all built-in modules.
//! - **Validated at build time**: unknown buffers, missing ports, duplicate
//!   writers, cycles and arity mismatches are all rejected before the first
//!   wave runs.
//! - **Change tokens**: a module whose inputs are unchanged since its last
//!   run is skipped.
//! - **Dedicated thread**: the `Scheduler` runs waves on its own thread and
//!   reports through a `SchedulerHandle`.

pub mod bridge;
pub mod compiled_plan;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod module;
pub mod module_kind;
pub mod modules;
pub mod port;
pub mod scheduler;

pub use bridge::{SchedulerCommand, SchedulerEvent, SchedulerHandle};
pub use compiled_plan::{CompiledPlan, PlanStats};
pub use compiler::PipelineCompiler;
pub use error::{PipelineError, PipelineResult};
pub use executor::{ModuleSlot, Pipeline, PipelineBuilder, WaveStats};
pub use module::{BoundSource, BuiltinModule, InputBinding, ModuleContext, OutputBinding};
pub use module_kind::ModuleKind;
pub use port::{Arity, PortBinding, PortDescriptor, PortDirection};
pub use scheduler::Scheduler;
