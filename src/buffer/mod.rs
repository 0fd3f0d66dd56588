//! Bounded, observable sample storage.
//!
//! - [`DataBuffer`]: fixed-capacity ring of `f64` with eviction, a static
//!   write-once latch, change tokens and ordered observers.
//! - [`BufferRegistry`]: session-owned set of named buffers addressed by
//!   [`BufferId`](crate::id::BufferId).

pub mod data_buffer;
pub mod observer;
pub mod registry;
pub mod token;
mod writer;

pub use data_buffer::{DataBuffer, Extrema, Notify};
pub use observer::ObserverFn;
pub use registry::BufferRegistry;
pub use token::ChangeToken;
