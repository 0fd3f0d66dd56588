//! Built-in analysis module implementations.

pub mod arithmetic;
pub mod average;
pub mod const_generator;
pub mod extremum;
pub mod integrate;
pub mod map;

pub use arithmetic::{ArithmeticModule, ArithmeticOp};
pub use average::AverageModule;
pub use const_generator::ConstGeneratorModule;
pub use extremum::ExtremumModule;
pub use integrate::IntegrateModule;
pub use map::MapModule;
