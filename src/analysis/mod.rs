//! Numeric kernels used by the analysis modules.
//!
//! Everything here is pure: no buffers, no locks.
//! - [`operand`]: scalar/vector operands
//! - [`broadcast`]: elementwise broadcasting arithmetic, alignment, GCD
//! - [`reduce`]: mean/std and extremum searches
//! - [`scan`]: prefix sums and elementwise maps with tracked extrema

pub mod broadcast;
pub mod operand;
pub mod reduce;
pub mod scan;

pub use broadcast::{align, combine, divide, fold, gcd, gcd_u64, prioritize};
pub use operand::Operand;
pub use reduce::{find_extrema_per_run, find_extremum, mean_std, Extremum, Located, MeanStd};
pub use scan::{map_tracked, prefix_sum, MapFunction, Tracked};
