//! Mathematical utilities: bounded-parameter transforms and fit statistics.

pub mod bounds;
pub mod stats;

pub use bounds::*;
pub use stats::*;
