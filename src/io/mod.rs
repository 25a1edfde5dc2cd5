//! Input/output helpers.
//!
//! - plate grid + sample sheet ingest (`ingest`)
//! - tidy well table read/write (`wells`)
//! - report sinks (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;
pub mod wells;

pub use export::*;
pub use ingest::*;
pub use wells::*;
