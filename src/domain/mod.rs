//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - decoded wells and plates (`WellRecord`, `Plate`)
//! - normalized responses (`NormalizedPoint`, `SampleSeries`)
//! - fit outcomes and report rows (`FitResult`, `SampleOutcome`, `ReportRow`)

pub mod types;

pub use types::*;
