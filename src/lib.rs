//! `frnt-curves` library crate.
//!
//! The binary (`frnt`) is a thin wrapper around this library so that:
//!
//! - the assay pipeline is testable without spawning processes
//! - each stage (layout, normalization, fitting, reporting) can be used on its own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod layout;
pub mod math;
pub mod models;
pub mod normalize;
pub mod plot;
pub mod report;
