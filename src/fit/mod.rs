//! Curve fitting.
//!
//! Responsibilities:
//!
//! - bounded Nelder–Mead minimization of the 4PL SSR (`fitter`)
//! - per-sample statistics, failure policy and parallel fan-out (`engine`)

pub mod engine;
pub mod fitter;

pub use engine::*;
pub use fitter::*;
