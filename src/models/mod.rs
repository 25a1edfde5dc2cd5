//! Dose-response model.
//!
//! The model is a small, pure function so the fitting code stays generic over
//! parameter vectors.

pub mod model;

pub use model::*;
