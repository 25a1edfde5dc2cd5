//! Plate layout: fixed well geometry and the decoder built on it.

pub mod decoder;
pub mod geometry;

pub use decoder::{decode_plates, duplicate_run};
pub use geometry::{WellPosition, WellRole};
