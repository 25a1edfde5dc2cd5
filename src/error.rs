//! Error types.
//!
//! Domain errors are typed so that the pipeline can decide what is fatal
//! (layout, reference) and what is scoped to one sample (fit failures).
//! Everything fatal ends up as an `AppError`, which carries the process exit code.

use thiserror::Error;

/// Exit code for I/O and argument problems.
pub const EXIT_IO: u8 = 2;
/// Exit code for malformed plate layouts.
pub const EXIT_LAYOUT: u8 = 3;
/// Exit code for an unusable VOC reference.
pub const EXIT_REFERENCE: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Raw input does not fit the fixed 96-well layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("raw count sequence has {len} wells, expected a positive multiple of 96")]
    MisalignedCounts { len: usize },
    #[error("{ids} plate identifiers supplied for {plates} plates")]
    PlateIdCount { ids: usize, plates: usize },
    #[error("sample list is empty but the plates contain sample wells")]
    NoSamples,
    #[error("plate {plate_id}, group {group}: replicate series carry different samples ({first} vs {second})")]
    ReplicateMismatch {
        plate_id: String,
        group: u8,
        first: String,
        second: String,
    },
    #[error("plate {plate_id}, well {well}: invalid raw count {value}")]
    InvalidCount {
        plate_id: String,
        well: String,
        value: f64,
    },
    #[error("plate {plate_id}: {message}")]
    Table { plate_id: String, message: String },
}

/// A plate's VOC wells cannot serve as the normalization baseline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReferenceError {
    #[error("plate {plate_id} has no VOC wells")]
    NoVocWells { plate_id: String },
    #[error("plate {plate_id}: VOC reference average is {average}, expected a positive count")]
    DegenerateAverage { plate_id: String, average: f64 },
}

/// Per-sample failure. Recorded in the report, never fatal for the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("optimizer did not converge within {iterations} iterations")]
    NotConverged { iterations: u64 },
    #[error("ND80 undefined for slope {slope}")]
    UndefinedNd80 { slope: f64 },
    #[error("non-finite {what} after fitting")]
    NonFinite { what: &'static str },
    #[error("optimizer error: {0}")]
    Optimizer(String),
    #[error("inflection collapsed onto its lower bound ({inflection})")]
    CollapsedInflection { inflection: f64 },
    #[error("fit explains less than the mean response (R² = {r_squared})")]
    WorseThanMean { r_squared: f64 },
    #[error("only {n} usable points, need at least {min}")]
    TooFewPoints { n: usize, min: usize },
    #[error("plate skipped: {0}")]
    Reference(ReferenceError),
}

impl From<LayoutError> for AppError {
    fn from(err: LayoutError) -> Self {
        AppError::new(EXIT_LAYOUT, format!("Layout error: {err}"))
    }
}

impl From<ReferenceError> for AppError {
    fn from(err: ReferenceError) -> Self {
        AppError::new(EXIT_REFERENCE, format!("Reference error: {err}"))
    }
}
