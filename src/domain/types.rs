//! Shared domain types.
//!
//! These are plain values, created once per run stage and never mutated
//! afterwards: decoded wells, plates, normalized points, fit outcomes and
//! report rows.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FitFailure;
use crate::layout::geometry::{WellPosition, WellRole};
use crate::models::FourPl;

/// One decoded well.
#[derive(Debug, Clone, PartialEq)]
pub struct WellRecord {
    pub plate_id: String,
    pub position: WellPosition,
    pub role: WellRole,
    pub raw_count: f64,
    /// Present for sample wells only.
    pub sample: Option<SampleAssignment>,
}

impl WellRecord {
    pub fn label(&self) -> String {
        self.position.label()
    }
}

/// Sample-only fields of a well.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleAssignment {
    pub sample_id: String,
    pub dilution_fold: f64,
    pub group: u8,
    pub replicate: u8,
}

/// A decoded plate: exactly 96 wells in well-index order.
#[derive(Debug, Clone, PartialEq)]
pub struct Plate {
    pub plate_id: String,
    pub wells: Vec<WellRecord>,
}

impl Plate {
    pub fn wells_with_role(&self, role: WellRole) -> impl Iterator<Item = &WellRecord> {
        self.wells.iter().filter(move |w| w.role == role)
    }

    /// Highest sample group number present on the plate.
    pub fn group_count(&self) -> u8 {
        self.wells
            .iter()
            .filter_map(|w| w.sample.as_ref().map(|s| s.group))
            .max()
            .unwrap_or(0)
    }
}

/// A sample well after normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub sample_group: u8,
    pub dilution_fold: f64,
    pub fractional_reduction: f64,
}

/// All normalized points of one sample group on one plate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    pub plate_id: String,
    pub sample_group: u8,
    pub sample_id: String,
    pub points: Vec<NormalizedPoint>,
}

impl SampleSeries {
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.dilution_fold).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.fractional_reduction).collect()
    }
}

/// A normalized plate: its reference plus the grouped sample series.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPlate {
    pub plate_id: String,
    pub reference_average: f64,
    pub series: Vec<SampleSeries>,
}

/// Successful 4PL fit for one sample group.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub sample_group: u8,
    pub sample_id: String,
    pub params: FourPl,
    pub chi_square: f64,
    pub r_squared: f64,
    pub nd50: f64,
    pub nd80: f64,
    pub iterations: u64,
    /// Dense `(x, y)` prediction used only for plotting.
    pub evaluation_curve: Vec<(f64, f64)>,
}

/// What happened to one sample group.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Fitted(FitResult),
    Failed {
        sample_group: u8,
        sample_id: String,
        failure: FitFailure,
    },
}

impl SampleOutcome {
    pub fn sample_id(&self) -> &str {
        match self {
            SampleOutcome::Fitted(fit) => &fit.sample_id,
            SampleOutcome::Failed { sample_id, .. } => sample_id,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, SampleOutcome::Fitted(_))
    }
}

/// One row of the final report. Numeric cells are empty for failed samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub row: usize,
    #[serde(rename = "sample ID")]
    pub sample_id: String,
    #[serde(rename = "plate ID")]
    pub plate_id: String,
    #[serde(rename = "chi-squared")]
    pub chi_square: Option<f64>,
    #[serde(rename = "r-squared")]
    pub r_squared: Option<f64>,
    #[serde(rename = "upper limit")]
    pub upper_limit: Option<f64>,
    pub slope: Option<f64>,
    #[serde(rename = "lower limit")]
    pub lower_limit: Option<f64>,
    #[serde(rename = "ND50")]
    pub nd50: Option<f64>,
    #[serde(rename = "ND80")]
    pub nd80: Option<f64>,
    pub plots: Option<String>,
    pub status: String,
}

/// How a plate with an unusable VOC reference is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Abort the run (the assay's historical behavior).
    Abort,
    /// Report the plate's samples as failed and continue.
    SkipPlate,
}

/// A full run's configuration as understood by the pipeline.
///
/// Calibration constants (bounds, dilution series, geometry) are not part of it.
#[derive(Debug, Clone)]
pub struct AssayConfig {
    pub out_dir: PathBuf,
    pub reference_policy: ReferencePolicy,
    pub render_plots: bool,
    /// Rayon worker count for fitting; `None` uses rayon's default.
    pub threads: Option<usize>,
}
