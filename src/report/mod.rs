//! Report assembly: plates → normalized series → fits → rows, plots and counters.
//!
//! Row indices are 1-based and strictly increasing in plate-then-group order.
//! Fitting fans out in parallel; rows are emitted and plots rendered sequentially
//! so artifact names and sink order match the row order.

use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

use crate::domain::{
    AssayConfig, NormalizedPlate, Plate, ReferencePolicy, ReportRow, SampleOutcome, SampleSeries,
};
use crate::error::{AppError, FitFailure, ReferenceError};
use crate::fit::{FitOptions, fit_all};
use crate::io::export::{DisplayMetadata, ReportSink, RunSummary};
use crate::layout::WellRole;
use crate::normalize::normalize_plate;
use crate::plot::{PlotRenderer, PlotRequest};

pub mod format;

pub use format::*;

/// Status recorded for a successful fit.
pub const STATUS_OK: &str = "ok";

enum PlateWork {
    Normalized(NormalizedPlate),
    Skipped {
        plate_id: String,
        groups: Vec<(u8, String)>,
        error: ReferenceError,
    },
}

/// Run normalization, fitting and reporting for decoded plates.
///
/// Reference errors abort the run unless the policy is `SkipPlate`, in which case
/// every group of the plate becomes a failed row.
pub fn assemble_report(
    plates: &[Plate],
    config: &AssayConfig,
    opts: &FitOptions,
    sink: &mut dyn ReportSink,
    renderer: Option<&dyn PlotRenderer>,
) -> Result<RunSummary, AppError> {
    let work = normalize_all(plates, config.reference_policy)?;

    let series: Vec<SampleSeries> = work
        .iter()
        .filter_map(|w| match w {
            PlateWork::Normalized(p) => Some(p.series.iter().cloned()),
            PlateWork::Skipped { .. } => None,
        })
        .flatten()
        .collect();
    let outcomes = fit_in_pool(&series, opts, config.threads)?;
    let mut fitted = series.iter().zip(outcomes);

    let mut summary = RunSummary {
        plates: plates.len(),
        ..RunSummary::default()
    };
    let mut row_index = 0usize;

    for plate in &work {
        match plate {
            PlateWork::Normalized(norm) => {
                info!("Processing plate: {}", norm.plate_id);
                for (s, outcome) in fitted.by_ref().take(norm.series.len()) {
                    row_index += 1;
                    let mut row = report_row(row_index, &norm.plate_id, &outcome);

                    if let (SampleOutcome::Fitted(fit), Some(renderer)) = (&outcome, renderer) {
                        let observed: Vec<(f64, f64)> = s
                            .points
                            .iter()
                            .map(|p| (p.dilution_fold, p.fractional_reduction))
                            .collect();
                        let path = renderer.render(&PlotRequest {
                            row: row_index,
                            title: &fit.sample_id,
                            observed: &observed,
                            curve: &fit.evaluation_curve,
                        })?;
                        row.plots = path.file_name().map(|n| n.to_string_lossy().into_owned());
                        sink.attach_image(row_index, &path)?;
                    }

                    tally(&mut summary, &outcome);
                    sink.append_row(row)?;
                }
            }
            PlateWork::Skipped {
                plate_id,
                groups,
                error,
            } => {
                info!("Processing plate: {plate_id}");
                warn!("Skipping plate {plate_id}: {error}");
                for (group, sample_id) in groups {
                    row_index += 1;
                    let outcome = SampleOutcome::Failed {
                        sample_group: *group,
                        sample_id: sample_id.clone(),
                        failure: FitFailure::Reference(error.clone()),
                    };
                    tally(&mut summary, &outcome);
                    sink.append_row(report_row(row_index, plate_id, &outcome))?;
                }
            }
        }
    }

    sink.set_display(DisplayMetadata::default())?;
    info!(
        fitted = summary.fitted,
        failed = summary.failed,
        "Total samples processed: {}",
        summary.processed
    );
    sink.finish(&summary)?;
    Ok(summary)
}

fn normalize_all(plates: &[Plate], policy: ReferencePolicy) -> Result<Vec<PlateWork>, AppError> {
    let mut work = Vec::with_capacity(plates.len());
    for plate in plates {
        match normalize_plate(plate) {
            Ok(norm) => work.push(PlateWork::Normalized(norm)),
            Err(error) if policy == ReferencePolicy::SkipPlate => work.push(PlateWork::Skipped {
                plate_id: plate.plate_id.clone(),
                groups: plate_groups(plate),
                error,
            }),
            Err(error) => return Err(error.into()),
        }
    }
    Ok(work)
}

/// `(group, sample_id)` for every sample group of a plate, ascending.
fn plate_groups(plate: &Plate) -> Vec<(u8, String)> {
    let mut groups: Vec<(u8, String)> = Vec::new();
    for well in plate.wells_with_role(WellRole::Sample) {
        let Some(s) = &well.sample else { continue };
        if !groups.iter().any(|(g, _)| *g == s.group) {
            groups.push((s.group, s.sample_id.clone()));
        }
    }
    groups.sort_by_key(|(g, _)| *g);
    groups
}

fn fit_in_pool(
    series: &[SampleSeries],
    opts: &FitOptions,
    threads: Option<usize>,
) -> Result<Vec<SampleOutcome>, AppError> {
    match threads {
        Some(n) => {
            let pool = ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| AppError::io(format!("Failed to start {n} fit threads: {e}")))?;
            Ok(pool.install(|| fit_all(series, opts)))
        }
        None => Ok(fit_all(series, opts)),
    }
}

fn tally(summary: &mut RunSummary, outcome: &SampleOutcome) {
    summary.processed += 1;
    if outcome.is_fitted() {
        summary.fitted += 1;
    } else {
        summary.failed += 1;
    }
}

/// Report row for one outcome. Failed samples keep empty numeric cells.
pub fn report_row(row: usize, plate_id: &str, outcome: &SampleOutcome) -> ReportRow {
    match outcome {
        SampleOutcome::Fitted(fit) => ReportRow {
            row,
            sample_id: fit.sample_id.clone(),
            plate_id: plate_id.to_string(),
            chi_square: Some(fit.chi_square),
            r_squared: Some(fit.r_squared),
            upper_limit: Some(fit.params.upper_limit),
            slope: Some(fit.params.slope),
            lower_limit: Some(fit.params.lower_limit),
            nd50: Some(fit.nd50),
            nd80: Some(fit.nd80),
            plots: None,
            status: STATUS_OK.to_string(),
        },
        SampleOutcome::Failed {
            sample_id, failure, ..
        } => ReportRow {
            row,
            sample_id: sample_id.clone(),
            plate_id: plate_id.to_string(),
            chi_square: None,
            r_squared: None,
            upper_limit: None,
            slope: None,
            lower_limit: None,
            nd50: None,
            nd80: None,
            plots: None,
            status: failure.to_string(),
        },
    }
}
