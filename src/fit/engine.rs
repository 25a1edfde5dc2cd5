//! Per-sample curve fitting: optimizer run, derived statistics, failure policy.
//!
//! A sample group either yields a `FitResult` with finite parameters, chi-square,
//! R², ND50 and ND80, or an explicit `FitFailure`. Nothing non-finite leaves this
//! module.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{FitResult, SampleOutcome, SampleSeries};
use crate::error::FitFailure;
use crate::fit::fitter::{FitOptions, fit_four_pl};
use crate::math::{r_squared, total_sum_of_squares};
use crate::models::{CALIBRATION, FourPl, INFLECTION};

/// Points needed to identify four parameters with at least one residual DOF.
pub const MIN_POINTS: usize = CALIBRATION.len() + 1;

/// Inflections this close to their lower bound are a collapsed fit, not an ND50.
const INFLECTION_FLOOR: f64 = 1e-6;

/// Number of points in the plotted prediction curve.
pub const CURVE_POINTS: usize = 1000;
/// Sweep extent around the observed dilutions.
const CURVE_PAD_LOW: f64 = 10.0;
const CURVE_PAD_HIGH: f64 = 4000.0;

/// Fit one sample group.
pub fn fit_series(series: &SampleSeries, opts: &FitOptions) -> SampleOutcome {
    match try_fit_series(series, opts) {
        Ok(fit) => {
            debug!(
                plate = %series.plate_id,
                sample = %series.sample_id,
                nd50 = fit.nd50,
                r2 = fit.r_squared,
                iters = fit.iterations,
                "fitted"
            );
            SampleOutcome::Fitted(fit)
        }
        Err(failure) => {
            warn!(
                plate = %series.plate_id,
                sample = %series.sample_id,
                "fit failed: {failure}"
            );
            SampleOutcome::Failed {
                sample_group: series.sample_group,
                sample_id: series.sample_id.clone(),
                failure,
            }
        }
    }
}

/// Fit many groups in parallel; outcomes come back in input order.
pub fn fit_all(series: &[SampleSeries], opts: &FitOptions) -> Vec<SampleOutcome> {
    series.par_iter().map(|s| fit_series(s, opts)).collect()
}

fn try_fit_series(series: &SampleSeries, opts: &FitOptions) -> Result<FitResult, FitFailure> {
    let xs = series.xs();
    let ys = series.ys();
    if xs.len() < MIN_POINTS {
        return Err(FitFailure::TooFewPoints {
            n: xs.len(),
            min: MIN_POINTS,
        });
    }

    let fit = fit_four_pl(&xs, &ys, opts)?;
    let params = fit.params;
    if !params.is_finite() {
        return Err(FitFailure::NonFinite { what: "parameters" });
    }

    let chi_square = fit.ssr;
    if !chi_square.is_finite() {
        return Err(FitFailure::NonFinite { what: "chi-square" });
    }
    let total = total_sum_of_squares(&ys);
    let r_squared = r_squared(chi_square, total);
    check_fit_quality(&params, r_squared, total)?;

    let nd50 = params.nd50();
    let nd80 = params
        .nd80()
        .ok_or(FitFailure::UndefinedNd80 { slope: params.slope })?;

    Ok(FitResult {
        sample_group: series.sample_group,
        sample_id: series.sample_id.clone(),
        params,
        chi_square,
        r_squared,
        nd50,
        nd80,
        iterations: fit.iterations,
        evaluation_curve: evaluation_curve(&params, &xs),
    })
}

/// Reject fits that are finite but meaningless: an inflection sitting on its
/// lower bound, or a curve worse than the mean of data that does vary.
fn check_fit_quality(params: &FourPl, r_squared: f64, total: f64) -> Result<(), FitFailure> {
    if params.inflection <= INFLECTION.min + INFLECTION_FLOOR {
        return Err(FitFailure::CollapsedInflection {
            inflection: params.inflection,
        });
    }
    if total > 0.0 && r_squared < 0.0 {
        return Err(FitFailure::WorseThanMean { r_squared });
    }
    Ok(())
}

/// Dense log-spaced prediction from `min(x) - 10` to `max(x) + 4000`.
///
/// The lower end is kept positive for the log axis.
pub fn evaluation_curve(params: &FourPl, xs: &[f64]) -> Vec<(f64, f64)> {
    let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(lo.is_finite() && hi.is_finite()) {
        return Vec::new();
    }
    let x0 = (lo - CURVE_PAD_LOW).max(1.0);
    let x1 = hi + CURVE_PAD_HIGH;

    let (l0, l1) = (x0.ln(), x1.ln());
    (0..CURVE_POINTS)
        .map(|k| {
            let u = k as f64 / (CURVE_POINTS as f64 - 1.0);
            let x = (l0 + u * (l1 - l0)).exp();
            (x, params.predict(x))
        })
        .collect()
}
