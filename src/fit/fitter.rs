//! Bounded Nelder–Mead fit of the 4PL model.
//!
//! Given dilutions `x_i` and reductions `y_i` we minimize
//!
//! ```text
//! SSR(p) = Σ (y_i - f(x_i; p))^2
//! ```
//!
//! over `p = [u, s, l, i]` with argmin's Nelder–Mead. The simplex lives in the
//! internal coordinates of `math::bounds`, so every trial point maps back into
//! the calibration box.

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use tracing::debug;

use crate::error::FitFailure;
use crate::math::{BoxTransform, sum_squared_residuals};
use crate::models::{CALIBRATION, FourPl, predict};

/// Cost assigned to parameter vectors whose prediction is not finite.
const NON_FINITE_COST: f64 = 1e30;

/// Relative step of the initial simplex, and the absolute step for zero entries.
const SIMPLEX_STEP: f64 = 0.05;
const SIMPLEX_ZERO_STEP: f64 = 0.00025;

/// Slope of the extra starts; neutralization curves fall with dilution.
const DESCENDING_SLOPE: f64 = -1.0;

/// Optimizer settings. Immutable and shared by every fit of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Stop when the standard deviation of the simplex costs drops below this.
    pub sd_tolerance: f64,
    /// Iteration cap per optimizer run; reaching it is a fit failure.
    pub max_iters: u64,
    /// Extra runs restarted from the best vertex after convergence.
    pub restarts: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            sd_tolerance: 1e-14,
            max_iters: 2000 * (CALIBRATION.len() as u64 + 1),
            restarts: 1,
        }
    }
}

/// Raw optimizer output.
#[derive(Debug, Clone, PartialEq)]
pub struct FourPlFit {
    pub params: FourPl,
    pub ssr: f64,
    pub iterations: u64,
}

/// SSR of the 4PL model, evaluated in internal (unbounded) coordinates.
#[derive(Debug, Clone)]
struct SsrProblem {
    xs: Vec<f64>,
    ys: Vec<f64>,
    transform: BoxTransform,
}

impl SsrProblem {
    fn ssr_external(&self, p: &FourPl) -> f64 {
        let fitted: Vec<f64> = self.xs.iter().map(|&x| predict(x, p)).collect();
        sum_squared_residuals(&self.ys, &fitted)
    }
}

impl CostFunction for SsrProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let p = FourPl::from_slice(&self.transform.to_external(theta));
        let ssr = self.ssr_external(&p);
        Ok(if ssr.is_finite() { ssr } else { NON_FINITE_COST })
    }
}

/// Fit the 4PL model to `(xs, ys)`.
///
/// The simplex is started from the calibrated guesses and from every observed
/// dilution as inflection, once with each slope direction. The start with the
/// lowest SSR wins; ties keep the earlier start. A start that fails is skipped,
/// and only when every start fails is the first failure returned.
pub fn fit_four_pl(xs: &[f64], ys: &[f64], opts: &FitOptions) -> Result<FourPlFit, FitFailure> {
    let problem = SsrProblem {
        xs: xs.to_vec(),
        ys: ys.to_vec(),
        transform: BoxTransform::new(&CALIBRATION),
    };

    let mut best: Option<(Vec<f64>, f64)> = None;
    let mut first_failure = None;
    let mut iterations = 0u64;

    for (start, guess) in start_points(xs).iter().enumerate() {
        let theta = problem.transform.to_internal(&guess.to_vec());
        match polish(&theta, opts.restarts, |from| run_nelder_mead(&problem, from, opts)) {
            Ok((theta, cost, iters)) => {
                iterations += iters;
                debug!(start, inflection = guess.inflection, slope = guess.slope, cost, "start finished");
                if best.as_ref().is_none_or(|(_, best_cost)| cost < *best_cost) {
                    best = Some((theta, cost));
                }
            }
            Err(failure) => {
                debug!(start, inflection = guess.inflection, "start failed: {failure}");
                if let FitFailure::NotConverged { iterations: n } = &failure {
                    iterations += *n;
                }
                first_failure.get_or_insert(failure);
            }
        }
    }

    let Some((theta, _)) = best else {
        return Err(first_failure
            .unwrap_or_else(|| FitFailure::Optimizer("no start points".to_string())));
    };

    let params = FourPl::from_slice(&problem.transform.to_external(&theta));
    // Report SSR recomputed in external space, not the penalized cost.
    let ssr = problem.ssr_external(&params);

    Ok(FourPlFit {
        params,
        ssr,
        iterations,
    })
}

/// Calibrated guesses first, then each distinct dilution as inflection with the
/// calibrated slope and with a descending one.
fn start_points(xs: &[f64]) -> Vec<FourPl> {
    let initial = FourPl::initial();
    let mut folds: Vec<f64> = xs.iter().copied().filter(|x| x.is_finite() && *x > 0.0).collect();
    folds.sort_by(f64::total_cmp);
    folds.dedup();

    let mut starts = vec![initial];
    for inflection in folds {
        for slope in [initial.slope, DESCENDING_SLOPE] {
            let guess = FourPl {
                slope,
                inflection,
                ..initial
            };
            if !starts.contains(&guess) {
                starts.push(guess);
            }
        }
    }
    starts
}

/// One optimizer run from `theta`, then up to `restarts` reruns from the best
/// vertex while they keep lowering the cost.
///
/// Only the first run can fail the fit. A rerun that fails leaves the last
/// converged point in place.
fn polish<F>(
    theta: &[f64],
    restarts: usize,
    mut run: F,
) -> Result<(Vec<f64>, f64, u64), FitFailure>
where
    F: FnMut(&[f64]) -> Result<(Vec<f64>, f64, u64), FitFailure>,
{
    let (mut theta, mut best_cost, mut iterations) = run(theta)?;

    for restart in 1..=restarts {
        match run(&theta) {
            Ok((next, cost, iters)) => {
                iterations += iters;
                if cost >= best_cost {
                    break;
                }
                theta = next;
                best_cost = cost;
            }
            Err(failure) => {
                debug!(restart, "restart failed, keeping converged point: {failure}");
                break;
            }
        }
    }

    Ok((theta, best_cost, iterations))
}

fn run_nelder_mead(
    problem: &SsrProblem,
    start: &[f64],
    opts: &FitOptions,
) -> Result<(Vec<f64>, f64, u64), FitFailure> {
    let solver = NelderMead::new(initial_simplex(start))
        .with_sd_tolerance(opts.sd_tolerance)
        .map_err(|e| FitFailure::Optimizer(e.to_string()))?;

    let result = Executor::new(problem.clone(), solver)
        .configure(|state| state.max_iters(opts.max_iters))
        .run()
        .map_err(|e| FitFailure::Optimizer(e.to_string()))?;

    let state = result.state();
    let iterations = state.get_iter();
    if let TerminationStatus::Terminated(TerminationReason::MaxItersReached) =
        state.get_termination_status()
    {
        return Err(FitFailure::NotConverged { iterations });
    }

    let best = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| FitFailure::Optimizer("optimizer returned no parameters".to_string()))?;
    Ok((best, state.get_best_cost(), iterations))
}

/// `n + 1` vertices: the start point plus one per coordinate, each nudged by 5%.
fn initial_simplex(start: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(start.len() + 1);
    simplex.push(start.to_vec());
    for k in 0..start.len() {
        let mut vertex = start.to_vec();
        vertex[k] = if vertex[k] != 0.0 {
            vertex[k] * (1.0 + SIMPLEX_STEP)
        } else {
            SIMPLEX_ZERO_STEP
        };
        simplex.push(vertex);
    }
    simplex
}
