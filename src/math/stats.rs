//! Small statistics helpers for goodness of fit.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of squared residuals `Σ (y_i - f_i)^2`.
pub fn sum_squared_residuals(observed: &[f64], fitted: &[f64]) -> f64 {
    observed
        .iter()
        .zip(fitted)
        .map(|(y, f)| (y - f) * (y - f))
        .sum()
}

/// Total sum of squares `Σ (y_i - ȳ)^2`.
pub fn total_sum_of_squares(observed: &[f64]) -> f64 {
    let Some(ybar) = mean(observed) else {
        return 0.0;
    };
    observed.iter().map(|y| (y - ybar) * (y - ybar)).sum()
}

/// Coefficient of determination `1 - SSR/SST`.
///
/// A response with no variance carries no dose information; it is reported as
/// `0.0` instead of the undefined ratio.
pub fn r_squared(ssr: f64, sst: f64) -> f64 {
    if sst <= 0.0 {
        return 0.0;
    }
    1.0 - ssr / sst
}
