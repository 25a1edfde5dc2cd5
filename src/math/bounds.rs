//! Box constraints for unconstrained optimizers.
//!
//! Nelder–Mead knows nothing about bounds, so each parameter is optimized in an
//! internal coordinate `θ` that maps onto its box:
//!
//! - two-sided `[min, max]`: `x = min + (sin θ + 1) (max - min) / 2`
//! - lower bound only:       `x = min - 1 + sqrt(θ² + 1)`
//! - upper bound only:       `x = max + 1 - sqrt(θ² + 1)`
//! - unbounded:              `x = θ`
//!
//! Every internal point maps inside the box, so trial points are projected
//! rather than rejected.

use crate::models::ParamSpec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Free,
    Lower(f64),
    Upper(f64),
    Both(f64, f64),
}

impl Bound {
    pub fn from_spec(spec: &ParamSpec) -> Self {
        match (spec.min.is_finite(), spec.max.is_finite()) {
            (true, true) => Bound::Both(spec.min, spec.max),
            (true, false) => Bound::Lower(spec.min),
            (false, true) => Bound::Upper(spec.max),
            (false, false) => Bound::Free,
        }
    }

    /// External value to internal coordinate. Values outside the box are
    /// clipped first.
    pub fn to_internal(&self, x: f64) -> f64 {
        match *self {
            Bound::Free => x,
            Bound::Lower(min) => {
                let x = x.max(min);
                ((x - min + 1.0).powi(2) - 1.0).sqrt()
            }
            Bound::Upper(max) => {
                let x = x.min(max);
                ((max - x + 1.0).powi(2) - 1.0).sqrt()
            }
            Bound::Both(min, max) => {
                let x = x.clamp(min, max);
                (2.0 * (x - min) / (max - min) - 1.0).asin()
            }
        }
    }

    pub fn to_external(&self, theta: f64) -> f64 {
        match *self {
            Bound::Free => theta,
            Bound::Lower(min) => min - 1.0 + (theta * theta + 1.0).sqrt(),
            Bound::Upper(max) => max + 1.0 - (theta * theta + 1.0).sqrt(),
            Bound::Both(min, max) => min + (theta.sin() + 1.0) * (max - min) / 2.0,
        }
    }
}

/// Bounds for a whole parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxTransform {
    bounds: Vec<Bound>,
}

impl BoxTransform {
    pub fn new(specs: &[ParamSpec]) -> Self {
        Self {
            bounds: specs.iter().map(Bound::from_spec).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn to_internal(&self, external: &[f64]) -> Vec<f64> {
        self.bounds
            .iter()
            .zip(external)
            .map(|(b, &x)| b.to_internal(x))
            .collect()
    }

    pub fn to_external(&self, internal: &[f64]) -> Vec<f64> {
        self.bounds
            .iter()
            .zip(internal)
            .map(|(b, &t)| b.to_external(t))
            .collect()
    }
}
