//! The four-parameter logistic (4PL) dose-response model.
//!
//! `y(x) = u - (u - l) / (1 + (x / i)^s)`
//!
//! with `x` the dilution fold and `y` the fractional foci reduction. With a
//! negative slope the curve starts near `u` at low dilutions and decays towards
//! `l`; `i` is the dilution of half-maximal reduction (ND50).
//!
//! Initial guesses and bounds are the assay's calibration and are fixed.

/// Named parameter with its initial guess and box constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub init: f64,
    pub min: f64,
    pub max: f64,
}

impl ParamSpec {
    /// Initial guess projected into the box.
    pub fn start(&self) -> f64 {
        self.init.clamp(self.min, self.max)
    }
}

pub const UPPER_LIMIT: ParamSpec = ParamSpec {
    name: "upper limit",
    init: 1.0,
    min: 0.95,
    max: 1.05,
};

pub const SLOPE: ParamSpec = ParamSpec {
    name: "slope",
    init: 0.8,
    min: -1.2,
    max: 0.7,
};

pub const LOWER_LIMIT: ParamSpec = ParamSpec {
    name: "lower limit",
    init: 0.0,
    min: -0.05,
    max: 0.05,
};

pub const INFLECTION: ParamSpec = ParamSpec {
    name: "inflection",
    init: 50.0,
    min: 0.0,
    max: f64::INFINITY,
};

/// Parameter order used by the optimizer: `[u, s, l, i]`.
pub const CALIBRATION: [ParamSpec; 4] = [UPPER_LIMIT, SLOPE, LOWER_LIMIT, INFLECTION];

/// Reduction level whose dilution is reported as ND80.
const ND80_RATIO: f64 = 80.0 / 20.0;

/// Fitted (or candidate) 4PL parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourPl {
    pub upper_limit: f64,
    pub slope: f64,
    pub lower_limit: f64,
    pub inflection: f64,
}

impl FourPl {
    pub fn from_slice(p: &[f64]) -> Self {
        Self {
            upper_limit: p[0],
            slope: p[1],
            lower_limit: p[2],
            inflection: p[3],
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.upper_limit, self.slope, self.lower_limit, self.inflection]
    }

    /// Initial guesses, clipped into their bounds.
    pub fn initial() -> Self {
        Self {
            upper_limit: UPPER_LIMIT.start(),
            slope: SLOPE.start(),
            lower_limit: LOWER_LIMIT.start(),
            inflection: INFLECTION.start(),
        }
    }

    pub fn predict(&self, x: f64) -> f64 {
        predict(x, self)
    }

    /// ND50 is the inflection by construction.
    pub fn nd50(&self) -> f64 {
        self.inflection
    }

    /// Dilution of 80% reduction; `None` when the slope is zero or the value is
    /// not finite.
    pub fn nd80(&self) -> Option<f64> {
        if self.slope == 0.0 {
            return None;
        }
        let v = ND80_RATIO.powf(1.0 / self.slope) * self.inflection;
        v.is_finite().then_some(v)
    }

    pub fn is_finite(&self) -> bool {
        self.upper_limit.is_finite()
            && self.slope.is_finite()
            && self.lower_limit.is_finite()
            && self.inflection.is_finite()
    }
}

/// Evaluate the model at dilution `x`.
pub fn predict(x: f64, p: &FourPl) -> f64 {
    let ratio = (x / p.inflection).powf(p.slope);
    p.upper_limit - (p.upper_limit - p.lower_limit) / (1.0 + ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typical() -> FourPl {
        FourPl {
            upper_limit: 1.0,
            slope: -1.0,
            lower_limit: 0.0,
            inflection: 50.0,
        }
    }

    #[test]
    fn half_reduction_at_inflection() {
        let p = typical();
        assert!((p.predict(50.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn nd80_is_the_dilution_of_eighty_percent_reduction() {
        let p = typical();
        let nd80 = p.nd80().unwrap();
        assert!((p.predict(nd80) - 0.8).abs() < 1e-12);
        assert!(nd80 < p.nd50());
    }

    #[test]
    fn nd80_undefined_for_flat_slope() {
        let p = FourPl { slope: 0.0, ..typical() };
        assert_eq!(p.nd80(), None);
    }

    #[test]
    fn initial_slope_is_clipped_into_bounds() {
        let p = FourPl::initial();
        assert_eq!(p.slope, SLOPE.max);
        assert_eq!(p.upper_limit, 1.0);
        assert_eq!(p.inflection, 50.0);
    }
}
