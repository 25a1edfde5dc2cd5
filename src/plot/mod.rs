//! Dose-response plots.
//!
//! The assembler only knows the `PlotRenderer` trait; `svg` draws the actual
//! chart with Plotters.

use std::path::PathBuf;

use crate::error::AppError;

pub mod svg;

pub use svg::SvgPlotRenderer;

/// Everything needed to draw one sample's chart.
#[derive(Debug, Clone, Copy)]
pub struct PlotRequest<'a> {
    /// Global report row; part of the artifact name.
    pub row: usize,
    pub title: &'a str,
    /// Observed `(dilution, reduction)` pairs.
    pub observed: &'a [(f64, f64)],
    /// Dense fitted curve.
    pub curve: &'a [(f64, f64)],
}

pub trait PlotRenderer: Sync {
    /// Render the chart and return where it was written.
    fn render(&self, request: &PlotRequest<'_>) -> Result<PathBuf, AppError>;
}

/// `{row}{sample}` with anything unsafe for a file name replaced by `_`.
pub fn artifact_stem(row: usize, title: &str) -> String {
    let safe: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{row}{safe}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_stem_is_row_then_sanitized_name() {
        assert_eq!(artifact_stem(3, "S-01"), "3S-01");
        assert_eq!(artifact_stem(12, "pt 7/a"), "12pt_7_a");
    }
}
