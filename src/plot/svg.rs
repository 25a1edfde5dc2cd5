//! Plotters SVG renderer for dose-response charts.
//!
//! Chart conventions follow the assay's report sheets: log dilution axis, fixed
//! reduction axis `[-0.2, 1.1]` shown as percentages, blue observations and a
//! black fitted curve, titled with the sample identifier.
//!
//! SVG keeps rendering free of native font dependencies.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::{PlotRenderer, PlotRequest, artifact_stem};

const Y_MIN: f64 = -0.2;
const Y_MAX: f64 = 1.1;
/// Padding around the observed dilutions on the x axis.
const X_PAD_LOW: f64 = 5.0;
const X_PAD_HIGH: f64 = 4500.0;
/// 6 × 5.2 inches at 70 dpi.
const SIZE: (u32, u32) = (420, 364);

#[derive(Debug, Clone)]
pub struct SvgPlotRenderer {
    dir: PathBuf,
}

impl SvgPlotRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PlotRenderer for SvgPlotRenderer {
    fn render(&self, request: &PlotRequest<'_>) -> Result<PathBuf, AppError> {
        let path = self
            .dir
            .join(format!("{}.svg", artifact_stem(request.row, request.title)));
        draw(&path, request).map_err(|e| {
            AppError::io(format!("Failed to render plot '{}': {e}", path.display()))
        })?;
        Ok(path)
    }
}

fn x_range(observed: &[(f64, f64)]) -> (f64, f64) {
    let lo = observed.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let hi = observed.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    if !(lo.is_finite() && hi.is_finite()) {
        return (10.0, 10_000.0);
    }
    ((lo - X_PAD_LOW).max(1.0), hi + X_PAD_HIGH)
}

fn draw(path: &Path, request: &PlotRequest<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x0, x1) = x_range(request.observed);
    let mut chart = ChartBuilder::on(&root)
        .caption(request.title, ("sans-serif", 15))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 50)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d((x0..x1).log_scale(), Y_MIN..Y_MAX)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Fold dilution")
        .y_desc("Foci reduction")
        .y_labels(14)
        .x_label_formatter(&|v: &f64| format!("{v:.0}"))
        .y_label_formatter(&|v: &f64| format!("{:.0}%", v * 100.0))
        .label_style(("sans-serif", 12))
        .draw()?;

    // Curve first so the observations stay visible on top.
    chart.draw_series(LineSeries::new(
        request
            .curve
            .iter()
            .copied()
            .filter(|&(x, y)| x >= x0 && x <= x1 && y.is_finite()),
        &BLACK,
    ))?;

    let point_style = BLUE.mix(0.6).filled();
    chart.draw_series(
        request
            .observed
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, point_style)),
    )?;

    root.present()?;
    Ok(())
}
