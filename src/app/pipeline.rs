//! Shared assay pipeline used by the CLI handlers and the integration tests.
//!
//! plate grids + sample sheets -> decode -> normalize -> fit -> report sink + plots
//!
//! Output files land in `AssayConfig::out_dir`.

use std::path::{Path, PathBuf};

use crate::domain::{AssayConfig, Plate, ReportRow};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::io::export::{CsvReportSink, RunSummary};
use crate::io::ingest::load_assay_input;
use crate::io::wells::read_well_table;
use crate::layout::decode_plates;
use crate::plot::{PlotRenderer, SvgPlotRenderer};
use crate::report::assemble_report;

/// All outputs of one `frnt fit` run.
#[derive(Debug, Clone)]
pub struct AssayRun {
    pub summary: RunSummary,
    pub rows: Vec<ReportRow>,
    pub report_csv: PathBuf,
    pub manifest: PathBuf,
}

/// Read plate grids and sample sheets and decode them.
pub fn decode_inputs(plates: &[PathBuf], sample_sheets: &[PathBuf]) -> Result<Vec<Plate>, AppError> {
    if plates.is_empty() {
        return Err(AppError::io("At least one plate CSV is required."));
    }
    let input = load_assay_input(plates, sample_sheets)?;
    Ok(decode_plates(&input.counts, &input.plate_ids, &input.samples)?)
}

/// Fit plate grids plus sample sheets.
pub fn run_assay(plates: &[PathBuf], sample_sheets: &[PathBuf], config: &AssayConfig) -> Result<AssayRun, AppError> {
    let decoded = decode_inputs(plates, sample_sheets)?;
    run_decoded(&decoded, config)
}

/// Fit a tidy well table written by `frnt decode`.
pub fn run_assay_from_wells(wells: &Path, config: &AssayConfig) -> Result<AssayRun, AppError> {
    let decoded = read_well_table(wells)?;
    run_decoded(&decoded, config)
}

/// Fit already decoded plates and write the report into `config.out_dir`.
pub fn run_decoded(plates: &[Plate], config: &AssayConfig) -> Result<AssayRun, AppError> {
    std::fs::create_dir_all(&config.out_dir)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", config.out_dir.display())))?;

    let renderer = SvgPlotRenderer::new(&config.out_dir);
    let renderer: Option<&dyn PlotRenderer> = config.render_plots.then_some(&renderer as &dyn PlotRenderer);

    let mut sink = CsvReportSink::new(&config.out_dir);
    let summary = assemble_report(plates, config, &FitOptions::default(), &mut sink, renderer)?;

    Ok(AssayRun {
        summary,
        rows: sink.rows().to_vec(),
        report_csv: sink.csv_path(),
        manifest: sink.manifest_path(),
    })
}
