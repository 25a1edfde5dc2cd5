//! Report sinks.
//!
//! The assembler pushes rows, plot associations and display hints into a
//! `ReportSink` and calls `finish` once at the end. Two implementations:
//!
//! - `CsvReportSink`: `report.csv` (one row per sample) plus a `report.json`
//!   manifest carrying the same rows, image paths, display hints and run counters
//! - `MemorySink`: keeps everything in memory for tests

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::domain::ReportRow;
use crate::error::AppError;

pub const REPORT_CSV: &str = "report.csv";
pub const REPORT_MANIFEST: &str = "report.json";

/// How a spreadsheet view of the report should be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayMetadata {
    /// Row height in points, tall enough for an embedded plot.
    pub row_height: u32,
    /// Width of the plot column, in characters.
    pub plot_column_width: u32,
}

impl Default for DisplayMetadata {
    fn default() -> Self {
        Self {
            row_height: 280,
            plot_column_width: 70,
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub plates: usize,
    pub processed: usize,
    pub fitted: usize,
    pub failed: usize,
}

pub trait ReportSink {
    fn append_row(&mut self, row: ReportRow) -> Result<(), AppError>;
    fn attach_image(&mut self, row: usize, path: &Path) -> Result<(), AppError>;
    fn set_display(&mut self, display: DisplayMetadata) -> Result<(), AppError>;
    fn finish(&mut self, summary: &RunSummary) -> Result<(), AppError>;
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    tool: &'static str,
    generated_at: String,
    summary: &'a RunSummary,
    display: Option<DisplayMetadata>,
    rows: &'a [ReportRow],
    images: &'a BTreeMap<usize, PathBuf>,
}

/// Writes `report.csv` and `report.json` into a directory on `finish`.
#[derive(Debug)]
pub struct CsvReportSink {
    dir: PathBuf,
    rows: Vec<ReportRow>,
    images: BTreeMap<usize, PathBuf>,
    display: Option<DisplayMetadata>,
}

impl CsvReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rows: Vec::new(),
            images: BTreeMap::new(),
            display: None,
        }
    }

    /// Rows appended so far.
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(REPORT_CSV)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(REPORT_MANIFEST)
    }

    fn write_csv(&self) -> Result<(), AppError> {
        let path = self.csv_path();
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| AppError::io(format!("Failed to create report CSV '{}': {e}", path.display())))?;
        for row in &self.rows {
            writer
                .serialize(row)
                .map_err(|e| AppError::io(format!("Failed to write report CSV row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::io(format!("Failed to write report CSV: {e}")))
    }

    fn write_manifest(&self, summary: &RunSummary) -> Result<(), AppError> {
        let path = self.manifest_path();
        let file = File::create(&path)
            .map_err(|e| AppError::io(format!("Failed to create manifest '{}': {e}", path.display())))?;
        let manifest = Manifest {
            tool: "frnt",
            generated_at: Local::now().to_rfc3339(),
            summary,
            display: self.display,
            rows: &self.rows,
            images: &self.images,
        };
        serde_json::to_writer_pretty(file, &manifest)
            .map_err(|e| AppError::io(format!("Failed to write manifest: {e}")))
    }
}

impl ReportSink for CsvReportSink {
    fn append_row(&mut self, row: ReportRow) -> Result<(), AppError> {
        self.rows.push(row);
        Ok(())
    }

    fn attach_image(&mut self, row: usize, path: &Path) -> Result<(), AppError> {
        self.images.insert(row, path.to_path_buf());
        Ok(())
    }

    fn set_display(&mut self, display: DisplayMetadata) -> Result<(), AppError> {
        self.display = Some(display);
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", self.dir.display())))?;
        self.write_csv()?;
        self.write_manifest(summary)
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<ReportRow>,
    pub images: BTreeMap<usize, PathBuf>,
    pub display: Option<DisplayMetadata>,
    pub summary: Option<RunSummary>,
}

impl ReportSink for MemorySink {
    fn append_row(&mut self, row: ReportRow) -> Result<(), AppError> {
        self.rows.push(row);
        Ok(())
    }

    fn attach_image(&mut self, row: usize, path: &Path) -> Result<(), AppError> {
        self.images.insert(row, path.to_path_buf());
        Ok(())
    }

    fn set_display(&mut self, display: DisplayMetadata) -> Result<(), AppError> {
        self.display = Some(display);
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<(), AppError> {
        self.summary = Some(*summary);
        Ok(())
    }
}
