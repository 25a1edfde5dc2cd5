//! Plate count and sample sheet ingest.
//!
//! Plate files hold the imager's 8 × 12 count grid, one CSV per plate, with
//! optional labels:
//!
//! ```text
//! ,1,2,3,...,12        <- optional header
//! A,12,0,3,...,1       <- optional row letter
//! ...
//! H,...
//! ```
//!
//! The plate identifier is the file stem. Counts are flattened column-major
//! (`A1, B1, ..., H1, A2, ...`), the order `layout::decoder` expects.
//!
//! Sample sheets list one identifier per record in the first column. Reading
//! stops at the first empty record, which marks the end of a run.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{AppError, LayoutError};
use crate::layout::duplicate_run;
use crate::layout::geometry::{COLUMNS, ROWS};

/// Header cells recognised at the top of a sample sheet.
const SAMPLE_HEADERS: [&str; 5] = ["sample", "sample_id", "sample id", "sampleid", "type"];

/// Counts of one plate, column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateCounts {
    pub plate_id: String,
    pub counts: Vec<f64>,
}

/// Everything the decoder needs for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssayInput {
    pub plate_ids: Vec<String>,
    /// All plates' counts, plate-then-well order.
    pub counts: Vec<f64>,
    /// Pre-duplicated sample list.
    pub samples: Vec<String>,
}

/// Load plates and sample sheets from disk.
pub fn load_assay_input(plates: &[PathBuf], sample_sheets: &[PathBuf]) -> Result<AssayInput, AppError> {
    info!("Processing {} plates", plates.len());

    let mut plate_ids = Vec::with_capacity(plates.len());
    let mut counts = Vec::with_capacity(plates.len() * ROWS.len() * COLUMNS as usize);
    for path in plates {
        let plate = read_plate_csv(path)?;
        plate_ids.push(plate.plate_id);
        counts.extend(plate.counts);
    }

    let mut samples = Vec::new();
    for path in sample_sheets {
        samples.extend(read_sample_sheet(path)?);
    }
    info!("Read {} sample identifiers", samples.len());

    Ok(AssayInput {
        plate_ids,
        counts,
        samples: duplicate_run(&samples),
    })
}

pub fn plate_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn read_plate_csv(path: &Path) -> Result<PlateCounts, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open plate CSV '{}': {e}", path.display())))?;
    let plate_id = plate_id_from_path(path);
    let counts = parse_plate_grid(&plate_id, file)?;
    Ok(PlateCounts { plate_id, counts })
}

/// Parse an 8 × 12 grid into 96 column-major counts.
pub fn parse_plate_grid<R: Read>(plate_id: &str, reader: R) -> Result<Vec<f64>, LayoutError> {
    let table_err = |message: String| LayoutError::Table {
        plate_id: plate_id.to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| table_err(format!("CSV parse error: {e}")))?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        records.push(cells);
    }

    let labelled = records.iter().any(|r| row_letter(&r[0]).is_some());
    let rows: Vec<(usize, &[String])> = if labelled {
        records
            .iter()
            .filter_map(|r| row_letter(&r[0]).map(|row| (row, &r[1..])))
            .collect()
    } else {
        // A bare grid may still carry a column-number header.
        let skip = usize::from(records.len() == ROWS.len() + 1);
        records
            .iter()
            .skip(skip)
            .enumerate()
            .map(|(row, r)| (row, r.as_slice()))
            .collect()
    };

    if rows.len() != ROWS.len() {
        return Err(table_err(format!(
            "expected {} grid rows, found {}",
            ROWS.len(),
            rows.len()
        )));
    }

    let mut grid = vec![[0.0_f64; COLUMNS as usize]; ROWS.len()];
    let mut seen = [false; 8];
    for (row, cells) in rows {
        if std::mem::replace(&mut seen[row], true) {
            return Err(table_err(format!("row {} appears twice", ROWS[row])));
        }
        let values: Vec<&String> = cells.iter().take_while(|c| !c.is_empty()).collect();
        if values.len() != COLUMNS as usize {
            return Err(table_err(format!(
                "row {} has {} counts, expected {COLUMNS}",
                ROWS[row],
                values.len()
            )));
        }
        for (col, cell) in values.into_iter().enumerate() {
            grid[row][col] = cell.parse::<f64>().map_err(|_| {
                table_err(format!("well {}{}: '{cell}' is not a count", ROWS[row], col + 1))
            })?;
        }
    }

    let mut counts = Vec::with_capacity(ROWS.len() * COLUMNS as usize);
    for col in 0..COLUMNS as usize {
        for row in &grid {
            counts.push(row[col]);
        }
    }
    Ok(counts)
}

fn row_letter(cell: &str) -> Option<usize> {
    let mut chars = cell.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    ROWS.iter().position(|&r| r == c.to_ascii_uppercase())
}

pub fn read_sample_sheet(path: &Path) -> Result<Vec<String>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open sample sheet '{}': {e}", path.display())))?;
    parse_sample_sheet(file)
        .map_err(|e| AppError::io(format!("Failed to read sample sheet '{}': {e}", path.display())))
}

pub fn parse_sample_sheet<R: Read>(reader: R) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let id = record.get(0).unwrap_or("");
        if idx == 0 && SAMPLE_HEADERS.contains(&id.to_ascii_lowercase().as_str()) {
            continue;
        }
        if id.is_empty() {
            break;
        }
        samples.push(id.to_string());
    }
    Ok(samples)
}

/// Write 96 column-major counts as a labelled 8 × 12 grid.
pub fn write_plate_csv(path: &Path, counts: &[f64]) -> Result<(), AppError> {
    let n_rows = ROWS.len();
    if counts.len() != n_rows * COLUMNS as usize {
        return Err(AppError::io(format!(
            "Plate '{}' has {} counts, expected {}",
            path.display(),
            counts.len(),
            n_rows * COLUMNS as usize
        )));
    }
    let err = |e: csv::Error| AppError::io(format!("Failed to write plate CSV '{}': {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    let mut header = vec![String::new()];
    header.extend((1..=COLUMNS).map(|c| c.to_string()));
    writer.write_record(&header).map_err(err)?;
    for (r, letter) in ROWS.iter().enumerate() {
        let mut record = vec![letter.to_string()];
        record.extend((0..COLUMNS as usize).map(|c| counts[c * n_rows + r].to_string()));
        writer.write_record(&record).map_err(err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write plate CSV '{}': {e}", path.display())))
}

/// Write a sample sheet with a `sample ID` header.
pub fn write_sample_sheet(path: &Path, samples: &[String]) -> Result<(), AppError> {
    let err = |e: csv::Error| AppError::io(format!("Failed to write sample sheet '{}': {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    writer.write_record(["sample ID"]).map_err(err)?;
    for id in samples {
        writer.write_record([id]).map_err(err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write sample sheet '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_text(labelled: bool) -> String {
        let mut out = String::new();
        if labelled {
            out.push_str(",1,2,3,4,5,6,7,8,9,10,11,12\n");
        }
        for (r, letter) in ROWS.iter().enumerate() {
            if labelled {
                out.push_str(&format!("{letter},"));
            }
            let cells: Vec<String> = (0..12).map(|c| format!("{}", r * 100 + c)).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    #[test]
    fn bare_and_labelled_grids_flatten_column_major() {
        for labelled in [false, true] {
            let counts = parse_plate_grid("P1", grid_text(labelled).as_bytes()).unwrap();
            assert_eq!(counts.len(), 96);
            // A1, B1, ..., then A2.
            assert_eq!(counts[0], 0.0);
            assert_eq!(counts[1], 100.0);
            assert_eq!(counts[7], 700.0);
            assert_eq!(counts[8], 1.0);
            assert_eq!(counts[95], 711.0);
        }
    }

    #[test]
    fn short_row_is_a_layout_error() {
        let text = grid_text(false).replacen(",11\n", "\n", 1);
        let err = parse_plate_grid("P9", text.as_bytes()).unwrap_err();
        assert!(matches!(err, LayoutError::Table { ref plate_id, .. } if plate_id == "P9"));
    }

    #[test]
    fn non_numeric_count_is_a_layout_error() {
        let text = grid_text(true).replacen("A,0,", "A,x,", 1);
        let err = parse_plate_grid("P1", text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("A1"));
    }

    #[test]
    fn sample_sheet_skips_header_and_stops_at_blank() {
        let text = "sample ID\nS1\nS2\n\nS3\n";
        let samples = parse_sample_sheet(text.as_bytes()).unwrap();
        assert_eq!(samples, vec!["S1".to_string(), "S2".to_string()]);
    }

    #[test]
    fn written_grid_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("P7.csv");
        let counts: Vec<f64> = (0..96).map(f64::from).collect();
        write_plate_csv(&path, &counts).unwrap();
        let plate = read_plate_csv(&path).unwrap();
        assert_eq!(plate.plate_id, "P7");
        assert_eq!(plate.counts, counts);
    }

    #[test]
    fn plate_id_is_the_file_stem() {
        assert_eq!(plate_id_from_path(Path::new("/runs/2024-05-01_plate3.csv")), "2024-05-01_plate3");
    }
}
