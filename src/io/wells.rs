//! Tidy well table: one CSV row per decoded well.
//!
//! Columns: `foci_num, fold_dil, type, wellID, sample_num, plateID`. `type` is the
//! sample identifier for sample wells and `negative` / `VOC` for controls.
//!
//! Reading a table back re-derives roles from `wellID`; the `type` column is only
//! used to recover which sample each dilution series belongs to.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Plate;
use crate::error::{AppError, LayoutError};
use crate::layout::decode_plates;
use crate::layout::geometry::{WELLS_PER_PLATE, WellPosition, WellRole};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellRow {
    pub foci_num: f64,
    pub fold_dil: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "wellID")]
    pub well_id: String,
    pub sample_num: Option<u8>,
    #[serde(rename = "plateID")]
    pub plate_id: String,
}

impl WellRow {
    fn from_plate(plate: &Plate) -> impl Iterator<Item = WellRow> + '_ {
        plate.wells.iter().map(|w| WellRow {
            foci_num: w.raw_count,
            fold_dil: w.sample.as_ref().map(|s| s.dilution_fold),
            kind: match (&w.sample, w.role) {
                (Some(s), _) => s.sample_id.clone(),
                (None, WellRole::Voc) => "VOC".to_string(),
                (None, _) => "negative".to_string(),
            },
            well_id: w.label(),
            sample_num: w.sample.as_ref().map(|s| s.group),
            plate_id: w.plate_id.clone(),
        })
    }
}

pub fn write_well_table(path: &Path, plates: &[Plate]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create well table '{}': {e}", path.display())))?;
    write_wells(file, plates)
        .map_err(|e| AppError::io(format!("Failed to write well table '{}': {e}", path.display())))
}

pub fn write_wells<W: Write>(writer: W, plates: &[Plate]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for plate in plates {
        for row in WellRow::from_plate(plate) {
            writer.serialize(row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn read_well_table(path: &Path) -> Result<Vec<Plate>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open well table '{}': {e}", path.display())))?;
    let rows = parse_well_rows(file)
        .map_err(|e| AppError::io(format!("Invalid well table '{}': {e}", path.display())))?;
    Ok(plates_from_rows(&rows)?)
}

pub fn parse_well_rows<R: Read>(reader: R) -> Result<Vec<WellRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    reader.deserialize().collect()
}

/// Rebuild decoded plates from well rows in any order.
pub fn plates_from_rows(rows: &[WellRow]) -> Result<Vec<Plate>, LayoutError> {
    let mut plate_ids: Vec<String> = Vec::new();
    let mut grids: HashMap<&str, Vec<Option<&WellRow>>> = HashMap::new();

    for row in rows {
        let grid = grids.entry(row.plate_id.as_str()).or_insert_with(|| {
            plate_ids.push(row.plate_id.clone());
            vec![None; WELLS_PER_PLATE]
        });
        let position = WellPosition::parse_label(&row.well_id).ok_or_else(|| LayoutError::Table {
            plate_id: row.plate_id.clone(),
            message: format!("invalid well label '{}'", row.well_id),
        })?;
        let slot = &mut grid[position.index() - 1];
        if slot.replace(row).is_some() {
            return Err(LayoutError::Table {
                plate_id: row.plate_id.clone(),
                message: format!("well {} listed twice", row.well_id),
            });
        }
    }

    let mut counts = Vec::with_capacity(plate_ids.len() * WELLS_PER_PLATE);
    let mut samples = Vec::new();
    for plate_id in &plate_ids {
        let grid = &grids[plate_id.as_str()];
        let mut series_id: Option<&str> = None;
        for (offset, slot) in grid.iter().enumerate() {
            let position = WellPosition::from_index(offset + 1);
            let (Some(row), Some(position)) = (slot, position) else {
                return Err(LayoutError::Table {
                    plate_id: plate_id.clone(),
                    message: format!("well {} missing", offset + 1),
                });
            };
            counts.push(row.foci_num);

            let Some(sample_slot) = position.sample_slot() else { continue };
            if sample_slot.dilution_level == 0 {
                samples.push(row.kind.clone());
                series_id = Some(row.kind.as_str());
            } else if series_id != Some(row.kind.as_str()) {
                return Err(LayoutError::Table {
                    plate_id: plate_id.clone(),
                    message: format!(
                        "well {} belongs to '{}' but its dilution series starts with '{}'",
                        row.well_id,
                        row.kind,
                        series_id.unwrap_or("")
                    ),
                });
            }
        }
    }

    decode_plates(&counts, &plate_ids, &samples)
}
