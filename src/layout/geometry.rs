//! Fixed 96-well plate geometry.
//!
//! Wells are numbered 1..=96 column-major, the order the imager exports them:
//! `A1, B1, ..., H1, A2, ...`. Every role and sample assignment in the crate is
//! derived from this module; nothing else does index arithmetic on wells.
//!
//! Layout:
//!
//! ```text
//!      1  2  3  4  5  6  7  8  9  10 11 12
//!   A  N  N  N  N  N  N  N  N  N  N  N  N
//!   B  N  s  s  s  s  s  s  s  s  V  V  N
//!   .  .  (rows B..G: one dilution per row)
//!   G  N  s  s  s  s  s  s  s  s  V  V  N
//!   H  N  N  N  N  N  N  N  N  N  N  N  N
//! ```
//!
//! Each sample column is one dilution series; two adjacent columns (2–3, 4–5,
//! 6–7, 8–9) are the duplicate run of one sample group.

use serde::{Deserialize, Serialize};

pub const ROWS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];
pub const COLUMNS: u8 = 12;
pub const WELLS_PER_PLATE: usize = 96;

/// Dilution folds, one per sample row (B..G).
pub const DILUTION_SERIES: [f64; 6] = [20.0, 60.0, 180.0, 540.0, 1620.0, 4860.0];

/// Sample groups per plate (columns 2..=9, two columns per group).
pub const GROUPS_PER_PLATE: u8 = 4;
/// Dilution series per sample group.
pub const REPLICATES: u8 = 2;

const VOC_COLUMNS: [u8; 2] = [10, 11];
const FIRST_SAMPLE_COLUMN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellRole {
    Sample,
    Negative,
    Voc,
}

/// Where a sample well sits in the assay design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSlot {
    /// 1-based group number within the plate.
    pub group: u8,
    /// 1 or 2: which of the duplicate series.
    pub replicate: u8,
    /// Index into `DILUTION_SERIES`.
    pub dilution_level: usize,
}

impl SampleSlot {
    pub fn dilution_fold(&self) -> f64 {
        DILUTION_SERIES[self.dilution_level]
    }
}

/// A validated (row, column) position on a plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WellPosition {
    /// 0-based row (0 = A).
    row: u8,
    /// 1-based column.
    column: u8,
}

impl WellPosition {
    /// Position for a 1-based well index; `None` outside 1..=96.
    pub fn from_index(index: usize) -> Option<Self> {
        if !(1..=WELLS_PER_PLATE).contains(&index) {
            return None;
        }
        let zero = index - 1;
        Some(Self {
            row: (zero % ROWS.len()) as u8,
            column: (zero / ROWS.len()) as u8 + 1,
        })
    }

    pub fn new(row: char, column: u8) -> Option<Self> {
        let row = ROWS.iter().position(|&r| r == row.to_ascii_uppercase())? as u8;
        if !(1..=COLUMNS).contains(&column) {
            return None;
        }
        Some(Self { row, column })
    }

    /// Parse a well label such as `B2` or `h12`.
    pub fn parse_label(label: &str) -> Option<Self> {
        let label = label.trim();
        let mut chars = label.chars();
        let row = chars.next()?;
        let column: u8 = chars.as_str().parse().ok()?;
        Self::new(row, column)
    }

    pub fn index(&self) -> usize {
        (self.column as usize - 1) * ROWS.len() + self.row as usize + 1
    }

    pub fn row_letter(&self) -> char {
        ROWS[self.row as usize]
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.row_letter(), self.column)
    }

    fn is_edge_row(&self) -> bool {
        self.row == 0 || self.row as usize == ROWS.len() - 1
    }

    pub fn role(&self) -> WellRole {
        if self.is_edge_row() || self.column == 1 || self.column == COLUMNS {
            WellRole::Negative
        } else if VOC_COLUMNS.contains(&self.column) {
            WellRole::Voc
        } else {
            WellRole::Sample
        }
    }

    /// Sample-group assignment; `None` for control wells.
    pub fn sample_slot(&self) -> Option<SampleSlot> {
        if self.role() != WellRole::Sample {
            return None;
        }
        let series = self.column - FIRST_SAMPLE_COLUMN;
        Some(SampleSlot {
            group: series / REPLICATES + 1,
            replicate: series % REPLICATES + 1,
            dilution_level: self.row as usize - 1,
        })
    }
}

/// Role of a 1-based well index; `None` outside 1..=96.
pub fn classify(index: usize) -> Option<WellRole> {
    WellPosition::from_index(index).map(|p| p.role())
}

/// All positions of one plate in well-index order.
pub fn plate_positions() -> impl Iterator<Item = WellPosition> {
    (1..=WELLS_PER_PLATE).filter_map(WellPosition::from_index)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;

    #[test]
    fn roles_partition_the_plate() {
        let mut sets: BTreeMap<&str, HashSet<usize>> = BTreeMap::new();
        for idx in 1..=WELLS_PER_PLATE {
            let key = match classify(idx).unwrap() {
                WellRole::Negative => "negative",
                WellRole::Voc => "voc",
                WellRole::Sample => "sample",
            };
            sets.entry(key).or_default().insert(idx);
        }

        assert_eq!(sets["negative"].len(), 36);
        assert_eq!(sets["voc"].len(), 12);
        assert_eq!(sets["sample"].len(), 48);

        let union: HashSet<usize> = sets.values().flatten().copied().collect();
        assert_eq!(union, (1..=WELLS_PER_PLATE).collect::<HashSet<usize>>());
    }

    #[test]
    fn index_and_position_round_trip() {
        for idx in 1..=WELLS_PER_PLATE {
            let pos = WellPosition::from_index(idx).unwrap();
            assert_eq!(pos.index(), idx);
            assert_eq!(WellPosition::parse_label(&pos.label()), Some(pos));
        }
        assert!(WellPosition::from_index(0).is_none());
        assert!(WellPosition::from_index(97).is_none());
    }

    #[test]
    fn column_major_numbering() {
        assert_eq!(WellPosition::from_index(1).unwrap().label(), "A1");
        assert_eq!(WellPosition::from_index(8).unwrap().label(), "H1");
        assert_eq!(WellPosition::from_index(10).unwrap().label(), "B2");
        assert_eq!(WellPosition::from_index(96).unwrap().label(), "H12");
    }

    #[test]
    fn named_controls() {
        let role = |l: &str| WellPosition::parse_label(l).unwrap().role();
        assert_eq!(role("A5"), WellRole::Negative);
        assert_eq!(role("H9"), WellRole::Negative);
        assert_eq!(role("D1"), WellRole::Negative);
        assert_eq!(role("D12"), WellRole::Negative);
        assert_eq!(role("B10"), WellRole::Voc);
        assert_eq!(role("G11"), WellRole::Voc);
        assert_eq!(role("A10"), WellRole::Negative);
        assert_eq!(role("C4"), WellRole::Sample);
    }

    #[test]
    fn sample_slots_follow_columns_and_rows() {
        let slot = |l: &str| WellPosition::parse_label(l).unwrap().sample_slot().unwrap();
        assert_eq!(
            slot("B2"),
            SampleSlot {
                group: 1,
                replicate: 1,
                dilution_level: 0
            }
        );
        assert_eq!(slot("G3").group, 1);
        assert_eq!(slot("G3").replicate, 2);
        assert_eq!(slot("G3").dilution_fold(), 4860.0);
        assert_eq!(slot("E9").group, GROUPS_PER_PLATE);
        assert!(WellPosition::parse_label("B10").unwrap().sample_slot().is_none());
    }
}
