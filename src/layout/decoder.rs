//! Plate-layout decoding: raw well counts + sample sheet → `Plate`s.
//!
//! Counts arrive as one flat sequence in plate-then-well order (96 per plate,
//! column-major within a plate). Roles, dilutions and group numbers come from
//! `geometry`; the only thing read from the sample sheet is which identifier
//! each dilution series belongs to.
//!
//! Sample identifiers are consumed by a cursor that advances once per dilution
//! series and is shared across plates, wrapping around the list. The list is
//! expected pre-duplicated (`[a, a, b, b, ...]`) so both series of a group carry
//! the same identifier; `duplicate_run` builds it from a plain sheet.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Plate, SampleAssignment, WellRecord};
use crate::error::LayoutError;
use crate::layout::geometry::{REPLICATES, WELLS_PER_PLATE, WellRole, plate_positions};

/// Repeat every identifier once per replicate series, keeping order.
pub fn duplicate_run(ids: &[String]) -> Vec<String> {
    ids.iter()
        .flat_map(|id| std::iter::repeat_n(id.clone(), REPLICATES as usize))
        .collect()
}

/// Decode all plates.
///
/// `plate_ids` names the plates in input order; `samples` is the pre-duplicated
/// sample list.
pub fn decode_plates(
    counts: &[f64],
    plate_ids: &[String],
    samples: &[String],
) -> Result<Vec<Plate>, LayoutError> {
    if counts.is_empty() || counts.len() % WELLS_PER_PLATE != 0 {
        return Err(LayoutError::MisalignedCounts { len: counts.len() });
    }
    let n_plates = counts.len() / WELLS_PER_PLATE;
    if plate_ids.len() != n_plates {
        return Err(LayoutError::PlateIdCount {
            ids: plate_ids.len(),
            plates: n_plates,
        });
    }
    // Every plate has sample wells, so an empty sheet can never be satisfied.
    if samples.is_empty() {
        return Err(LayoutError::NoSamples);
    }

    let mut cursor = SampleCursor::new(samples);
    let mut plates = Vec::with_capacity(n_plates);

    for (plate_counts, plate_id) in counts.chunks_exact(WELLS_PER_PLATE).zip(plate_ids) {
        let plate = decode_plate(plate_id, plate_counts, &mut cursor)?;
        check_replicates(&plate)?;
        debug!(plate = %plate.plate_id, groups = plate.group_count(), "decoded plate");
        plates.push(plate);
    }

    Ok(plates)
}

struct SampleCursor<'a> {
    samples: &'a [String],
    next: usize,
}

impl<'a> SampleCursor<'a> {
    fn new(samples: &'a [String]) -> Self {
        Self { samples, next: 0 }
    }

    fn advance(&mut self) -> &'a str {
        let id = &self.samples[self.next];
        self.next = (self.next + 1) % self.samples.len();
        id
    }
}

fn decode_plate(
    plate_id: &str,
    counts: &[f64],
    cursor: &mut SampleCursor<'_>,
) -> Result<Plate, LayoutError> {
    let mut wells = Vec::with_capacity(WELLS_PER_PLATE);
    let mut series_id: &str = "";

    for (position, &raw_count) in plate_positions().zip(counts) {
        if !(raw_count.is_finite() && raw_count >= 0.0) {
            return Err(LayoutError::InvalidCount {
                plate_id: plate_id.to_string(),
                well: position.label(),
                value: raw_count,
            });
        }

        let sample = match position.sample_slot() {
            Some(slot) => {
                // First well of a dilution series: move on to the next identifier.
                if slot.dilution_level == 0 {
                    series_id = cursor.advance();
                }
                Some(SampleAssignment {
                    sample_id: series_id.to_string(),
                    dilution_fold: slot.dilution_fold(),
                    group: slot.group,
                    replicate: slot.replicate,
                })
            }
            None => None,
        };

        wells.push(WellRecord {
            plate_id: plate_id.to_string(),
            position,
            role: position.role(),
            raw_count,
            sample,
        });
    }

    Ok(Plate {
        plate_id: plate_id.to_string(),
        wells,
    })
}

fn check_replicates(plate: &Plate) -> Result<(), LayoutError> {
    let mut first_seen: BTreeMap<u8, &str> = BTreeMap::new();
    for well in plate.wells_with_role(WellRole::Sample) {
        let Some(s) = &well.sample else { continue };
        let first = first_seen.entry(s.group).or_insert(&s.sample_id);
        if *first != s.sample_id {
            return Err(LayoutError::ReplicateMismatch {
                plate_id: plate.plate_id.clone(),
                group: s.group,
                first: first.to_string(),
                second: s.sample_id.clone(),
            });
        }
    }
    Ok(())
}
