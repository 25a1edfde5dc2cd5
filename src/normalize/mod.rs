//! Response normalization.
//!
//! Each plate is normalized against its own VOC wells (virus only, no serum):
//!
//! ```text
//! fractional_reduction = 1 - raw_count / mean(VOC counts)
//! ```
//!
//! Negative and VOC wells only feed the reference; they never reach the fitter.

use std::collections::BTreeMap;

use crate::domain::{NormalizedPlate, NormalizedPoint, Plate, SampleSeries};
use crate::error::ReferenceError;
use crate::layout::WellRole;
use crate::math::mean;

/// Mean VOC count of a plate, validated as a usable baseline.
pub fn reference_average(plate: &Plate) -> Result<f64, ReferenceError> {
    let voc: Vec<f64> = plate
        .wells_with_role(WellRole::Voc)
        .map(|w| w.raw_count)
        .collect();

    let Some(average) = mean(&voc) else {
        return Err(ReferenceError::NoVocWells {
            plate_id: plate.plate_id.clone(),
        });
    };
    if !(average.is_finite() && average > 0.0) {
        return Err(ReferenceError::DegenerateAverage {
            plate_id: plate.plate_id.clone(),
            average,
        });
    }
    Ok(average)
}

/// Normalize one plate into per-group series, ascending by group number.
pub fn normalize_plate(plate: &Plate) -> Result<NormalizedPlate, ReferenceError> {
    let reference = reference_average(plate)?;

    let mut groups: BTreeMap<u8, SampleSeries> = BTreeMap::new();
    for well in plate.wells_with_role(WellRole::Sample) {
        let Some(sample) = &well.sample else { continue };
        let series = groups.entry(sample.group).or_insert_with(|| SampleSeries {
            plate_id: plate.plate_id.clone(),
            sample_group: sample.group,
            sample_id: sample.sample_id.clone(),
            points: Vec::new(),
        });
        series.points.push(NormalizedPoint {
            sample_group: sample.group,
            dilution_fold: sample.dilution_fold,
            fractional_reduction: 1.0 - well.raw_count / reference,
        });
    }

    Ok(NormalizedPlate {
        plate_id: plate.plate_id.clone(),
        reference_average: reference,
        series: groups.into_values().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::{WELLS_PER_PLATE, plate_positions};
    use crate::layout::{decode_plates, duplicate_run};

    fn plate_with(voc: f64, sample: f64) -> Plate {
        let counts: Vec<f64> = plate_positions()
            .map(|p| match p.role() {
                WellRole::Voc => voc,
                WellRole::Sample => sample,
                WellRole::Negative => 0.0,
            })
            .collect();
        let samples = duplicate_run(&["s".to_string()]);
        decode_plates(&counts, &["P1".to_string()], &samples)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn sample_at_reference_level_has_zero_reduction() {
        let plate = plate_with(100.0, 100.0);
        let norm = normalize_plate(&plate).unwrap();
        assert_eq!(norm.reference_average, 100.0);
        for s in &norm.series {
            assert!(s.points.iter().all(|p| p.fractional_reduction == 0.0));
        }
    }

    #[test]
    fn half_count_is_half_reduction_and_controls_are_dropped() {
        let plate = plate_with(100.0, 50.0);
        let norm = normalize_plate(&plate).unwrap();
        let n: usize = norm.series.iter().map(|s| s.points.len()).sum();
        assert_eq!(n, 48);
        assert_eq!(norm.series.len(), 4);
        assert!(
            norm.series
                .iter()
                .flat_map(|s| &s.points)
                .all(|p| (p.fractional_reduction - 0.5).abs() < 1e-15)
        );
        let groups: Vec<u8> = norm.series.iter().map(|s| s.sample_group).collect();
        assert_eq!(groups, vec![1, 2, 3, 4]);
    }

    #[test]
    fn zero_voc_average_is_a_reference_error() {
        let plate = plate_with(0.0, 50.0);
        let err = normalize_plate(&plate).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::DegenerateAverage {
                plate_id: "P1".to_string(),
                average: 0.0
            }
        );
    }

    #[test]
    fn plate_without_voc_wells_is_a_reference_error() {
        let mut plate = plate_with(10.0, 5.0);
        plate.wells.retain(|w| w.role != WellRole::Voc);
        assert!(plate.wells.len() < WELLS_PER_PLATE);
        assert!(matches!(
            normalize_plate(&plate),
            Err(ReferenceError::NoVocWells { .. })
        ));
    }
}
