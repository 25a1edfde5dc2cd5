//! Synthetic assay generation.
//!
//! Produces plates whose sample groups follow a known 4PL response, so that the
//! full pipeline can be exercised without imager exports:
//!
//! - VOC wells: `voc_mean` foci plus count noise
//! - negative wells: no virus, noise only
//! - sample wells: `voc_mean * (1 - y(x))` with `y` the sample's true 4PL curve
//!
//! ND50s are drawn log-uniform so both weak and strong sera show up. Counts are
//! rounded and clamped at zero like real foci counts.

use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::Serialize;

use crate::error::AppError;
use crate::io::ingest::{PlateCounts, write_plate_csv, write_sample_sheet};
use crate::layout::geometry::{GROUPS_PER_PLATE, WellRole, plate_positions};
use crate::models::FourPl;

const ND50_RANGE: (f64, f64) = (30.0, 3000.0);
const SLOPE_RANGE: (f64, f64) = (-1.2, -0.6);

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub plates: usize,
    pub seed: u64,
    /// Count noise as a fraction of `voc_mean`.
    pub noise: f64,
    /// Mean foci count of the virus-only wells.
    pub voc_mean: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            plates: 2,
            seed: 42,
            noise: 0.03,
            voc_mean: 120.0,
        }
    }
}

/// Ground truth for one simulated sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedSample {
    pub sample_id: String,
    pub plate_id: String,
    pub nd50: f64,
    pub slope: f64,
}

#[derive(Debug, Clone)]
pub struct SimulatedAssay {
    pub plates: Vec<PlateCounts>,
    /// Sample sheet, one entry per sample (not duplicated).
    pub samples: Vec<String>,
    pub truth: Vec<SimulatedSample>,
}

pub fn simulate_assay(opts: &SimulationOptions) -> Result<SimulatedAssay, AppError> {
    if opts.plates == 0 {
        return Err(AppError::io("Plate count must be > 0."));
    }
    if !(opts.voc_mean.is_finite() && opts.voc_mean > 0.0) {
        return Err(AppError::io("VOC mean must be a positive count."));
    }
    let noise = Normal::new(0.0, opts.noise * opts.voc_mean)
        .map_err(|e| AppError::io(format!("Invalid noise level {}: {e}", opts.noise)))?;

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut plates = Vec::with_capacity(opts.plates);
    let mut samples = Vec::new();
    let mut truth = Vec::new();

    for p in 0..opts.plates {
        let plate_id = format!("plate{:02}", p + 1);

        let curves: Vec<FourPl> = (0..GROUPS_PER_PLATE)
            .map(|_| {
                let (lo, hi) = ND50_RANGE;
                let nd50 = (rng.gen_range(lo.ln()..hi.ln())).exp();
                let slope = rng.gen_range(SLOPE_RANGE.0..SLOPE_RANGE.1);
                FourPl {
                    upper_limit: 1.0,
                    slope,
                    lower_limit: 0.0,
                    inflection: nd50,
                }
            })
            .collect();

        for curve in &curves {
            let sample_id = format!("SIM-{:03}", samples.len() + 1);
            truth.push(SimulatedSample {
                sample_id: sample_id.clone(),
                plate_id: plate_id.clone(),
                nd50: curve.nd50(),
                slope: curve.slope,
            });
            samples.push(sample_id);
        }

        let counts = plate_positions()
            .map(|pos| {
                let expected = match (pos.role(), pos.sample_slot()) {
                    (WellRole::Voc, _) => opts.voc_mean,
                    (WellRole::Sample, Some(slot)) => {
                        let curve = &curves[slot.group as usize - 1];
                        opts.voc_mean * (1.0 - curve.predict(slot.dilution_fold()))
                    }
                    _ => 0.0,
                };
                (expected + noise.sample(&mut rng)).round().max(0.0)
            })
            .collect();

        plates.push(PlateCounts { plate_id, counts });
    }

    Ok(SimulatedAssay {
        plates,
        samples,
        truth,
    })
}

/// Files written by `write_simulation`.
#[derive(Debug, Clone)]
pub struct SimulationFiles {
    pub plates: Vec<PathBuf>,
    pub samples: PathBuf,
    pub truth: PathBuf,
}

/// Write plate grids, the sample sheet and the ground truth into `dir`.
pub fn write_simulation(dir: &Path, sim: &SimulatedAssay) -> Result<SimulationFiles, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", dir.display())))?;

    let mut plates = Vec::with_capacity(sim.plates.len());
    for plate in &sim.plates {
        let path = dir.join(format!("{}.csv", plate.plate_id));
        write_plate_csv(&path, &plate.counts)?;
        plates.push(path);
    }

    let samples = dir.join("samples.csv");
    write_sample_sheet(&samples, &sim.samples)?;

    let truth = dir.join("truth.csv");
    let mut writer = csv::Writer::from_path(&truth)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", truth.display())))?;
    for t in &sim.truth {
        writer
            .serialize(t)
            .map_err(|e| AppError::io(format!("Failed to write truth row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", truth.display())))?;

    Ok(SimulationFiles {
        plates,
        samples,
        truth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::{WELLS_PER_PLATE, WellPosition};

    #[test]
    fn same_seed_same_assay() {
        let opts = SimulationOptions::default();
        let a = simulate_assay(&opts).unwrap();
        let b = simulate_assay(&opts).unwrap();
        assert_eq!(a.plates, b.plates);
        assert_eq!(a.truth, b.truth);

        let c = simulate_assay(&SimulationOptions { seed: 7, ..opts }).unwrap();
        assert_ne!(a.plates, c.plates);
    }

    #[test]
    fn plates_are_full_and_counts_valid() {
        let sim = simulate_assay(&SimulationOptions {
            plates: 3,
            ..SimulationOptions::default()
        })
        .unwrap();
        assert_eq!(sim.plates.len(), 3);
        assert_eq!(sim.samples.len(), 12);
        assert_eq!(sim.truth.len(), 12);
        for plate in &sim.plates {
            assert_eq!(plate.counts.len(), WELLS_PER_PLATE);
            assert!(plate.counts.iter().all(|c| c.is_finite() && *c >= 0.0 && c.fract() == 0.0));
        }
        for t in &sim.truth {
            assert!((ND50_RANGE.0 - 1e-9..=ND50_RANGE.1 + 1e-9).contains(&t.nd50));
            assert!((SLOPE_RANGE.0..SLOPE_RANGE.1).contains(&t.slope));
        }
    }

    #[test]
    fn noiseless_wells_follow_the_true_curve() {
        let sim = simulate_assay(&SimulationOptions {
            plates: 1,
            noise: 0.0,
            ..SimulationOptions::default()
        })
        .unwrap();
        let counts = &sim.plates[0].counts;
        let voc = WellPosition::new('C', 10).unwrap().index() - 1;
        assert_eq!(counts[voc], 120.0);
        let corner = WellPosition::new('A', 1).unwrap().index() - 1;
        assert_eq!(counts[corner], 0.0);

        // Highest dilution of group 1 sees almost the full virus load.
        let t = &sim.truth[0];
        let g7 = WellPosition::new('G', 2).unwrap().index() - 1;
        let curve = FourPl {
            upper_limit: 1.0,
            slope: t.slope,
            lower_limit: 0.0,
            inflection: t.nd50,
        };
        assert_eq!(counts[g7], (120.0 * (1.0 - curve.predict(4860.0))).round());
    }

    #[test]
    fn written_files_load_back_as_assay_input() {
        let dir = tempfile::tempdir().unwrap();
        let sim = simulate_assay(&SimulationOptions::default()).unwrap();
        let files = write_simulation(dir.path(), &sim).unwrap();

        let input = crate::io::ingest::load_assay_input(&files.plates, &[files.samples]).unwrap();
        assert_eq!(input.plate_ids, vec!["plate01".to_string(), "plate02".to_string()]);
        let flat: Vec<f64> = sim.plates.iter().flat_map(|p| p.counts.clone()).collect();
        assert_eq!(input.counts, flat);
        assert_eq!(input.samples.len(), 2 * sim.samples.len());
        assert!(files.truth.exists());
    }

    #[test]
    fn zero_plates_is_rejected() {
        let err = simulate_assay(&SimulationOptions {
            plates: 0,
            ..SimulationOptions::default()
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_IO);
    }
}
