//! End-to-end runs through files on disk.

use std::path::{Path, PathBuf};

use frnt_curves::app::pipeline::{decode_inputs, run_assay, run_assay_from_wells};
use frnt_curves::data::{SimulationOptions, simulate_assay, write_simulation};
use frnt_curves::domain::{AssayConfig, ReferencePolicy, ReportRow};
use frnt_curves::error::{EXIT_LAYOUT, EXIT_REFERENCE};
use frnt_curves::io::ingest::{write_plate_csv, write_sample_sheet};
use frnt_curves::io::wells::write_well_table;
use frnt_curves::layout::WellRole;
use frnt_curves::layout::geometry::plate_positions;

fn config(out: &Path, policy: ReferencePolicy, plots: bool) -> AssayConfig {
    AssayConfig {
        out_dir: out.to_path_buf(),
        reference_policy: policy,
        render_plots: plots,
        threads: Some(2),
    }
}

/// A plate with constant VOC and sample counts.
fn flat_plate(voc: f64, sample: f64) -> Vec<f64> {
    plate_positions()
        .map(|pos| match pos.role() {
            WellRole::Voc => voc,
            WellRole::Sample => sample,
            WellRole::Negative => 0.0,
        })
        .collect()
}

fn write_inputs(dir: &Path, plates: &[(&str, Vec<f64>)], samples: &[&str]) -> (Vec<PathBuf>, PathBuf) {
    let mut paths = Vec::new();
    for (id, counts) in plates {
        let path = dir.join(format!("{id}.csv"));
        write_plate_csv(&path, counts).unwrap();
        paths.push(path);
    }
    let sheet = dir.join("samples.csv");
    let ids: Vec<String> = samples.iter().map(|s| s.to_string()).collect();
    write_sample_sheet(&sheet, &ids).unwrap();
    (paths, sheet)
}

fn read_report(path: &Path) -> Vec<ReportRow> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(Result::unwrap).collect()
}

#[test]
fn two_plate_flat_response_does_not_crash() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (plates, sheet) = write_inputs(
        input.path(),
        &[("P1", flat_plate(100.0, 50.0)), ("P2", flat_plate(100.0, 50.0))],
        &["a", "b", "c", "d"],
    );

    let run = run_assay(&plates, &[sheet], &config(out.path(), ReferencePolicy::Abort, false)).unwrap();

    assert_eq!(run.summary.plates, 2);
    assert_eq!(run.summary.processed, 8);
    assert_eq!(run.summary.fitted + run.summary.failed, 8);
    let rows = read_report(&run.report_csv);
    assert_eq!(rows, run.rows);
    for row in &rows {
        match row.r_squared {
            Some(r2) => assert!(r2 <= 1e-9, "flat data cannot be explained: r2 = {r2}"),
            None => assert_ne!(row.status, "ok"),
        }
    }
    let text = std::fs::read_to_string(&run.report_csv).unwrap();
    assert!(!text.contains("NaN") && !text.contains("inf"));
    assert!(run.manifest.exists());
}

#[test]
fn zero_voc_average_aborts_with_reference_error() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (plates, sheet) = write_inputs(input.path(), &[("P1", flat_plate(0.0, 50.0))], &["a"]);

    let err = run_assay(&plates, &[sheet], &config(out.path(), ReferencePolicy::Abort, true)).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_REFERENCE);
    assert!(err.to_string().contains("P1"));
    assert!(!out.path().join("report.csv").exists());
}

#[test]
fn zero_voc_plate_can_be_skipped() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (plates, sheet) = write_inputs(
        input.path(),
        &[("bad", flat_plate(0.0, 50.0)), ("good", flat_plate(100.0, 50.0))],
        &["a", "b", "c", "d"],
    );

    let run = run_assay(&plates, &[sheet], &config(out.path(), ReferencePolicy::SkipPlate, false)).unwrap();
    let rows = read_report(&run.report_csv);
    assert_eq!(rows.len(), 8);
    assert!(rows[..4].iter().all(|r| r.plate_id == "bad" && r.nd50.is_none()));
    let text = std::fs::read_to_string(&run.report_csv).unwrap();
    assert!(!text.contains("NaN") && !text.contains("inf"));
}

#[test]
fn short_plate_file_is_a_layout_error() {
    let input = tempfile::tempdir().unwrap();
    let path = input.path().join("P1.csv");
    std::fs::write(&path, "1,2,3\n4,5,6\n").unwrap();
    let sheet = input.path().join("samples.csv");
    std::fs::write(&sheet, "a\n").unwrap();

    let err = decode_inputs(&[path], &[sheet]).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_LAYOUT);
}

#[test]
fn simulated_run_recovers_known_nd50s() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let sim = simulate_assay(&SimulationOptions {
        plates: 2,
        seed: 11,
        noise: 0.0,
        voc_mean: 1000.0,
    })
    .unwrap();
    let files = write_simulation(input.path(), &sim).unwrap();

    let run = run_assay(
        &files.plates,
        &[files.samples],
        &config(out.path(), ReferencePolicy::Abort, true),
    )
    .unwrap();

    assert_eq!(run.rows.len(), sim.truth.len());
    for (row, truth) in run.rows.iter().zip(&sim.truth) {
        assert_eq!(row.sample_id, truth.sample_id);
        assert_eq!(row.plate_id, truth.plate_id);
        assert_eq!(row.status, "ok", "{}: true nd50 {}", truth.sample_id, truth.nd50);
        let nd50 = row.nd50.unwrap();
        assert!(
            (nd50 / truth.nd50 - 1.0).abs() < 0.15,
            "{}: fitted {nd50}, true {}",
            truth.sample_id,
            truth.nd50
        );
        let plot = out.path().join(row.plots.as_deref().unwrap());
        assert!(plot.exists());
    }
    assert_eq!(run.summary.fitted, sim.truth.len());
    assert_eq!(run.summary.failed, 0);
}

#[test]
fn decoded_well_table_fits_like_the_plate_files() {
    let input = tempfile::tempdir().unwrap();
    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();
    let sim = simulate_assay(&SimulationOptions::default()).unwrap();
    let files = write_simulation(input.path(), &sim).unwrap();

    let sheets = [files.samples.clone()];
    let direct = run_assay(&files.plates, &sheets, &config(out_a.path(), ReferencePolicy::Abort, false)).unwrap();

    let plates = decode_inputs(&files.plates, &sheets).unwrap();
    let wells = input.path().join("wells.csv");
    write_well_table(&wells, &plates).unwrap();
    let via_table = run_assay_from_wells(&wells, &config(out_b.path(), ReferencePolicy::Abort, false)).unwrap();

    assert_eq!(direct.rows, via_table.rows);
    assert_eq!(direct.summary, via_table.summary);
}
