//! Command-line parsing for the FRNT curve fitter.
//!
//! Argument parsing and command dispatch stay separate from the assay code; the
//! handlers in `app` turn these structs into an `AssayConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "frnt",
    version,
    about = "Foci reduction neutralization test: plate decoding and 4PL dose-response fitting"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode plates, fit every sample and write the report.
    Fit(FitArgs),
    /// Decode plates into a tidy well table without fitting.
    Decode(DecodeArgs),
    /// Write synthetic plates and a sample sheet with known ND50s.
    Simulate(SimulateArgs),
}

/// Where the raw plate data comes from.
#[derive(Debug, Args, Clone)]
pub struct PlateSource {
    /// Plate count grids, one CSV per plate, in run order.
    #[arg(long, num_args = 1.., value_name = "CSV")]
    pub plates: Vec<PathBuf>,

    /// Sample sheets, read in order and concatenated.
    #[arg(long, num_args = 1.., value_name = "CSV")]
    pub samples: Vec<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub source: PlateSource,

    /// Fit a previously decoded well table instead of plate grids.
    #[arg(long, value_name = "CSV", conflicts_with_all = ["plates", "samples"])]
    pub wells: Option<PathBuf>,

    /// Output directory for report.csv, report.json and plots.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Report plates with an unusable VOC reference as failed rows instead of aborting.
    #[arg(long)]
    pub skip_degenerate_plates: bool,

    /// Do not render plots.
    #[arg(long)]
    pub no_plots: bool,

    /// Worker threads for fitting (default: one per core).
    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(Debug, Parser, Clone)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub source: PlateSource,

    /// Well table to write.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Directory for plate CSVs, samples.csv and truth.csv.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Number of plates.
    #[arg(long, default_value_t = 2)]
    pub plates: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Count noise as a fraction of the VOC mean.
    #[arg(long, default_value_t = 0.03)]
    pub noise: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_accepts_multiple_plates() {
        let cli = Cli::parse_from([
            "frnt", "fit", "--plates", "a.csv", "b.csv", "--samples", "s.csv", "--out", "out",
            "--skip-degenerate-plates", "-v",
        ]);
        assert!(cli.verbose);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.source.plates.len(), 2);
        assert!(args.skip_degenerate_plates);
        assert!(!args.no_plots);
        assert_eq!(args.threads, None);
    }

    #[test]
    fn wells_conflicts_with_plate_grids() {
        let res = Cli::try_parse_from([
            "frnt", "fit", "--wells", "w.csv", "--plates", "a.csv", "--out", "out",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::parse_from(["frnt", "simulate", "--out", "demo"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.plates, 2);
        assert_eq!(args.seed, 42);
    }
}
