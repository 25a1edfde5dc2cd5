//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - builds the `AssayConfig`
//! - runs the pipeline and prints the summary table

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DecodeArgs, FitArgs, SimulateArgs};
use crate::data::{SimulationOptions, simulate_assay, write_simulation};
use crate::domain::{AssayConfig, ReferencePolicy};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `frnt` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Decode(args) => handle_decode(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// Install the fmt subscriber on stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = assay_config_from_args(&args);
    let run = match &args.wells {
        Some(wells) => pipeline::run_assay_from_wells(wells, &config)?,
        None => pipeline::run_assay(&args.source.plates, &args.source.samples, &config)?,
    };

    println!("{}", crate::report::format_run_summary(&run.rows, &run.summary));
    Ok(())
}

fn handle_decode(args: DecodeArgs) -> Result<(), AppError> {
    let plates = pipeline::decode_inputs(&args.source.plates, &args.source.samples)?;
    crate::io::wells::write_well_table(&args.out, &plates)?;
    info!("Wrote {} wells to {}", plates.len() * crate::layout::geometry::WELLS_PER_PLATE, args.out.display());
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let opts = SimulationOptions {
        plates: args.plates,
        seed: args.seed,
        noise: args.noise,
        ..SimulationOptions::default()
    };
    let sim = simulate_assay(&opts)?;
    let files = write_simulation(&args.out, &sim)?;
    info!(
        "Wrote {} plates, {} and {}",
        files.plates.len(),
        files.samples.display(),
        files.truth.display()
    );
    Ok(())
}

pub fn assay_config_from_args(args: &FitArgs) -> AssayConfig {
    AssayConfig {
        out_dir: args.out.clone(),
        reference_policy: if args.skip_degenerate_plates {
            ReferencePolicy::SkipPlate
        } else {
            ReferencePolicy::Abort
        },
        render_plots: !args.no_plots,
        threads: args.threads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reflects_flags() {
        let cli = Cli::parse_from([
            "frnt", "fit", "--wells", "w.csv", "--out", "o", "--no-plots", "--threads", "3",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = assay_config_from_args(&args);
        assert_eq!(config.reference_policy, ReferencePolicy::Abort);
        assert!(!config.render_plots);
        assert_eq!(config.threads, Some(3));
        assert_eq!(config.out_dir, std::path::PathBuf::from("o"));
    }
}
