//! Command-line driver of the 1e1γ selection
//!
//! ```text
//! e1gam_select run <input> <output> [config]
//! e1gam_select scan <input> <parameter> <start> <stop> <step> [config]
//! ```
//!
//! Datasets are JSON lines, one event record per line. Without a configuration
//! file, the reference selection is used. Log verbosity is controlled by the
//! `RUST_LOG` environment variable.

use clap::{Parser, Subcommand};
use e1gam_select::{
    config::Configuration,
    io::{EventSource, JsonLinesSink, JsonLinesSource},
    numeric::Float,
    output,
    pipeline::PipelineRunner,
    scan::{self, ScanParameter},
    Result,
};

use eyre::WrapErr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

/// Location of the summary report
const SUMMARY_PATH: &str = "selection.summary";

/// Location of the scan table
const SCAN_PATH: &str = "selection.scan";

/// 1e1γ event selection
#[derive(Parser, Debug)]
#[command(name = "e1gam_select")]
#[command(about = "Select one-electron one-gamma events from reconstructed data")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select the events of a dataset and write down the survivors
    Run {
        /// Input dataset (JSON lines)
        input: PathBuf,

        /// Output dataset for surviving events (JSON lines)
        output: PathBuf,

        /// Configuration file (reference selection if absent)
        config: Option<PathBuf>,
    },

    /// Measure the selection efficiency over a range of values of one threshold
    Scan {
        /// Input dataset (JSON lines)
        input: PathBuf,

        /// Threshold to vary (module_limit, x_foil_buffer, x_calo_buffer,
        /// y_buffer, t_threshold, min_e, max_e_tot)
        parameter: ScanParameter,

        /// First threshold value
        #[arg(allow_negative_numbers = true)]
        start: Float,

        /// Last threshold value (included)
        #[arg(allow_negative_numbers = true)]
        stop: Float,

        /// Increment between threshold values
        step: Float,

        /// Configuration file (reference selection if absent)
        config: Option<PathBuf>,
    },
}

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Command::Run {
            input,
            output,
            config,
        } => run_selection(&input, &output, config.as_deref()),
        Command::Scan {
            input,
            parameter,
            start,
            stop,
            step,
            config,
        } => run_scan(&input, parameter, (start, stop, step), config.as_deref()),
    }
}

/// Select the events of a dataset and write down the survivors
fn run_selection(input: &Path, output_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let cfg = load_configuration(config_path)?;

    // Open the dataset first, so that a missing input leaves no output behind
    let mut source = JsonLinesSource::open(input)?;
    let mut sink = JsonLinesSink::create(output_path)?;

    // Configuration I/O is kept out of the timing
    let saved_time = Instant::now();
    let chain = cfg.chain();
    let summary = PipelineRunner::new(&chain)
        .run(&mut source, &mut sink)
        .wrap_err_with(|| format!("Failed to select the events of {}", input.display()))?;
    let elapsed_time = saved_time.elapsed();

    // Send the results to the log and to disk and we're done
    summary.log();
    output::dump_summary(SUMMARY_PATH, &cfg, &summary, elapsed_time)
        .wrap_err("Failed to output the summary")?;
    info!(
        "Survivors written to {}, summary to {}",
        output_path.display(),
        SUMMARY_PATH
    );
    Ok(())
}

/// Measure the selection efficiency over a range of values of one threshold
fn run_scan(
    input: &Path,
    parameter: ScanParameter,
    (start, stop, step): (Float, Float, Float),
    config_path: Option<&Path>,
) -> Result<()> {
    let cfg = load_configuration(config_path)?;
    let values = scan::threshold_grid(start, stop, step)?;

    // Scans run the dataset many times, so it is kept in memory
    let mut source = JsonLinesSource::open(input)?;
    let mut events = Vec::new();
    while let Some(record) = source
        .next_event()
        .wrap_err_with(|| format!("Failed to read {}", input.display()))?
    {
        events.push(record);
    }
    info!(
        "Scanning {} over {} values with {} events ({} unreadable)",
        parameter,
        values.len(),
        events.len(),
        source.unreadable()
    );

    let points = scan::scan(&events, &cfg, parameter, &values);
    output::dump_scan(SCAN_PATH, parameter, &points).wrap_err("Failed to output the scan")?;
    info!("Scan results written to {}", SCAN_PATH);
    Ok(())
}

/// Load the selection configuration, or fall back to the reference one
fn load_configuration(config_path: Option<&Path>) -> Result<Configuration> {
    match config_path {
        Some(path) => Configuration::load(path).wrap_err("Failed to load the configuration"),
        None => {
            info!("No configuration file provided, using the reference selection");
            let cfg = Configuration::default();
            cfg.print();
            Ok(cfg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn scan_arguments_are_typed() {
        let args = Args::try_parse_from([
            "e1gam_select",
            "scan",
            "data.jsonl",
            "x_foil_buffer",
            "-20",
            "80",
            "5",
        ])
        .unwrap();
        match args.command {
            Command::Scan {
                parameter,
                start,
                stop,
                step,
                config,
                ..
            } => {
                assert_eq!(parameter, ScanParameter::XFoilBuffer);
                assert_eq!((start, stop, step), (-20., 80., 5.));
                assert!(config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bad_arguments_are_refused() {
        assert!(Args::try_parse_from(["e1gam_select", "run", "in.jsonl"]).is_err());
        assert!(
            Args::try_parse_from(["e1gam_select", "scan", "in", "y_max", "0", "1", "0.1"]).is_err()
        );
        assert!(Args::try_parse_from(["e1gam_select", "scan", "in", "min_e", "0", "1", "tiny"])
            .is_err());
    }
}
