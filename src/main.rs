//! Repair-synth binary crate: the driver that loads a JSON engine
//! configuration, runs the search, and reports solutions.

use std::io::{self, Write};

use clap::Parser;
use fs_err as fs;

use repair_synth::options::{CliOptions, EngineConfig, TraceLevel};
use repair_synth::synthesize;

fn main() {
    if let Err(error) = repair_synth_main() {
        let _ = write!(io::stderr(), "Error: {}", error);
        std::process::exit(1);
    }
}

/// Initializes the logging framework at the given trace level.
///
/// # Errors
///
/// Returns an error if the logging framework has already been initialized.
fn initialize_logging(level: TraceLevel) -> io::Result<()> {
    env_logger::builder()
        .filter(None, level.into())
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

/// Parses the CLI options, loads the engine configuration, runs the
/// search, and writes the realized solutions.
///
/// # Errors
///
/// Returns an error if an I/O error occurred, if the configuration file
/// could not be read or parsed, or if the engine itself failed to
/// construct (malformed input, invalid configuration, or a failed
/// external tool invocation).
fn repair_synth_main() -> io::Result<()> {
    let options = CliOptions::parse();
    initialize_logging(options.trace_level)?;

    let config_text = fs::read_to_string(&options.config)?;
    let config: EngineConfig = serde_json::from_str(&config_text)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let config = config
        .try_new()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let solutions = synthesize(&config, options.budget)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let mut out: Box<dyn Write> = match &options.output {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(io::stdout()),
    };

    if solutions.is_empty() {
        log::warn!("no solutions found for the given configuration");
    }
    for solution in &solutions {
        writeln!(
            out,
            "C={:?} O={:?} satisfied={:?} util_pref={} cost={}",
            solution.controllable,
            solution.observable,
            solution.satisfied,
            solution.score.util_pref,
            solution.score.cost
        )?;
    }
    Ok(())
}
