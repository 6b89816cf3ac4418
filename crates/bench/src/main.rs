//! `bulk-engine-bench` is a small command-line driver for `bulk-engine`.
//!
//! It picks a scheduler variant and a canned workload, runs the workload to
//! completion, and prints the variant's name, the workload's result, and the
//! wall-clock time taken. It exists to make the five variants' behavior easy
//! to poke at from a terminal; it is not a rigorous benchmarking tool.

mod error;
mod workload;

use std::{env, ffi::OsString, path::Path, process, time::Instant};

use argh::FromArgs;
use bulk_engine::{EngineConfig, EngineVariant};
use bulk_engine_errors::Result;
use error::Error;
use tracing_subscriber::EnvFilter;
use workload::Workload;

/// `bulk-engine-bench` runs a bulk-task scheduler variant against a canned
/// workload and reports how long it took.
#[derive(Debug, FromArgs)]
struct Cli {
    /// explain a particular error based on its code (of kind `E...`).
    #[argh(option)]
    explain: Option<String>,

    /// scheduler variant to run: serial, always-spawn, spin-pool, sleep-pool,
    /// or sleep-pool-dag. Defaults to sleep-pool.
    #[argh(option, short = 'e', default = "String::from(\"sleep-pool\")")]
    engine: String,

    /// workload to run: serial-sum, parallel-counter, linear-chain, or
    /// diamond. Defaults to parallel-counter.
    #[argh(option, short = 'w', default = "String::from(\"parallel-counter\")")]
    workload: String,

    /// number of worker threads for variants that use one. Defaults to
    /// `std::thread::available_parallelism`.
    #[argh(option, short = 'j')]
    workers: Option<usize>,
}

impl Cli {
    /// Creates a new `Self` based on [`std::env::args_os`].
    fn new() -> Result<Self, Error> {
        let arguments =
            env::args_os().map(OsString::into_string).collect::<Result<Vec<_>, _>>().map_err(
                |argument| Error::InvalidArgumentEncoding(argument.to_string_lossy().to_string()),
            )?;

        if arguments.is_empty() {
            return Err(Error::ProgramNameIsMissing);
        }

        let command = Path::new(&arguments[0])
            .file_name()
            .and_then(|file_name| file_name.to_str())
            .unwrap_or(&arguments[0]);

        let arguments =
            arguments.iter().skip(1).map(|argument| argument.as_str()).collect::<Vec<_>>();

        match Cli::from_args(&[command], &arguments) {
            Ok(cli) => Ok(cli),
            Err(early_exit) => match early_exit.status {
                Ok(()) => {
                    println!("{}", early_exit.output);

                    process::exit(0);
                }
                Err(()) => Err(Error::CommandLine(early_exit.output.trim().to_string())),
            },
        }
    }
}

fn parse_variant(name: &str) -> std::result::Result<EngineVariant, Error> {
    EngineVariant::all()
        .iter()
        .copied()
        .find(|variant| variant.as_str() == name)
        .ok_or_else(|| Error::UnknownVariant(name.to_string()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    Error::install_and_configure()?;

    let cli = Cli::new()?;

    if let Some(error_code) = cli.explain {
        println!("{}", Error::explain(&error_code)?);

        return Ok(());
    }

    let variant = parse_variant(&cli.engine)?;
    let workload = Workload::parse(&cli.workload).ok_or_else(|| Error::UnknownWorkload(cli.workload.clone()))?;

    let mut config = EngineConfig::new(variant);
    if let Some(workers) = cli.workers {
        config = config.workers(workers);
    }
    let engine = config.build();

    let start = Instant::now();
    let result = workload.run(&*engine);
    let elapsed = start.elapsed();

    println!("engine:   {}", engine.name());
    println!("workload: {}", cli.workload);
    println!("result:   {result}");
    println!("elapsed:  {elapsed:?}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use miette::Diagnostic;

    use super::*;

    #[test]
    fn unknown_engine_variant_is_a_diagnosable_error() {
        let error = parse_variant("not-a-real-variant").unwrap_err();

        assert_eq!(error.code().map(|code| code.to_string()), Some("E002".to_string()));
        assert!(error.help().is_some(), "E002 should carry a help string");
    }

    #[test]
    fn every_real_variant_spelling_parses() {
        for &variant in EngineVariant::all() {
            assert_eq!(parse_variant(variant.as_str()).unwrap(), variant);
        }
    }
}
