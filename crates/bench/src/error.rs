#[cfg(feature = "fancy-errors")]
use miette::{set_hook, MietteHandlerOpts};
use miette::{Diagnostic, InstallError, Result};
use thiserror::Error;
use bulk_engine_errors::Error as EngineError;

#[derive(Error, Diagnostic, Debug)]
pub(crate) enum Error {
    #[error("The argument `{0}` contains invalid Unicode data.")]
    InvalidArgumentEncoding(String),

    #[error("The program name is missing from the command-line.")]
    ProgramNameIsMissing,

    #[error("I was not able to read the command-line properly:\n{0}")]
    #[diagnostic(code(E001), help("See the command-line usage with `bulk-engine-bench --help`."))]
    CommandLine(String),

    #[error("`{0}` is not a known engine variant.")]
    #[diagnostic(
        code(E002),
        help("Expected one of: serial, always-spawn, spin-pool, sleep-pool, sleep-pool-dag.")
    )]
    UnknownVariant(String),

    #[error("`{0}` is not a known workload.")]
    #[diagnostic(
        code(E003),
        help("Expected one of: serial-sum, parallel-counter, linear-chain, diamond.")
    )]
    UnknownWorkload(String),
}

impl Error {
    pub(crate) fn install_and_configure() -> Result<(), InstallError> {
        #[cfg(feature = "fancy-errors")]
        set_hook(Box::new(|_| {
            Box::new(
                MietteHandlerOpts::new()
                    .with_cause_chain()
                    .footer(
                        "For more information about an error, try \
                        `bulk-engine-bench --explain <error>` where `<error>` \
                        has the `E[0-9]{{3}} pattern."
                            .to_string(),
                    )
                    .width(85)
                    .terminal_links(false)
                    .build(),
            )
        }))?;

        Ok(())
    }

    pub(crate) fn explain(error_code: &str) -> Result<&'static str, EngineError> {
        EngineError::explain(error_code)
    }
}
