use rover_core::logging;
use std::process::ExitCode;

mod cli;

use crate::cli::Cli;

fn main() -> ExitCode {
    // Initialize logging as early as possible; fall back to stderr if the
    // state directory is unusable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    match Cli::run_from_args() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("rover error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
