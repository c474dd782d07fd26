pub mod cli;
pub mod config;
pub mod downloader;
pub mod logging;

use std::process::ExitCode;

use crate::cli::CliCommand;

/// Binary entry: logging, runtime, then dispatch the parsed command.
pub fn run() -> ExitCode {
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("media-fetch error: failed to start runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(CliCommand::run_from_args()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("command failed: {:#}", err);
            eprintln!("media-fetch error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
