use bbk_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    // Exit directly: blocking work still in flight after a fatal error is abandoned,
    // not drained by runtime shutdown.
    match CliCommand::run_from_args().await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Fatal error: {:#}", err);
            std::process::exit(1);
        }
    }
}
