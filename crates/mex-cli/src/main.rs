use mex_core::logging;

mod cli;

use crate::cli::MexCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible.
    logging::init_logging();

    // Parse CLI and dispatch.
    if let Err(err) = MexCommand::run_from_args().await {
        eprintln!("mex error: {:#}", err);
        std::process::exit(1);
    }
}
