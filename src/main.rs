// file: src/main.rs
// version: 2.0.0
// guid: h8i9j0k1-l2m3-4567-8901-234567hijklm

//! pi-gen configurator - Main entry point

use clap::Parser;
use pi_gen_configurator::{
    cli::{args::Cli, commands::build_image_command},
    logging::{init_logger, BuildLog, BUILD_LOG_FILE},
    ConfiguratorError, Result,
};
use tokio::signal;
use tracing::{error, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Nothing can be logged until the build log is open
    let log = match setup_logging(&cli) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    // Prompting blocks the thread, so the signal handler is only installed
    // once the build yields for the first time
    let result = tokio::select! {
        biased;
        result = build_image_command(&cli, &log) => result,
        _ = signal::ctrl_c() => {
            warn!("Received Ctrl+C; build.log and the pi-gen checkout are left in place");
            Err(ConfiguratorError::Interrupted)
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn setup_logging(cli: &Cli) -> Result<BuildLog> {
    let log = BuildLog::open(BUILD_LOG_FILE)?;
    init_logger(cli.verbose, cli.quiet, &log)?;
    Ok(log)
}
