//! gdscan CLI entry point.

use clap::Parser;
use gdscan::cli::{self, Cli, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `gdscan=debug`.
const LOG_ENV: &str = "GDSCAN_LOG";

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli::dispatch(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
