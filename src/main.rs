//! codecept-config
//!
//! Prints resolved project, suite and environment configuration, and seeds
//! databases from dump scripts.

use anyhow::Result;
use clap::Parser;
use codecept_config::cli::{self, Cli};
use codecept_config::logging;
use std::io::Write;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log, cli.verbose)?;
    debug!(command = ?cli.command, "Running command");

    let output = cli::run(&cli)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
