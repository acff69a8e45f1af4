use anyhow::{Context, Result};
use clap::Parser;
use std::process::exit;
use tracing::Level;

mod cli;

use cli::{execute_command, Cli};

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    // Execute the devcom and report its status
    let code = execute_command(&cli).with_context(|| "command execution failed")?;
    if code != 0 {
        exit(code);
    }

    Ok(())
}
