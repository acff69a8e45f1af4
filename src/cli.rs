use anyhow::{Context, Result};
use clap::Parser;
use e5r_dev::DevTool;
use std::ffi::OsString;
use std::path::PathBuf;

// CLI arguments parsing structure
#[derive(Parser)]
#[command(name = "dev", author, version, about, long_about = None)]
pub struct Cli {
    /// Tool directory (defaults to ~/.dev)
    #[arg(short = 'r', long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Print debug output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Devcom to run followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "DEVCOM")]
    pub devcom: Vec<OsString>,
}

// Run the requested devcom and return its exit status
pub fn execute_command(cli: &Cli) -> Result<i32> {
    let mut tool =
        DevTool::from_env(cli.root.as_deref()).context("failed to initialize dev tool")?;
    tool.dispatch(&cli.devcom)
}
