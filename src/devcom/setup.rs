use anyhow::{Context, Result};
use std::fs;
use tracing::debug;

use super::DevCom;
use crate::options::{self, ParsedOptions};
use crate::tool::DevTool;

/// Installs the tool layout in the user home.
#[derive(Default)]
pub struct Setup;

impl DevCom for Setup {
    fn name(&self) -> &'static str {
        "setup"
    }

    fn short_doc(&self) -> &'static str {
        "Setup a E5R Development Team Environment"
    }

    fn run(&self, tool: &mut DevTool, _options: &ParsedOptions) -> Result<()> {
        println!("Set-up E5R Tools for Development Team...");

        // 1> Directory structure
        for dir in tool.paths.directories() {
            debug!(path = %dir.display(), "mkdir");
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }

        // 2> Registry lock
        tool.update_registry_lock()?;

        // 3> Add bin to PATH
        let bin = tool.paths.bin.clone();
        debug!(path = %bin.display(), "adding to PATH");
        tool.environment()
            .prepend_path(&bin)
            .with_context(|| format!("failed to add {} to PATH", bin.display()))?;

        // 4> Binaries, through the registry devcom
        debug!("loading devcom registry");
        let registry = tool.load_command("registry")?;
        let options = options::parse(&["get-binaries"])?;
        registry
            .run(tool, &options)
            .context("failed to install binaries")?;

        println!("Set-up completed!");
        Ok(())
    }
}
