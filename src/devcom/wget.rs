use anyhow::{Context, Result};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use super::DevCom;
use crate::error::DevError;
use crate::options::ParsedOptions;
use crate::tool::DevTool;

static URL_SCHEME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://\S+$").expect("URL pattern is valid")
});

/// Downloads a web file.
#[derive(Default)]
pub struct Wget;

impl DevCom for Wget {
    fn name(&self) -> &'static str {
        "wget"
    }

    fn short_doc(&self) -> &'static str {
        "Download a web file"
    }

    fn usage(&self, tool_name: &str) -> String {
        format!("usage: {tool_name} {} [url] [path] [options]", self.name())
    }

    fn run(&self, tool: &mut DevTool, options: &ParsedOptions) -> Result<()> {
        let [url, target] = options.args() else {
            println!("{}", self.usage(tool.name));
            tool.exit_code = 1;
            return Ok(());
        };

        if !URL_SCHEME_REGEX.is_match(url) {
            return Err(DevError::InvalidInput(format!("invalid URL: {url}")).into());
        }

        let timeout = options
            .value("timeout")
            .map(|secs| {
                secs.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                    DevError::InvalidInput(format!("--timeout expects seconds, got \"{secs}\""))
                })
            })
            .transpose()?;

        let path = std::path::absolute(target)
            .with_context(|| format!("invalid path: {target}"))?;
        let quiet = options.flag("quiet");

        if !quiet {
            println!("downloading {url}...");
        }
        tool.fetch(url, &path, timeout)?;
        if !quiet {
            println!("saved to '{}'", path.display());
        }

        Ok(())
    }

    fn help(&self, tool: &mut DevTool) -> Result<()> {
        println!("DEVCOM {} {}", self.name(), self.short_doc());
        println!();
        println!("{}", self.usage(tool.name));
        println!();
        println!("  url           URL of the web file");
        println!("  path          Path to save web file local");
        println!();
        println!("Options:");
        println!("  -quiet        No print messages");
        println!("  --timeout [t] Set timeout in seconds");
        Ok(())
    }
}
