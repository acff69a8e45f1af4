use anyhow::{Context, Result};

use super::DevCom;
use crate::error::DevError;
use crate::options::ParsedOptions;
use crate::tool::DevTool;

/// Shows and edits the tool configuration.
#[derive(Default)]
pub struct ConfigCommand;

impl DevCom for ConfigCommand {
    fn name(&self) -> &'static str {
        "config"
    }

    fn short_doc(&self) -> &'static str {
        "Show or change the tool configuration"
    }

    fn usage(&self, tool_name: &str) -> String {
        format!("usage: {tool_name} {} [key] [value]", self.name())
    }

    fn run(&self, tool: &mut DevTool, options: &ParsedOptions) -> Result<()> {
        match options.args() {
            [] => {
                let json = serde_json::to_string_pretty(tool.config()?)
                    .context("failed to serialize configuration to JSON")?;
                println!("{json}");
            }
            [key] => {
                let value = tool.config()?.get(key).ok_or_else(|| {
                    DevError::InvalidInput(format!("unknown configuration key \"{key}\""))
                })?;
                println!("{value}");
            }
            [key, value] => {
                let mut config = tool.config()?.clone();
                config.set(key, value)?;
                tool.save_config(&config)?;
                println!("{key} = {value}");
            }
            _ => {
                println!("{}", self.usage(tool.name));
                tool.exit_code = 1;
            }
        }
        Ok(())
    }
}
