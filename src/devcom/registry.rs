use anyhow::{Context, Result};
#[cfg(unix)]
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::DevCom;
use crate::options::ParsedOptions;
use crate::registry::{self, RegistryLock};
use crate::tool::DevTool;

// Directory under the build source holding the devcoms
const DEFAULT_PREFIX: &str = "devcom";

/// Manages the registry lock and the binaries it lists.
#[derive(Default)]
pub struct Registry;

impl Registry {
    fn list(tool: &mut DevTool) -> Result<()> {
        let lock = tool.registry_lock()?;

        let commands = lock.commands();
        let binaries = lock.binaries();
        if commands.is_empty() && binaries.is_empty() {
            println!("registry is empty");
            return Ok(());
        }

        if !commands.is_empty() {
            println!("\u{001b}[4mDevcoms:\u{001b}[0m");
            for name in commands {
                let marker = if tool.commands().contains(name) { "[✓]" } else { "[ ]" };
                println!("  {marker} {name}");
            }
        }

        if !binaries.is_empty() {
            println!("\u{001b}[4mBinaries:\u{001b}[0m");
            for entry in binaries {
                println!("  {entry}");
            }
        }

        Ok(())
    }

    fn update(tool: &mut DevTool) -> Result<()> {
        tool.update_registry_lock()?;
        let lock = tool.registry_lock()?;
        println!("registry lock updated ({} entries)", lock.entries.len());
        Ok(())
    }

    fn build(tool: &mut DevTool, source: &str, options: &ParsedOptions) -> Result<()> {
        let prefix = options.value("prefix").unwrap_or(DEFAULT_PREFIX);
        let output = options
            .value("output")
            .map_or_else(|| tool.paths.registry_lock(), PathBuf::from);

        let found = registry::discover(source, prefix)
            .with_context(|| format!("failed to discover devcoms in {source}/{prefix}"))?;
        let lock = RegistryLock::build(&found, &format!("{prefix}/"));
        lock.save(&output)
            .with_context(|| format!("failed to write registry lock to {}", output.display()))?;

        println!("{} written ({} entries)", output.display(), lock.entries.len());
        Ok(())
    }

    fn get_binaries(tool: &mut DevTool) -> Result<()> {
        let lock = tool.registry_lock()?;

        for entry in lock.binaries() {
            let Some(file_name) = Path::new(entry).file_name() else {
                continue;
            };
            let target = tool.paths.bin.join(file_name);
            let url = tool.config()?.registry_url_for(entry);

            debug!(%url, path = %target.display(), "installing binary");
            tool.fetch(&url, &target, None)
                .with_context(|| format!("failed to install binary {entry}"))?;
            make_executable(&target)?;
            println!("installed '{}'", target.display());
        }

        Ok(())
    }
}

// Set to 755 (rwxr-xr-x)
#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("failed to set permissions for {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

impl DevCom for Registry {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn short_doc(&self) -> &'static str {
        "Manage the devcom registry"
    }

    fn builtin(&self) -> bool {
        false
    }

    fn usage(&self, tool_name: &str) -> String {
        format!(
            "usage: {tool_name} {} [list|update|get-binaries|build <source>] [options]",
            self.name()
        )
    }

    fn run(&self, tool: &mut DevTool, options: &ParsedOptions) -> Result<()> {
        match options.arg(0).unwrap_or("list") {
            "list" => Self::list(tool),
            "update" => Self::update(tool),
            "get-binaries" => Self::get_binaries(tool),
            "build" => match options.arg(1) {
                Some(source) => Self::build(tool, source, options),
                None => {
                    println!("{}", self.usage(tool.name));
                    tool.exit_code = 1;
                    Ok(())
                }
            },
            action => {
                eprintln!("error: unknown registry action '{action}'");
                println!("{}", self.usage(tool.name));
                tool.exit_code = 1;
                Ok(())
            }
        }
    }
}
