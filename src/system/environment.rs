use anyhow::{bail, Context, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::DevError;

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

// Profile files scanned on unix-like systems, in this order
const PROFILE_FILES: [&str; 4] = [".bash_profile", ".bashrc", ".profile", ".zshrc"];
const FALLBACK_PROFILE: &str = ".profile";

static VARIABLE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid")
});

/// Reads and writes environment variables at user scope.
pub trait UserEnvironment {
    /// # Errors
    ///
    /// Returns an error if the platform lookup fails.
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// # Errors
    ///
    /// Returns an error if the variable cannot be persisted.
    fn set(&self, name: &str, value: &str) -> Result<()>;

    /// Put `dir` in front of the user `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable cannot be persisted.
    fn prepend_path(&self, dir: &Path) -> Result<()>;
}

/// Produces a profile line and the prefix that identifies it.
pub trait LineResolver {
    fn prefix(&self, name: &str, value: &str) -> String;
    fn line(&self, name: &str, value: &str) -> String;
}

// export NAME="value"
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportLine;

impl LineResolver for ExportLine {
    fn prefix(&self, name: &str, _value: &str) -> String {
        format!("export {name}=")
    }

    fn line(&self, name: &str, value: &str) -> String {
        format!("export {name}=\"{}\"", shell_escape(value))
    }
}

// export PATH="<dir>:$PATH", keyed on the directory so other PATH lines survive
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPrependLine;

impl LineResolver for PathPrependLine {
    fn prefix(&self, name: &str, value: &str) -> String {
        format!("export {name}=\"{}:", shell_escape(value))
    }

    fn line(&self, name: &str, value: &str) -> String {
        format!("export {name}=\"{}:${name}\"", shell_escape(value))
    }
}

/// Escape `value` for use inside a double-quoted POSIX shell string.
#[must_use]
pub fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Single-quoted PowerShell literal, quotes doubled
#[must_use]
pub fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn check_variable_name(name: &str) -> Result<()> {
    if !VARIABLE_NAME_REGEX.is_match(name) {
        let message = format!("invalid environment variable name \"{name}\"");
        return Err(DevError::InvalidInput(message).into());
    }
    Ok(())
}

/// Insert or replace the line for `name` in the file at `path`.
///
/// Every existing line starting with the resolver's prefix is dropped and the
/// new line appended, so at most one such line remains. The file is created
/// when missing.
///
/// # Errors
///
/// Returns an error if `name` is not a valid variable name, or if the file
/// cannot be read or written.
pub fn upsert_line(path: &Path, name: &str, value: &str, resolver: &dyn LineResolver) -> Result<()> {
    check_variable_name(name)?;
    let path_str = path.to_string_lossy();
    let prefix = resolver.prefix(name, value);

    let mut lines: Vec<String> = if path.exists() {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read {path_str}"))?
            .lines()
            .filter(|line| !line.starts_with(&prefix))
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    lines.push(resolver.line(name, value));

    let mut content = lines.join(LINE_ENDING);
    content.push_str(LINE_ENDING);
    fs::write(path, content).with_context(|| format!("failed to write {path_str}"))?;

    debug!(path = %path_str, %name, "updated environment line");
    Ok(())
}

/// Environment stored in the shell profile files under a home directory.
#[derive(Debug, Clone)]
pub struct UnixEnvironment {
    home: PathBuf,
}

impl UnixEnvironment {
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    // Existing profile files, or the fallback profile when none exist yet
    #[must_use]
    pub fn profile_paths(&self) -> Vec<PathBuf> {
        let existing: Vec<PathBuf> = PROFILE_FILES
            .iter()
            .map(|file| self.home.join(file))
            .filter(|path| path.is_file())
            .collect();

        if existing.is_empty() {
            vec![self.home.join(FALLBACK_PROFILE)]
        } else {
            existing
        }
    }

    fn upsert_profiles(&self, name: &str, value: &str, resolver: &dyn LineResolver) -> Result<()> {
        for profile in self.profile_paths() {
            upsert_line(&profile, name, value, resolver)?;
        }
        Ok(())
    }
}

impl UserEnvironment for UnixEnvironment {
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(env::var(name).ok())
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.upsert_profiles(name, value, &ExportLine)
    }

    fn prepend_path(&self, dir: &Path) -> Result<()> {
        if let Some(path) = env::var_os("PATH") {
            if env::split_paths(&path).any(|entry| entry == dir) {
                debug!(dir = %dir.display(), "already in PATH");
                return Ok(());
            }
        }

        self.upsert_profiles("PATH", &dir.to_string_lossy(), &PathPrependLine)
    }
}

/// User-scope environment managed through PowerShell.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Environment;

impl Win32Environment {
    fn powershell(command: &str) -> Result<std::process::Output> {
        Command::new("powershell")
            .args(["-NoProfile", "-ExecutionPolicy", "unrestricted", "-Command"])
            .arg(command)
            .output()
            .context("failed to run powershell")
    }
}

impl UserEnvironment for Win32Environment {
    fn get(&self, name: &str) -> Result<Option<String>> {
        check_variable_name(name)?;
        let output = Self::powershell(&format!(
            "[environment]::GetEnvironmentVariable('{name}','User')"
        ))?;

        if !output.status.success() {
            return Ok(None);
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!value.is_empty()).then_some(value))
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        check_variable_name(name)?;
        let output = Self::powershell(&format!(
            "[environment]::SetEnvironmentVariable('{name}', {}, 'User')",
            powershell_quote(value)
        ))?;

        if !output.status.success() {
            bail!("it was not possible to assign the environment variable \"{name}\" to the user");
        }
        Ok(())
    }

    fn prepend_path(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_string_lossy();
        let current = self.get("PATH")?.unwrap_or_default();

        if current.split(';').any(|entry| entry == dir) {
            debug!(%dir, "already in PATH");
            return Ok(());
        }

        let value = if current.is_empty() {
            dir.into_owned()
        } else {
            format!("{dir};{current}")
        };
        self.set("PATH", &value)
    }
}

// Pick the implementation for the running platform
#[must_use]
pub fn platform_environment(home: &Path) -> Box<dyn UserEnvironment> {
    if cfg!(windows) {
        Box::new(Win32Environment)
    } else {
        Box::new(UnixEnvironment::new(home))
    }
}
