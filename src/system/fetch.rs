use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

/// Downloads a URL to a local file.
pub trait Fetch {
    /// Fetch `url` into `path`, giving up after `timeout` when one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the download does not complete.
    fn fetch(&self, url: &str, path: &Path, timeout: Option<Duration>) -> Result<()>;
}

// Fetcher backed by the `curl` executable
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    pub timeout: Duration,
}

impl CurlFetcher {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Fetch for CurlFetcher {
    // Downloads land in a temporary file next to `path`; the target is only
    // replaced once curl succeeds
    fn fetch(&self, url: &str, path: &Path, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or(self.timeout);
        let path_str = path.to_string_lossy();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
        let partial = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;

        debug!(%url, path = %path_str, timeout = timeout.as_secs(), "downloading");

        let status = Command::new("curl")
            .args(["--fail", "--silent", "--show-error", "--location"])
            .arg("--max-time")
            .arg(timeout.as_secs().max(1).to_string())
            .arg("--output")
            .arg(partial.path())
            .arg(url)
            .status()
            .context("failed to run curl")?;

        if !status.success() {
            bail!("download of {url} failed with {status}");
        }

        // Set to 644 (rw-r--r--), temporary files start out private
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(partial.path(), fs::Permissions::from_mode(0o644))
                .with_context(|| format!("failed to set permissions for {path_str}"))?;
        }

        partial
            .persist(path)
            .with_context(|| format!("failed to write {path_str}"))?;
        Ok(())
    }
}
