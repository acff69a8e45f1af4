use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{DevError, Result};

// Extensions picked up when discovering devcom sources
const DISCOVERED_EXTENSIONS: [&str; 4] = ["js", "cmd", "ps1", "sh"];
const BINARY_EXTENSIONS: [&str; 3] = ["cmd", "ps1", "sh"];
const MODULE_EXTENSION: &str = ".js";

/// Ordered manifest of resource paths available from the registry.
///
/// Every rebuild replaces the whole file; entries are never patched in place.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct RegistryLock {
    pub entries: Vec<String>,
}

impl RegistryLock {
    #[must_use]
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    // Strip `prefix` from every discovered path, keeping order
    #[must_use]
    pub fn build<S: AsRef<str>>(paths: &[S], prefix: &str) -> Self {
        let entries = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                path.strip_prefix(prefix).unwrap_or(path).to_string()
            })
            .collect();
        Self { entries }
    }

    /// Load the lock file.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::RegistryMissing`] if the file does not exist, or an
    /// I/O or JSON error if it cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DevError::RegistryMissing(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| DevError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the lock file, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DevError::io(parent, e))?;
        }

        fs::write(path, self.to_json()?).map_err(|e| DevError::io(path, e))?;

        // Fix permissions - set to 644 (rw-r--r--)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o644))
                .map_err(|e| DevError::io(path, e))?;
        }

        Ok(())
    }

    /// Serialize as a JSON array indented with four spaces.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    // Names of top-level command modules, e.g. "wget.js" -> "wget"
    #[must_use]
    pub fn commands(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| !entry.contains('/'))
            .filter_map(|entry| entry.strip_suffix(MODULE_EXTENSION))
            .collect()
    }

    // Shell launchers meant for the `bin` directory
    #[must_use]
    pub fn binaries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| has_extension(entry, &BINARY_EXTENSIONS))
            .map(String::as_str)
            .collect()
    }
}

fn has_extension(entry: &str, extensions: &[&str]) -> bool {
    Path::new(entry)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

/// Collect devcom sources found under `base/dir`.
///
/// Returned paths are relative to `base` (so they start with `dir/`), use `/`
/// separators and come back sorted so a rebuild is stable. Symbolic links are
/// not followed.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn discover<P: AsRef<Path>>(base: P, dir: &str) -> Result<Vec<String>> {
    let source_dir = base.as_ref().join(dir);
    let walker = WalkDir::new(&source_dir)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source_dir.as_path()).to_path_buf();
            DevError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(&source_dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if has_extension(&relative, &DISCOVERED_EXTENSIONS) {
            found.push(format!("{dir}/{relative}"));
        }
    }

    found.sort();
    Ok(found)
}
