use regex::Regex;
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{DevError, Result};

static RESOURCE_URI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(cmd|lib|doc)://([A-Za-z0-9_-]+)$").expect("resource URI pattern is valid")
});

const MODULE_EXTENSION: &str = "js";
const DOC_EXTENSION: &str = "txt";

// Resource namespace taken from the URI scheme
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Cmd,
    Lib,
    Doc,
}

impl ResourceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cmd => "cmd",
            Self::Lib => "lib",
            Self::Doc => "doc",
        }
    }

    #[must_use]
    pub fn is_executable_module(self) -> bool {
        matches!(self, Self::Cmd | Self::Lib)
    }

    fn extension(self) -> &'static str {
        if self.is_executable_module() {
            MODULE_EXTENSION
        } else {
            DOC_EXTENSION
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "cmd" => Some(Self::Cmd),
            "lib" => Some(Self::Lib),
            "doc" => Some(Self::Doc),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `type://name` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    kind: ResourceType,
    name: String,
}

impl ResourceUri {
    /// Parse a resource URI.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::InvalidUri`] when the text does not match
    /// `(cmd|lib|doc)://name` with an alphanumeric, `-` or `_` name.
    pub fn parse(uri: &str) -> Result<Self> {
        let captures = RESOURCE_URI_REGEX
            .captures(uri)
            .ok_or_else(|| DevError::InvalidUri(uri.to_string()))?;

        let kind = ResourceType::from_scheme(&captures[1])
            .ok_or_else(|| DevError::InvalidUri(uri.to_string()))?;

        Ok(Self {
            kind,
            name: captures[2].to_string(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map this URI onto the directory layout below `root`.
    ///
    /// Commands live physically under `lib/cmd/` while still being addressed
    /// as `cmd://name`.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> ResolvedResource {
        let file_name = format!("{}.{}", self.name, self.kind.extension());

        let mut segments = vec![self.kind.as_str(), file_name.as_str()];
        if self.kind == ResourceType::Cmd {
            segments.insert(0, ResourceType::Lib.as_str());
        }

        let absolute_path = segments
            .iter()
            .fold(root.to_path_buf(), |path, segment| path.join(segment));
        let uri_suffix = segments.join("/");

        ResolvedResource {
            kind: self.kind,
            name: self.name.clone(),
            file_name,
            is_executable_module: self.kind.is_executable_module(),
            absolute_path,
            uri_suffix,
        }
    }
}

impl FromStr for ResourceUri {
    type Err = DevError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind, self.name)
    }
}

// Resource location derived from a URI and a root directory
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub name: String,
    pub file_name: String,
    pub is_executable_module: bool,
    pub absolute_path: PathBuf,
    pub uri_suffix: String,
}

impl ResolvedResource {
    #[must_use]
    pub fn exists(&self) -> bool {
        self.absolute_path.is_file()
    }
}

/// Resolve `uri` against `root`.
///
/// # Errors
///
/// Returns [`DevError::InvalidUri`] for a malformed URI.
pub fn resolve(uri: &str, root: &Path) -> Result<ResolvedResource> {
    Ok(ResourceUri::parse(uri)?.resolve(root))
}

/// Resolve a URI taken straight from the process arguments.
///
/// # Errors
///
/// Returns [`DevError::InvalidInput`] when `uri` is not valid UTF-8 and
/// [`DevError::InvalidUri`] for a malformed URI.
pub fn resolve_os(uri: &OsStr, root: &Path) -> Result<ResolvedResource> {
    let uri = uri.to_str().ok_or_else(|| {
        DevError::InvalidInput(format!("URI {} is not a valid string", uri.to_string_lossy()))
    })?;
    resolve(uri, root)
}
