//! Error kinds raised by the resolution and parsing core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the current devcom invocation.
#[derive(Debug, Error)]
pub enum DevError {
    /// An input had the wrong shape, e.g. a URI or token that is not valid UTF-8.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A resource URI did not match `(cmd|lib|doc)://name`.
    #[error("invalid URI: \"{0}\"")]
    InvalidUri(String),

    /// The literal `args` was used as a token or option key.
    #[error("reserved word found, do not use \"{0}\" in the argument list")]
    ReservedWord(String),

    /// The registry lock file has not been fetched or built yet.
    #[error("registry lock not found at {}", .0.display())]
    RegistryMissing(PathBuf),

    /// A resolved resource is absent locally and could not be fetched.
    #[error("resource not found: {uri}")]
    ResourceNotFound {
        /// The URI that was requested.
        uri: String,
        /// Where the resource was expected on disk.
        path: PathBuf,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DevError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, DevError>;
