use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{DevError, Result};

pub const DEFAULT_REGISTRY_URL: &str = "https://raw.githubusercontent.com/e5r/devcom/master/dist/";
pub const DEFAULT_FETCH_TIMEOUT: u64 = 60;

// Keys accepted by `ToolConfig::get`/`set`
pub const CONFIG_KEYS: [&str; 2] = ["registry_url", "fetch_timeout"];

/// Persisted tool configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    /// Seconds allowed for a single download.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

impl ToolConfig {
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    // Join a registry-relative path onto the registry base URL
    #[must_use]
    pub fn registry_url_for(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.registry_url.trim_end_matches('/'),
            suffix.trim_start_matches('/')
        )
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "registry_url" => Some(self.registry_url.clone()),
            "fetch_timeout" => Some(self.fetch_timeout.to_string()),
            _ => None,
        }
    }

    /// Set a configuration key from its textual value.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::InvalidInput`] for an unknown key or a value of the
    /// wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "registry_url" => {
                if !value.contains("://") {
                    return Err(DevError::InvalidInput(format!(
                        "registry_url must be an absolute URL, got \"{value}\""
                    )));
                }
                self.registry_url = value.to_string();
            }
            "fetch_timeout" => {
                self.fetch_timeout = value.parse().map_err(|_| {
                    DevError::InvalidInput(format!(
                        "fetch_timeout must be a number of seconds, got \"{value}\""
                    ))
                })?;
            }
            _ => {
                return Err(DevError::InvalidInput(format!(
                    "unknown configuration key \"{key}\", expected one of: {}",
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

/// Handle to the configuration file, caching the parsed value until the next save.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    cache: Option<ToolConfig>,
}

impl ConfigStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Read the configuration, writing the defaults first when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, written or parsed.
    pub fn load(&mut self) -> Result<&ToolConfig> {
        let config = match self.cache.take() {
            Some(config) => config,
            None => self.read()?,
        };
        Ok(self.cache.insert(config))
    }

    fn read(&self) -> Result<ToolConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "writing default configuration");
            write_config(&self.path, &ToolConfig::default())?;
        }

        let content = fs::read_to_string(&self.path).map_err(|e| DevError::io(&self.path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist `config` and drop the cached copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&mut self, config: &ToolConfig) -> Result<()> {
        write_config(&self.path, config)?;
        self.invalidate_cache();
        Ok(())
    }

    pub fn invalidate_cache(&mut self) {
        self.cache = None;
    }
}

fn write_config(path: &Path, config: &ToolConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DevError::io(parent, e))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).map_err(|e| DevError::io(path, e))
}
