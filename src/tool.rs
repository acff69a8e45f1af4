use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, ToolConfig, DEFAULT_FETCH_TIMEOUT};
use crate::devcom::{CommandTable, DevCom};
use crate::error::DevError;
use crate::options;
use crate::paths::{DevPaths, REGISTRY_LOCK_FILE, TOOL_DEVFOLDER};
use crate::registry::RegistryLock;
use crate::system::{platform_environment, CurlFetcher, Fetch, UserEnvironment};
use crate::TOOL_NAME;
use crate::uri::{self, ResolvedResource};

/// Shared context handed to every devcom.
pub struct DevTool {
    pub name: &'static str,
    pub paths: DevPaths,
    /// Exit status reported once the devcom returns.
    pub exit_code: i32,
    config: ConfigStore,
    fetcher: Box<dyn Fetch>,
    environment: Box<dyn UserEnvironment>,
    commands: CommandTable,
}

impl DevTool {
    #[must_use]
    pub fn new(
        paths: DevPaths,
        fetcher: Box<dyn Fetch>,
        environment: Box<dyn UserEnvironment>,
    ) -> Self {
        Self {
            name: TOOL_NAME,
            config: ConfigStore::new(paths.config_file()),
            paths,
            exit_code: 0,
            fetcher,
            environment,
            commands: CommandTable::with_builtins(),
        }
    }

    /// Tool installed below `root`, or `~/.dev` when no root is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn from_env(root: Option<&Path>) -> Result<Self> {
        let home = dirs::home_dir().context("failed to determine the user home directory")?;
        let paths = match root {
            Some(root) => DevPaths::new(root),
            None => DevPaths::new(home.join(TOOL_DEVFOLDER)),
        };

        let fetcher = CurlFetcher::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT));
        Ok(Self::new(paths, Box::new(fetcher), platform_environment(&home)))
    }

    #[must_use]
    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    /// Current configuration, loaded on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or created.
    pub fn config(&mut self) -> Result<&ToolConfig> {
        self.config
            .load()
            .context("failed to load tool configuration")
    }

    /// Persist a new configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be written.
    pub fn save_config(&mut self, config: &ToolConfig) -> Result<()> {
        self.config
            .save(config)
            .context("failed to save tool configuration")
    }

    #[must_use]
    pub fn environment(&self) -> &dyn UserEnvironment {
        self.environment.as_ref()
    }

    #[must_use]
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Download `url` into `path`, defaulting to the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    pub fn fetch(&mut self, url: &str, path: &Path, timeout: Option<Duration>) -> Result<()> {
        let timeout = match timeout {
            Some(timeout) => timeout,
            None => self.config()?.fetch_timeout(),
        };
        self.fetcher.fetch(url, path, Some(timeout))
    }

    /// Resolve `uri` and make sure the resource is on disk, fetching it from
    /// the registry when it is missing locally.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::InvalidUri`] for a malformed URI and
    /// [`DevError::ResourceNotFound`] when the resource cannot be fetched.
    pub fn require(&mut self, uri: &str) -> Result<ResolvedResource> {
        let resource = uri::resolve(uri, &self.paths.root)?;
        if resource.exists() {
            return Ok(resource);
        }

        let url = self.config()?.registry_url_for(&resource.uri_suffix);
        debug!(%uri, %url, "resource missing locally, fetching");

        if let Err(e) = self.fetch(&url, &resource.absolute_path, None) {
            warn!(%uri, "fetch fallback failed: {e:#}");
        }

        if resource.exists() {
            Ok(resource)
        } else {
            Err(DevError::ResourceNotFound {
                uri: uri.to_string(),
                path: resource.absolute_path,
            }
            .into())
        }
    }

    /// Construct the devcom registered under `name`.
    ///
    /// Devcoms that are not built in must also be installed, so their
    /// `cmd://` resource is required first.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::InvalidUri`] for a malformed name and
    /// [`DevError::ResourceNotFound`] for an unknown or uninstallable devcom.
    pub fn load_command(&mut self, name: &str) -> Result<Box<dyn DevCom>> {
        let uri = format!("cmd://{name}");
        let resource = uri::resolve(&uri, &self.paths.root)?;

        let Some(command) = self.commands.create(&resource.name) else {
            return Err(DevError::ResourceNotFound {
                uri,
                path: resource.absolute_path,
            }
            .into());
        };

        if !command.builtin() {
            self.require(&uri)?;
        }

        Ok(command)
    }

    /// Registry lock, fetched from the registry when it is not present yet.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::RegistryMissing`] if the lock is absent and cannot
    /// be fetched.
    pub fn registry_lock(&mut self) -> Result<RegistryLock> {
        let lock_path = self.paths.registry_lock();
        match RegistryLock::load(&lock_path) {
            Err(DevError::RegistryMissing(path)) => {
                info!("registry lock missing, fetching");
                if let Err(e) = self.update_registry_lock() {
                    warn!("registry lock fetch failed: {e:#}");
                    return Err(DevError::RegistryMissing(path).into());
                }
                Ok(RegistryLock::load(&lock_path)?)
            }
            other => Ok(other?),
        }
    }

    /// Replace the local registry lock with the registry's copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    pub fn update_registry_lock(&mut self) -> Result<()> {
        let url = self.config()?.registry_url_for(REGISTRY_LOCK_FILE);
        let lock_path = self.paths.registry_lock();
        self.fetch(&url, &lock_path, None)
            .with_context(|| format!("failed to download registry lock from {url}"))
    }

    /// Run `argv[0]` as a devcom with the remaining tokens as its options and
    /// return the exit status it left behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the devcom cannot be resolved, its arguments do not
    /// parse, or it fails.
    pub fn dispatch(&mut self, argv: &[OsString]) -> Result<i32> {
        self.exit_code = 0;

        let Some((name, rest)) = argv.split_first() else {
            self.print_usage();
            return Ok(1);
        };

        let name = name.to_str().ok_or_else(|| {
            DevError::InvalidInput(format!(
                "devcom name {} is not a valid string",
                name.to_string_lossy()
            ))
        })?;

        let command = self.load_command(name)?;
        let options = options::parse_os(rest)?;
        debug!(devcom = name, options = ?options, "dispatching");

        if options.flag("help") {
            command.help(self)?;
        } else {
            command
                .run(self, &options)
                .with_context(|| format!("devcom {name} failed"))?;
        }

        Ok(self.exit_code)
    }

    pub fn print_usage(&self) {
        println!("usage: {} <devcom> [args] [options]", self.name);
        println!();

        let summaries = self.commands.summaries();
        if summaries.is_empty() {
            println!("no devcoms available");
            return;
        }

        // Find the longest devcom name for alignment
        let max_name_length = summaries
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);

        println!("\u{001b}[4mAvailable devcoms:\u{001b}[0m");
        for (name, short_doc) in summaries {
            println!("  {name:<max_name_length$}  {short_doc}");
        }
    }
}
