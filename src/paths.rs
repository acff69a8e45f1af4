use std::path::{Path, PathBuf};

// Tool folder created below the user home
pub const TOOL_DEVFOLDER: &str = ".dev";
pub const REGISTRY_LOCK_FILE: &str = "registry.lock.json";
pub const CONFIG_FILE: &str = "config.json";

/// Directory layout of an installed tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevPaths {
    pub root: PathBuf,
    pub tools: PathBuf,
    pub bin: PathBuf,
    pub lib: PathBuf,
    pub cmd: PathBuf,
    pub doc: PathBuf,
}

impl DevPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            tools: root.join("tools"),
            bin: root.join("bin"),
            lib: root.join("lib"),
            cmd: root.join("lib").join("cmd"),
            doc: root.join("doc"),
            root,
        }
    }

    #[must_use]
    pub fn registry_lock(&self) -> PathBuf {
        self.root.join(REGISTRY_LOCK_FILE)
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    // Every directory setup has to create, parents first
    #[must_use]
    pub fn directories(&self) -> [&Path; 6] {
        [
            &self.root,
            &self.tools,
            &self.bin,
            &self.lib,
            &self.cmd,
            &self.doc,
        ]
    }
}
