//! Bootstrapper and devcom runner for the E5R development environment.
//!
//! Resources are addressed as `cmd://name`, `lib://name` or `doc://name` and
//! mapped onto the tool directory (see [`uri`]); devcom arguments are turned
//! into [`ParsedOptions`] by [`options::parse`].

pub mod config;
pub mod devcom;
pub mod error;
pub mod options;
pub mod paths;
pub mod registry;
pub mod system;
pub mod tool;
pub mod uri;

pub use config::{ConfigStore, ToolConfig};
pub use devcom::{CommandTable, DevCom};
pub use error::DevError;
pub use options::{OptionValue, ParsedOptions};
pub use paths::DevPaths;
pub use registry::RegistryLock;
pub use tool::DevTool;
pub use uri::{ResolvedResource, ResourceType, ResourceUri};

// Name the tool is invoked as
pub const TOOL_NAME: &str = "dev";
