//! Capabilities that shell out to the host: downloads and user environment variables.

pub mod environment;
pub mod fetch;

pub use environment::{
    platform_environment, powershell_quote, shell_escape, upsert_line, ExportLine, LineResolver,
    PathPrependLine, UnixEnvironment, UserEnvironment, Win32Environment,
};
pub use fetch::{CurlFetcher, Fetch};
