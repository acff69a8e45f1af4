//! Devcoms: sub-commands dispatched by name through `cmd://` URIs.

use anyhow::Result;
use std::fs;
use tracing::debug;

use crate::options::ParsedOptions;
use crate::tool::DevTool;

pub mod config;
pub mod registry;
pub mod setup;
pub mod wget;

pub use config::ConfigCommand;
pub use registry::Registry;
pub use setup::Setup;
pub use wget::Wget;

/// Contract every devcom implements.
pub trait DevCom {
    fn name(&self) -> &'static str;

    fn short_doc(&self) -> &'static str;

    // Built-in devcoms ship with the tool; the rest must be installed from the registry
    fn builtin(&self) -> bool {
        true
    }

    fn usage(&self, tool_name: &str) -> String {
        format!("usage: {tool_name} {} [options]", self.name())
    }

    /// Run with the parsed argument list.
    ///
    /// # Errors
    ///
    /// Any error aborts the invocation with a non-zero exit status.
    fn run(&self, tool: &mut DevTool, options: &ParsedOptions) -> Result<()>;

    /// Print the help text, followed by `doc://<name>` when it can be found.
    ///
    /// # Errors
    ///
    /// Returns an error if the documentation exists but cannot be read.
    fn help(&self, tool: &mut DevTool) -> Result<()> {
        println!("DEVCOM {} {}", self.name(), self.short_doc());
        println!();
        println!("{}", self.usage(tool.name));
        print_doc(tool, self.name())
    }
}

// Print the documentation resource of a devcom, if one is available
fn print_doc(tool: &mut DevTool, name: &str) -> Result<()> {
    match tool.require(&format!("doc://{name}")) {
        Ok(doc) => {
            let text = fs::read_to_string(&doc.absolute_path)?;
            println!();
            println!("{}", text.trim_end());
        }
        Err(e) => debug!(%name, "no documentation available: {e:#}"),
    }
    Ok(())
}

/// Constructor stored in the [`CommandTable`].
pub type Factory = fn() -> Box<dyn DevCom>;

// Factory for any devcom constructible through `Default`
#[must_use]
pub fn factory<T: DevCom + Default + 'static>() -> Box<dyn DevCom> {
    Box::new(T::default())
}

struct CommandEntry {
    name: &'static str,
    short_doc: &'static str,
    factory: Factory,
}

/// Closed set of devcoms the tool knows how to construct.
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.register(factory::<Setup>);
        table.register(factory::<Wget>);
        table.register(factory::<Registry>);
        table.register(factory::<ConfigCommand>);
        table
    }

    // Register a factory, replacing any previous one with the same name
    pub fn register(&mut self, factory: Factory) {
        let command = factory();
        let entry = CommandEntry {
            name: command.name(),
            short_doc: command.short_doc(),
            factory,
        };

        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    #[must_use]
    pub fn create(&self, name: &str) -> Option<Box<dyn DevCom>> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| (entry.factory)())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    // (name, short doc) pairs in registration order
    #[must_use]
    pub fn summaries(&self) -> Vec<(&'static str, &'static str)> {
        self.entries
            .iter()
            .map(|entry| (entry.name, entry.short_doc))
            .collect()
    }
}
