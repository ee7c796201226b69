//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each record command:
//! 1. Looks up the model class built from the configuration
//! 2. Runs the model operation on the shared tokio runtime
//! 3. Prints the resulting record(s) as JSON
//!
//! `config` and `completion` need no runtime.

mod completion;
mod config_cmd;
mod records;

pub use completion::completion;
pub use config_cmd::show as config_show;
pub use records::{parse_assignments, parse_id, parse_value};

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::cli::args::Command;
use crate::cli::output::Verbosity;
use crate::model::ModelClass;
use crate::Truck;

/// Everything a command handler needs.
pub struct Context {
    /// Entry point holding configuration and network layer
    pub truck: Truck,
    /// Classes built from `[models]`, by table name
    pub models: BTreeMap<String, ModelClass>,
    /// Config file that was loaded, if any
    pub config_path: Option<PathBuf>,
    /// Work on offline copies
    pub offline: bool,
    pub verbosity: Verbosity,
}

impl Context {
    /// Look up a declared model.
    pub fn model(&self, name: &str) -> Result<&ModelClass> {
        self.models.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.models.keys().map(String::as_str).collect();
            if known.is_empty() {
                anyhow!("unknown model '{}': no models are configured", name)
            } else {
                anyhow!(
                    "unknown model '{}' (configured: {})",
                    name,
                    known.join(", ")
                )
            }
        })
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Config => config_cmd::show(ctx),
        Command::Completion { shell } => completion(shell),
        record => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(records::run(record, ctx))
        }
    }
}
