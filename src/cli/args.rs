//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of the standard locations
//! - `--api <url>`: Override the configured base URL
//! - `--offline`: Resolve writes locally instead of sending them
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Truck - client-side models over a JSON REST API
#[derive(Parser, Debug)]
#[command(name = "truck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL override
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Work on offline copies; nothing is sent to the backend
    #[arg(long, global = true)]
    pub offline: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one record by key
    Find {
        /// Model name under [models]
        model: String,
        /// Primary key
        id: String,
    },

    /// Fetch every record of a model
    #[command(alias = "all")]
    Index {
        /// Model name under [models]
        model: String,
    },

    /// Create a record
    Create {
        /// Model name under [models]
        model: String,
        /// Field assignment, `name=value` (value parsed as JSON when possible)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Send a partial update for a record
    Update {
        /// Model name under [models]
        model: String,
        /// Primary key
        id: String,
        /// Field assignment, `name=value` (value parsed as JSON when possible)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Send one field to the record's sync endpoint
    Sync {
        /// Model name under [models]
        model: String,
        /// Primary key
        id: String,
        /// Field to sync
        key: String,
        /// New value (parsed as JSON when possible)
        value: Option<String>,
    },

    /// Delete a record
    Delete {
        /// Model name under [models]
        model: String,
        /// Primary key
        id: String,
    },

    /// Print the effective configuration
    Config,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
