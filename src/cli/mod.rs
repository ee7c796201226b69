//! cli
//!
//! Command-line interface over the model layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Load configuration and build the declared model classes
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Records are read and written through
//! [`ModelClass`](crate::model::ModelClass) and
//! [`Model`](crate::model::Model) exactly as library users would.

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, Command, Shell};

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::config::TruckConfig;
use crate::util::LOG_TARGET;
use crate::Truck;
use output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);

    // Completion scripts do not depend on configuration.
    if let Command::Completion { shell } = cli.command {
        return commands::completion(shell);
    }

    let loaded = TruckConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let config = match &cli.api {
        Some(api) => {
            let config = loaded.config.with_api(api.clone());
            config.validate().context("Invalid --api")?;
            config
        }
        None => loaded.config,
    };

    let truck = Truck::new(config);
    let models = truck
        .define_all()
        .context("Failed to build models from config")?;
    tracing::debug!(target: LOG_TARGET, count = models.len(), "models defined");

    let ctx = commands::Context {
        truck,
        models,
        config_path: loaded.path,
        offline: cli.offline,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr. `RUST_LOG` wins over the flags.
fn init_tracing(debug: bool, quiet: bool) {
    let fallback = if debug {
        "truck=debug"
    } else if quiet {
        "error"
    } else {
        "truck=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
