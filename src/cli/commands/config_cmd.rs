//! config command - Print the effective configuration

use anyhow::{Context as _, Result};

use super::Context;
use crate::cli::output;

/// Print the configuration in use as TOML.
pub fn show(ctx: &Context) -> Result<()> {
    match &ctx.config_path {
        Some(path) => output::status(format!("# {}", path.display()), ctx.verbosity),
        None => output::status("# built-in defaults", ctx.verbosity),
    }

    let rendered = toml::to_string_pretty(ctx.truck.config().as_ref())
        .context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
