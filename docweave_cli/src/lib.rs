//! Command-line front end for `docweave`.
//!
//! Resolves layered configuration, loads the schema catalog and dispatches
//! to the `import`, `relations` and `synth` commands.

pub mod cli;
pub mod commands;
pub mod error;
mod fs;

use std::io::Write;

use docweave::WeaveConfig;

use crate::cli::{Args, Command};
use crate::error::CliError;

/// Run the command described by `args`, writing primary output to `out`.
///
/// # Errors
///
/// Returns a [`CliError`] when configuration, the catalog, input files or
/// the underlying composition fail.
pub fn run(args: &Args, out: &mut impl Write) -> Result<(), CliError> {
    let config = WeaveConfig::load_with(args.config.as_deref(), &args.overrides)?;
    let schema = commands::load_schema(&config)?;
    match &args.command {
        Command::Import { manifest, function } => {
            commands::import(&config, &schema, manifest, function.as_deref(), out).map(|_| ())
        }
        Command::Relations { parent } => commands::relations(&schema, parent, out),
        Command::Synth { tree } => commands::synth(&config, &schema, tree, out),
    }
}
