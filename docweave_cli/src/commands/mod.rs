//! Subcommand implementations.
//!
//! Each command receives the resolved configuration and the compiled schema
//! and writes its primary output to the supplied writer.

mod import;
mod relations;
mod synth;

use std::io::Write;

use camino::Utf8Path;
use docweave::{Catalog, Schema, WeaveConfig};
use tracing::debug;

pub use import::import;
pub use relations::relations;
pub use synth::synth;

use crate::error::CliError;

/// Load and compile the configured catalog.
pub fn load_schema(config: &WeaveConfig) -> Result<Schema, CliError> {
    let path = config.catalog.as_deref().ok_or(CliError::MissingCatalog)?;
    let schema = Catalog::load(path)?.compile()?;
    debug!(catalog = %path, entries = schema.relations.len(), "schema ready");
    Ok(schema)
}

fn write_out(out: &mut impl Write, text: &str) -> Result<(), CliError> {
    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|err| CliError::io(Utf8Path::new("<stdout>"), err))
}
