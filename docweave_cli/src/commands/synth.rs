//! `docweave synth`: node tree file to documents.

use std::io::Write;

use camino::Utf8Path;
use docweave::serialize::{emit, parse_documents};
use docweave::{Composer, Node, NodeSpec, Schema, WeaveConfig};
use tracing::info;

use super::write_out;
use crate::error::CliError;
use crate::fs;

/// Compose the node tree stored in `tree` and print the documents in the
/// configured output format.
pub fn synth(config: &WeaveConfig, schema: &Schema, tree: &Utf8Path, out: &mut impl Write) -> Result<(), CliError> {
    let value = parse_documents(&fs::read_text(tree)?)?
        .into_iter()
        .next()
        .ok_or_else(|| CliError::EmptyInput(tree.to_path_buf()))?;
    let spec: NodeSpec = serde_json::from_value(value).map_err(|source| CliError::InvalidTree {
        path: tree.to_path_buf(),
        source,
    })?;
    let documents = Composer::new(&schema.relations)
        .with_options(config.compose_options())
        .compose(&Node::from(spec))?;
    info!(documents = documents.len(), format = %config.output, "documents composed");
    write_out(out, &emit(&documents, config.output)?)
}
