//! `docweave import`: manifest to Rust source.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use docweave::serialize::{parse_documents, render_source};
use docweave::{Decomposer, Decomposition, Schema, WeaveConfig};
use tracing::info;

use super::write_out;
use crate::error::CliError;
use crate::fs;

/// Decompose every document in `manifest` and write the generated source to
/// the configured output directory.
///
/// The file is named after the generated function: `function` when given,
/// otherwise a name derived from the manifest's file stem.
///
/// Returns the path of the written file, which is also printed to `out`.
pub fn import(
    config: &WeaveConfig,
    schema: &Schema,
    manifest: &Utf8Path,
    function: Option<&str>,
    out: &mut impl Write,
) -> Result<Utf8PathBuf, CliError> {
    let documents = parse_documents(&fs::read_text(manifest)?)?;
    if documents.is_empty() {
        return Err(CliError::EmptyInput(manifest.to_path_buf()));
    }
    let decomposer = Decomposer::new(&schema.relations).with_options(config.decompose_options());
    let decompositions: Vec<Decomposition> = documents
        .iter()
        .map(|document| decomposer.decompose_document(document, &schema.registry))
        .collect();

    let stem = manifest.file_stem().unwrap_or("manifest");
    let mut options = config.source_options().with_function_for(stem);
    if let Some(name) = function {
        options.function_name = name.to_owned();
    }
    let file_name = format!("{}.rs", options.function_name);

    let source = render_source(&decompositions, &schema.registry, &options);
    let written = fs::write_text(&config.out_dir, &file_name, &source)?;
    info!(
        path = %written,
        documents = decompositions.len(),
        warnings = decompositions.iter().map(|d| d.warnings.len()).sum::<usize>(),
        "import written"
    );
    write_out(out, &format!("{written}\n"))?;
    Ok(written)
}
