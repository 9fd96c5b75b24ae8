//! `docweave relations`: inspect the relation table.

use std::io::Write;

use docweave::{Schema, TypeId};
use tracing::warn;

use super::write_out;
use crate::error::CliError;

/// Print one tab-separated line per relation declared under `parent`:
/// child type, path, `array` or `single`, and the discriminator needed to
/// select the entry (`-` when none is needed).
pub fn relations(schema: &Schema, parent: &str, out: &mut impl Write) -> Result<(), CliError> {
    let table = &schema.relations;
    let parent_type = TypeId::new(parent);
    let entries = table.relations_for(&parent_type);
    if entries.is_empty() {
        warn!(%parent, "no relations declared under type");
    }
    let mut text = String::new();
    for entry in entries {
        let arity = if entry.is_array { "array" } else { "single" };
        let selector = table.selector(entry).unwrap_or_else(|| String::from("-"));
        text.push_str(&format!("{}\t{}\t{arity}\t{selector}\n", entry.child, entry.path));
    }
    write_out(out, &text)
}
