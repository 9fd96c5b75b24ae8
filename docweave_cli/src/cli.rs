//! Command-line interface definitions for `docweave`.

use camino::Utf8PathBuf;
use clap::{Args as ClapArgs, Parser, Subcommand};
use docweave::serialize::OutputFormat;
use serde::Serialize;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "docweave")]
#[command(about = "Compose documents from node trees and import documents as source")]
#[command(version)]
pub struct Args {
    /// Configuration file; defaults to `docweave.toml` when present.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<Utf8PathBuf>,
    /// Settings overriding the configuration file and environment.
    #[command(flatten)]
    pub overrides: Overrides,
    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Flags layered over `docweave.toml` and `DOCWEAVE_*` variables.
///
/// Unset flags are skipped during serialisation so they leave lower layers
/// untouched.
#[derive(Debug, Default, Clone, ClapArgs, Serialize)]
pub struct Overrides {
    /// Schema catalog (`.json`, `.yaml`, `.yml` or `.toml`).
    #[arg(long, global = true, value_name = "path")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Utf8PathBuf>,
    /// Format of composed documents.
    #[arg(long, global = true, value_name = "yaml|json")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputFormat>,
    /// Directory receiving generated source files.
    #[arg(long, global = true, value_name = "path")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<Utf8PathBuf>,
    /// Module path under which type constants live.
    #[arg(long, global = true, value_name = "path")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_root: Option<String>,
    /// Prefix of properties hoisted into `metadata`.
    #[arg(long, global = true, value_name = "marker")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_marker: Option<String>,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decompose a manifest into Rust source that rebuilds it.
    Import {
        /// YAML or JSON manifest, possibly holding several documents.
        manifest: Utf8PathBuf,
        /// Name of the generated function and of its `<name>.rs` file;
        /// derived from the manifest file name by default.
        #[arg(long)]
        function: Option<String>,
    },
    /// List the relations declared under a parent type.
    Relations {
        /// Parent type identifier.
        parent: String,
    },
    /// Compose documents from a JSON or YAML node tree.
    Synth {
        /// File holding a serialised node tree.
        tree: Utf8PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use docweave::serialize::OutputFormat;
    use rstest::rstest;

    use super::{Args, Command};

    #[rstest]
    fn global_flags_follow_the_subcommand() {
        let args = Args::try_parse_from([
            "docweave",
            "synth",
            "tree.json",
            "--output",
            "json",
            "--catalog",
            "catalog.yaml",
        ])
        .expect("arguments parse");
        assert!(matches!(args.command, Command::Synth { ref tree } if tree.as_str() == "tree.json"));
        assert_eq!(args.overrides.output, Some(OutputFormat::Json));
        assert_eq!(args.overrides.catalog.as_deref().map(|p| p.as_str()), Some("catalog.yaml"));
    }

    #[rstest]
    fn unset_overrides_serialise_to_nothing() {
        let args = Args::try_parse_from(["docweave", "relations", "k8s.Pod"]).expect("arguments parse");
        let value = serde_json::to_value(&args.overrides).expect("serialises");
        assert_eq!(value, serde_json::json!({}));
    }

    #[rstest]
    fn unknown_output_format_is_rejected() {
        assert!(Args::try_parse_from(["docweave", "synth", "t.json", "--output", "xml"]).is_err());
    }
}
