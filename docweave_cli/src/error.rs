//! Error types for the `docweave` command-line front end.

use std::sync::Arc;

use camino::Utf8PathBuf;
use docweave::WeaveError;
use thiserror::Error;

/// Errors surfaced by the command-line pipeline.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failure inside the library: catalog, configuration, composition or
    /// encoding.
    #[error(transparent)]
    Weave(#[from] Arc<WeaveError>),

    /// Neither the flags, the environment nor `docweave.toml` name a catalog.
    #[error("no catalog configured; pass --catalog or set `catalog` in docweave.toml")]
    MissingCatalog,

    /// The input file parsed to zero documents.
    #[error("'{0}' holds no documents")]
    EmptyInput(Utf8PathBuf),

    /// The first document of a tree file is not a serialised node tree.
    #[error("'{path}' is not a node tree: {source}")]
    InvalidTree {
        /// Tree file.
        path: Utf8PathBuf,
        /// Deserialisation failure.
        #[source]
        source: serde_json::Error,
    },

    /// Reading input, writing generated source or writing to stdout failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or stream involved.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
