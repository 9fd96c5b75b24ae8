//! Primary error enum for composition, decomposition and catalog loading.

use camino::Utf8PathBuf;
use thiserror::Error;

use super::aggregate::AggregatedErrors;
use crate::path::DotPath;
use crate::relation::TypeId;

/// Shape a document slot was expected to have.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    /// The slot accepts appended array items.
    Array,
    /// The slot accepts a single assigned value.
    Single,
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Array => f.write_str("an array"),
            Self::Single => f.write_str("a single value"),
        }
    }
}

/// Root-first chain of element types enclosing a failed insertion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParentChain(Vec<TypeId>);

impl ParentChain {
    /// Build a chain from enclosing types ordered outermost first.
    #[must_use]
    pub const fn new(types: Vec<TypeId>) -> Self {
        Self(types)
    }

    /// Enclosing types ordered outermost first.
    #[must_use]
    pub fn types(&self) -> &[TypeId] {
        &self.0
    }
}

impl std::fmt::Display for ParentChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<document>");
        }
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{ty}")?;
        }
        Ok(())
    }
}

/// Errors that can occur while weaving documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WeaveError {
    /// No relation places the child type under the parent type.
    #[error("'{child}' cannot be placed under '{parent}' (in {chain})")]
    NotFound {
        /// Enclosing element type.
        parent: TypeId,
        /// Type the author tried to place.
        child: TypeId,
        /// Enclosing element types, outermost first.
        chain: ParentChain,
    },

    /// Several relations match and the discriminator did not pick one.
    #[error(
        "'{child}' has several placements under '{parent}' (in {chain}); {} does not select one of: {}",
        .requested.as_deref().map_or_else(|| String::from("a missing discriminator"), |d| format!("discriminator '{d}'")),
        .candidates.join(", ")
    )]
    Ambiguous {
        /// Enclosing element type.
        parent: TypeId,
        /// Type the author tried to place.
        child: TypeId,
        /// Discriminator supplied by the author, if any.
        requested: Option<String>,
        /// Discriminators accepted for this pair; `default` names the
        /// undiscriminated entry.
        candidates: Vec<String>,
        /// Enclosing element types, outermost first.
        chain: ParentChain,
    },

    /// A single-valued path was assigned twice.
    #[error("path '{path}' is already occupied")]
    PathCollision {
        /// Path inside the value being built.
        path: DotPath,
    },

    /// An append targeted a non-array slot, or an assignment targeted an array.
    #[error("expected {expected} at '{path}' but found {found}")]
    ArityMismatch {
        /// Path inside the value being built.
        path: DotPath,
        /// Shape required by the insertion.
        expected: Arity,
        /// JSON kind of the value already present.
        found: &'static str,
    },

    /// A dot path could not be parsed or navigated.
    #[error("invalid path '{path}': {message}")]
    InvalidPath {
        /// Offending path text.
        path: String,
        /// Human-readable explanation.
        message: String,
    },

    /// A deferred assertion was false once composition settled.
    #[error("{owner}: {message}")]
    Invariant {
        /// Component that registered the assertion.
        owner: String,
        /// Author-supplied failure message.
        message: String,
    },

    /// Every deferred assertion that failed during finalisation.
    #[error("deferred assertions failed:\n{0}")]
    Assertions(Box<AggregatedErrors>),

    /// Composition finished a pass with nodes still waiting on input.
    #[error("composition did not settle: {pending} node(s) still pending")]
    Unsettled {
        /// Number of suspended subtrees in the last pass.
        pending: usize,
    },

    /// A pending handle can never resolve because its resolver was dropped.
    #[error("deferred value '{label}' was abandoned before it resolved")]
    ResolverDropped {
        /// Label given to the deferred handle.
        label: String,
    },

    /// A document's identifying fields name no known type.
    #[error("unrecognised document type '{kind}' in '{api_version}'")]
    UnrecognizedDocumentType {
        /// Value of the document's `apiVersion` field.
        api_version: String,
        /// Value of the document's `kind` field.
        kind: String,
    },

    /// A nested value matched a relation path but not its expected shape.
    #[error("kept '{path}' on '{parent}' as a literal field: expected {expected} of '{child}', found {found}")]
    RetainedValue {
        /// Type being decomposed.
        parent: TypeId,
        /// Child type the relation declares.
        child: TypeId,
        /// Relation path relative to the parent.
        path: DotPath,
        /// Shape the relation declares.
        expected: Arity,
        /// JSON kind actually found.
        found: &'static str,
    },

    /// The relation catalog violates the uniqueness invariants.
    #[error("duplicate relation for '{child}' under '{parent}' with discriminator '{discriminator}'")]
    DuplicateRelation {
        /// Parent type of the duplicated entry.
        parent: TypeId,
        /// Child type of the duplicated entry.
        child: TypeId,
        /// Discriminator shared by both entries (`default` when absent).
        discriminator: String,
    },

    /// Error originating from a file read by the loader.
    #[error("file error in '{path}': {source}")]
    File {
        /// Path that triggered the failure.
        path: Utf8PathBuf,
        /// Underlying error reported while reading or parsing.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error while extracting layered configuration.
    #[error("failed to load configuration: {0}")]
    Config(Box<figment::Error>),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[source] serde_json::Error),

    /// YAML encoding or decoding failure.
    #[error("YAML error: {0}")]
    Yaml(#[source] serde_yaml::Error),

    /// TOML decoding failure.
    #[error("TOML error: {0}")]
    Toml(#[source] toml::de::Error),
}
