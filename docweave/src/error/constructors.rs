//! Constructors and aggregation helpers for `WeaveError`.

use std::sync::Arc;

use camino::Utf8Path;

use super::{AggregatedErrors, ParentChain, WeaveError};

impl WeaveError {
    /// Tries to batch errors into [`Self::Assertions`].
    ///
    /// Returns `None` when no errors are supplied. A single error is still
    /// wrapped so callers always receive the batch variant for deferred
    /// assertion failures.
    #[must_use]
    pub fn try_aggregate<I, E>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        let arcs: Vec<Arc<Self>> = errors.into_iter().map(Into::into).collect();
        if arcs.is_empty() {
            return None;
        }
        Some(Self::Assertions(Box::new(AggregatedErrors::new(arcs))))
    }

    /// Batch at least one error into [`Self::Assertions`].
    ///
    /// # Panics
    ///
    /// Panics if `errors` is empty. Use [`WeaveError::try_aggregate`] when the
    /// list may be empty.
    #[must_use]
    #[track_caller]
    pub fn aggregate<I, E>(errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        Self::try_aggregate(errors).map_or_else(
            || panic!("aggregate requires at least one error"),
            |err| err,
        )
    }

    /// Replace the parent chain of a placement error.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_chain(self, chain: ParentChain) -> Self {
        match self {
            Self::NotFound { parent, child, .. } => Self::NotFound {
                parent,
                child,
                chain,
            },
            Self::Ambiguous {
                parent,
                child,
                requested,
                candidates,
                ..
            } => Self::Ambiguous {
                parent,
                child,
                requested,
                candidates,
                chain,
            },
            other => other,
        }
    }

    /// Construct a configuration error from a [`figment::Error`].
    #[must_use]
    pub fn config(source: figment::Error) -> Self {
        Self::Config(Box::new(source))
    }

    /// Construct a file error for `path`.
    #[must_use]
    pub fn file<E>(path: &Utf8Path, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::File {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Construct an [`Self::InvalidPath`] error.
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }
}
