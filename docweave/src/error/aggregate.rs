//! Batches of failures reported by one settled composition.

use std::{error::Error, fmt, sync::Arc};

use super::WeaveError;

/// Every failure gathered while finalising a composition.
///
/// Deferred assertions are evaluated as a batch once the tree settles, so a
/// composition with several broken invariants reports all of them at once.
///
/// # Examples
///
/// ```
/// use docweave::WeaveError;
/// let err = WeaveError::aggregate(vec![
///     WeaveError::Invariant { owner: "web".into(), message: "replicas unset".into() },
///     WeaveError::Invariant { owner: "db".into(), message: "image unset".into() },
/// ]);
/// let WeaveError::Assertions(batch) = err else { unreachable!() };
/// assert_eq!(batch.owners().collect::<Vec<_>>(), ["web", "db"]);
/// ```
#[derive(Debug, Default)]
pub struct AggregatedErrors {
    failures: Vec<Arc<WeaveError>>,
}

impl AggregatedErrors {
    /// Wrap `failures`, keeping their evaluation order.
    #[must_use]
    pub const fn new(failures: Vec<Arc<WeaveError>>) -> Self {
        Self { failures }
    }

    /// Failures in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &WeaveError> {
        self.failures.iter().map(Arc::as_ref)
    }

    /// Owners of the failed invariants; other failures are skipped.
    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.iter().filter_map(|failure| match failure {
            WeaveError::Invariant { owner, .. } => Some(owner.as_str()),
            _ => None,
        })
    }

    /// Number of failures.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns `true` for an empty batch.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self.iter().enumerate();
        if let Some((_, first)) = lines.next() {
            write!(f, "1: {first}")?;
        }
        for (index, failure) in lines {
            write!(f, "\n{}: {failure}", index + 1)?;
        }
        Ok(())
    }
}

impl Error for AggregatedErrors {}

impl IntoIterator for AggregatedErrors {
    type Item = Arc<WeaveError>;
    type IntoIter = std::vec::IntoIter<Arc<WeaveError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}
