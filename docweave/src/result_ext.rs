//! Result alias and adapters for lifting foreign errors into `WeaveError`.
//!
//! ```
//! use docweave::{WeaveResult, WeaveResultExt};
//!
//! fn replicas(text: &str) -> WeaveResult<serde_json::Value> {
//!     serde_json::from_str(text).into_weave()
//! }
//! assert!(replicas("{\"replicas\": 2}").is_ok());
//! ```

use std::error::Error;
use std::sync::Arc;

use camino::Utf8Path;

use crate::WeaveError;

/// Result alias used throughout the crate; errors are shared so aggregated
/// batches and callers can hold the same failure.
pub type WeaveResult<T> = Result<T, Arc<WeaveError>>;

/// Lifts `Result<T, E>` into [`WeaveResult`] when `E` converts into
/// [`WeaveError`].
pub trait WeaveResultExt<T> {
    /// Convert the error through `Into<WeaveError>`.
    ///
    /// # Errors
    ///
    /// Returns the converted error.
    fn into_weave(self) -> WeaveResult<T>;
}

impl<T, E> WeaveResultExt<T> for Result<T, E>
where
    E: Into<WeaveError>,
{
    fn into_weave(self) -> WeaveResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}

/// Attributes any error to the file it came from.
pub trait FileResultExt<T> {
    /// Wrap the error in [`WeaveError::File`] for `path`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error.
    fn for_file(self, path: &Utf8Path) -> WeaveResult<T>;
}

impl<T, E> FileResultExt<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn for_file(self, path: &Utf8Path) -> WeaveResult<T> {
        self.map_err(|e| Arc::new(WeaveError::file(path, e)))
    }
}
