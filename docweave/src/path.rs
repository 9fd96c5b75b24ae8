//! Dot paths addressing fields inside a document.
//!
//! A [`DotPath`] is a sequence of object keys and array indices written as
//! `spec.template.spec.containers[0].name`. Relation entries only use key
//! segments; index segments appear when composition descends into an array
//! item appended by a literal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::WeaveError;

/// One step of a [`DotPath`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Segment {
    /// Object field name.
    Key(String),
    /// Array position.
    Index(usize),
}

/// Ordered field-name segments relative to an insertion context.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DotPath(Vec<Segment>);

impl DotPath {
    /// The empty path, addressing the insertion context itself.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from object keys.
    #[must_use]
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| Segment::Key(k.into())).collect())
    }

    /// Parse `text` into a path.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::InvalidPath`] for empty segments, unterminated
    /// brackets or non-numeric indices.
    pub fn parse(text: &str) -> Result<Self, WeaveError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for part in text.split('.') {
            parse_part(text, part, &mut segments)?;
        }
        Ok(Self(segments))
    }

    /// Segments of the path in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Returns `true` for the empty path.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenate `other` onto this path.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Extend the path by one object key.
    #[must_use]
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.into()));
        Self(segments)
    }

    /// Extend the path by one array index.
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// The first `len` segments of this path.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0.iter().take(len).cloned().collect())
    }
}

fn parse_part(text: &str, part: &str, segments: &mut Vec<Segment>) -> Result<(), WeaveError> {
    let (key, mut rest) = part.find('[').map_or((part, ""), |at| part.split_at(at));
    if key.is_empty() && rest.is_empty() {
        return Err(WeaveError::invalid_path(text, "empty segment"));
    }
    if !key.is_empty() {
        segments.push(Segment::Key(key.to_owned()));
    }
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .and_then(|r| r.split_once(']'))
            .ok_or_else(|| WeaveError::invalid_path(text, "unterminated index"))?;
        let index = inner
            .0
            .parse::<usize>()
            .map_err(|_| WeaveError::invalid_path(text, format!("'{}' is not an index", inner.0)))?;
        segments.push(Segment::Index(index));
        rest = inner.1;
    }
    Ok(())
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for DotPath {
    type Err = WeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DotPath {
    type Error = WeaveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DotPath> for String {
    fn from(path: DotPath) -> Self {
        path.to_string()
    }
}
