//! Relation table describing where node types may appear inside each other.
//!
//! The table is compiled once from a schema catalog and is read-only
//! afterwards. It answers two questions:
//!
//! - composition: where does child type `Y` go under parent type `X`
//!   ([`RelationTable::resolve`]);
//! - decomposition: what may live under `X` ([`RelationTable::relations_for`]).
//!
//! Entries sharing a `(parent, child)` pair are grouped into a placement,
//! so resolution is a pair of hash lookups followed by a discriminator match.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ParentChain;
use crate::path::DotPath;
use crate::WeaveError;

/// Discriminator that selects the entry declared without one.
pub const DEFAULT_DISCRIMINATOR: &str = "default";

/// Globally unique name of a node type.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(Arc<str>);

impl TypeId {
    /// Create a type identifier.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last dotted component, e.g. `Deployment` for
    /// `io.k8s.api.apps.v1.Deployment`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TypeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&TypeId> for TypeId {
    fn from(value: &TypeId) -> Self {
        value.clone()
    }
}

/// One legal placement of a child type under a parent type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationEntry {
    /// Type being placed.
    pub child: TypeId,
    /// Type that receives the child.
    pub parent: TypeId,
    /// Field path relative to the parent's value.
    pub path: DotPath,
    /// Whether instances are appended to an array at `path`.
    pub is_array: bool,
    /// Tag distinguishing entries that share `(parent, child)`.
    pub discriminator: Option<String>,
}

impl RelationEntry {
    /// Create a single-valued, undiscriminated entry.
    #[must_use]
    pub fn new(child: impl Into<TypeId>, parent: impl Into<TypeId>, path: DotPath) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
            path,
            is_array: false,
            discriminator: None,
        }
    }

    /// Mark the entry as array-valued.
    #[must_use]
    pub const fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Attach a discriminator.
    #[must_use]
    pub fn discriminator(mut self, tag: impl Into<String>) -> Self {
        self.discriminator = Some(tag.into());
        self
    }

    /// Discriminator label, `default` when the entry has none.
    #[must_use]
    pub fn label(&self) -> &str {
        self.discriminator.as_deref().unwrap_or(DEFAULT_DISCRIMINATOR)
    }
}

/// Field-shaping rules a type applies to its scalar properties.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TypeShape {
    /// Collect marker-prefixed properties into a nested `metadata` object.
    pub hoist_metadata: bool,
    /// Property whose object value is unwrapped into the element's value.
    pub spec_key: Option<String>,
}

impl TypeShape {
    const fn plain() -> Self {
        Self {
            hoist_metadata: false,
            spec_key: None,
        }
    }
}

static PLAIN_SHAPE: TypeShape = TypeShape::plain();

/// Entries sharing one `(parent, child)` pair, as indices into the parent's
/// entry list.
#[derive(Clone, Debug)]
enum Placement {
    /// Exactly one entry; usable without a discriminator.
    Unique(usize),
    /// Several entries; a discriminator is mandatory.
    Tagged {
        default: Option<usize>,
        tagged: BTreeMap<String, usize>,
    },
}

impl Placement {
    fn candidates(&self, entries: &[RelationEntry]) -> Vec<String> {
        match self {
            Self::Unique(index) => entries
                .get(*index)
                .map(|entry| vec![entry.label().to_owned()])
                .unwrap_or_default(),
            Self::Tagged { default, tagged } => default
                .map(|_| DEFAULT_DISCRIMINATOR.to_owned())
                .into_iter()
                .chain(tagged.keys().cloned())
                .collect(),
        }
    }

    fn select(&self, entries: &[RelationEntry], requested: Option<&str>) -> Option<usize> {
        match (self, requested) {
            (Self::Unique(index), None) => Some(*index),
            (Self::Unique(index), Some(tag)) => entries
                .get(*index)
                .filter(|entry| entry.label() == tag)
                .map(|_| *index),
            (Self::Tagged { .. }, None) => None,
            (Self::Tagged { default, .. }, Some(DEFAULT_DISCRIMINATOR)) => *default,
            (Self::Tagged { tagged, .. }, Some(tag)) => tagged.get(tag).copied(),
        }
    }
}

/// Immutable multimap of relation entries indexed by parent and by pair.
#[derive(Clone, Debug, Default)]
pub struct RelationTable {
    by_parent: HashMap<TypeId, Vec<RelationEntry>>,
    placements: HashMap<TypeId, HashMap<TypeId, Placement>>,
    shapes: HashMap<TypeId, TypeShape>,
}

impl RelationTable {
    /// Start building a table.
    #[must_use]
    pub fn builder() -> RelationTableBuilder {
        RelationTableBuilder::default()
    }

    /// Resolve where `child` goes under `parent`.
    ///
    /// The returned error carries a chain holding only `parent`; the composer
    /// replaces it with the full enclosing chain.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::NotFound`] when no entry matches the pair and
    /// [`WeaveError::Ambiguous`] when several entries match but
    /// `discriminator` is absent or names none of them.
    pub fn resolve(
        &self,
        parent: &TypeId,
        child: &TypeId,
        discriminator: Option<&str>,
    ) -> Result<&RelationEntry, WeaveError> {
        let chain = || ParentChain::new(vec![parent.clone()]);
        let entries = self.relations_for(parent);
        let placement = self
            .placements
            .get(parent)
            .and_then(|children| children.get(child))
            .ok_or_else(|| WeaveError::NotFound {
                parent: parent.clone(),
                child: child.clone(),
                chain: chain(),
            })?;
        let selected = placement
            .select(entries, discriminator)
            .and_then(|index| entries.get(index))
            .ok_or_else(|| WeaveError::Ambiguous {
                parent: parent.clone(),
                child: child.clone(),
                requested: discriminator.map(str::to_owned),
                candidates: placement.candidates(entries),
                chain: chain(),
            })?;
        trace!(%parent, %child, path = %selected.path, "resolved relation");
        Ok(selected)
    }

    /// Every entry declared under `parent`, in declaration order.
    #[must_use]
    pub fn relations_for(&self, parent: &TypeId) -> &[RelationEntry] {
        self.by_parent.get(parent).map_or(&[][..], Vec::as_slice)
    }

    /// Discriminator an author must supply to reach `entry` again.
    ///
    /// Returns `None` when the entry is the only placement of its pair.
    #[must_use]
    pub fn selector(&self, entry: &RelationEntry) -> Option<String> {
        match self
            .placements
            .get(&entry.parent)
            .and_then(|children| children.get(&entry.child))
        {
            Some(Placement::Tagged { .. }) => Some(entry.label().to_owned()),
            Some(Placement::Unique(_)) | None => None,
        }
    }

    /// Field-shaping rules declared for `ty`; plain when undeclared.
    #[must_use]
    pub fn shape(&self, ty: &TypeId) -> &TypeShape {
        self.shapes.get(ty).unwrap_or(&PLAIN_SHAPE)
    }

    /// Number of entries across all parents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_parent.values().map(Vec::len).sum()
    }

    /// Returns `true` when the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_parent.is_empty()
    }
}

/// Accumulates entries and shapes before validating them into a table.
#[derive(Debug, Default)]
pub struct RelationTableBuilder {
    entries: Vec<RelationEntry>,
    shapes: HashMap<TypeId, TypeShape>,
}

impl RelationTableBuilder {
    /// Add a relation entry.
    #[must_use]
    pub fn relation(mut self, entry: RelationEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Declare field-shaping rules for a type.
    #[must_use]
    pub fn shape(mut self, ty: impl Into<TypeId>, shape: TypeShape) -> Self {
        self.shapes.insert(ty.into(), shape);
        self
    }

    /// Validate the accumulated entries and build the table.
    ///
    /// An explicit `default` discriminator is treated as no discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::DuplicateRelation`] when two entries of the same
    /// pair lack a discriminator or share one.
    pub fn build(self) -> Result<RelationTable, WeaveError> {
        let mut by_parent: HashMap<TypeId, Vec<RelationEntry>> = HashMap::new();
        let mut grouped: HashMap<TypeId, HashMap<TypeId, Vec<usize>>> = HashMap::new();
        for mut entry in self.entries {
            if entry.discriminator.as_deref() == Some(DEFAULT_DISCRIMINATOR) {
                entry.discriminator = None;
            }
            let siblings = by_parent.entry(entry.parent.clone()).or_default();
            grouped
                .entry(entry.parent.clone())
                .or_default()
                .entry(entry.child.clone())
                .or_default()
                .push(siblings.len());
            siblings.push(entry);
        }

        let mut placements = HashMap::new();
        for (parent, children) in grouped {
            let entries = by_parent.get(&parent).map_or(&[][..], Vec::as_slice);
            let mut compiled = HashMap::new();
            for (child, indices) in children {
                let placement = compile_placement(entries, &indices)?;
                compiled.insert(child, placement);
            }
            placements.insert(parent, compiled);
        }

        Ok(RelationTable {
            by_parent,
            placements,
            shapes: self.shapes,
        })
    }
}

fn compile_placement(entries: &[RelationEntry], indices: &[usize]) -> Result<Placement, WeaveError> {
    if let [only] = indices {
        return Ok(Placement::Unique(*only));
    }
    let mut default = None;
    let mut tagged = BTreeMap::new();
    for &index in indices {
        let Some(entry) = entries.get(index) else {
            continue;
        };
        let duplicate = match &entry.discriminator {
            None => default.replace(index).is_some(),
            Some(tag) => tagged.insert(tag.clone(), index).is_some(),
        };
        if duplicate {
            return Err(WeaveError::DuplicateRelation {
                parent: entry.parent.clone(),
                child: entry.child.clone(),
                discriminator: entry.label().to_owned(),
            });
        }
    }
    Ok(Placement::Tagged { default, tagged })
}
