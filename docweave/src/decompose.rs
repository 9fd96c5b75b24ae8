//! Reconstruct declarative trees from finished documents.
//!
//! The decomposer mirrors the composer: for each type it walks the relations
//! declared under that type in declaration order, removes every value found
//! at a relation path from a working copy and decomposes it as a child
//! element. Whatever remains becomes the element's properties, with field
//! shaping reversed; fields that would not survive shaping as properties
//! are rebuilt by literal children instead.
//!
//! Decomposition never fails. Values that sit at a relation path but have
//! the wrong shape are kept as literal properties, and documents of unknown
//! type become passthrough elements; both are reported as warnings.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{get, is_vacant, kind_of, take};
use crate::error::Arity;
use crate::node::{Element, Literal, Node};
use crate::path::DotPath;
use crate::registry::TypeRegistry;
use crate::relation::{RelationEntry, RelationTable, TypeId};
use crate::shape::{DEFAULT_METADATA_MARKER, unshape_fields};
use crate::WeaveError;

/// Options controlling decomposition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecomposeOptions {
    /// Prefix given to fields flattened out of `metadata`.
    pub metadata_marker: String,
}

impl Default for DecomposeOptions {
    fn default() -> Self {
        Self {
            metadata_marker: DEFAULT_METADATA_MARKER.to_owned(),
        }
    }
}

/// Result of decomposing one document.
#[derive(Debug)]
pub struct Decomposition {
    /// Reconstructed root element.
    pub root: Element,
    /// Every type used in the tree, passthrough elements excluded.
    pub type_refs: BTreeSet<TypeId>,
    /// Non-fatal problems met along the way.
    pub warnings: Vec<WeaveError>,
}

impl Decomposition {
    /// The reconstructed tree as a node.
    #[must_use]
    pub fn tree(&self) -> Node {
        Node::Element(self.root.clone())
    }
}

/// Converts documents back into element trees.
#[derive(Clone, Debug)]
pub struct Decomposer<'t> {
    table: &'t RelationTable,
    options: DecomposeOptions,
}

impl<'t> Decomposer<'t> {
    /// Create a decomposer with default options.
    #[must_use]
    pub fn new(table: &'t RelationTable) -> Self {
        Self {
            table,
            options: DecomposeOptions::default(),
        }
    }

    /// Override decomposition options.
    #[must_use]
    pub fn with_options(mut self, options: DecomposeOptions) -> Self {
        self.options = options;
        self
    }

    /// Decompose `document` as an instance of `root_type`.
    ///
    /// Non-object documents cannot be the value of an element and are
    /// returned as passthrough elements.
    #[must_use]
    pub fn decompose(&self, document: &Value, root_type: &TypeId) -> Decomposition {
        let mut walk = Walk::default();
        let root = match document {
            Value::Object(fields) => self.element(fields.clone(), root_type, &mut walk),
            other => Element::passthrough(other.clone()),
        };
        debug!(
            root = %root_type,
            types = walk.type_refs.len(),
            warnings = walk.warnings.len(),
            "document decomposed"
        );
        Decomposition {
            root,
            type_refs: walk.type_refs,
            warnings: walk.warnings,
        }
    }

    /// Decompose `document`, identifying its root type through `registry`.
    ///
    /// Unknown documents are reproduced verbatim by a passthrough element and
    /// reported with [`WeaveError::UnrecognizedDocumentType`].
    #[must_use]
    pub fn decompose_document(&self, document: &Value, registry: &TypeRegistry) -> Decomposition {
        match registry.identify(document) {
            Ok(root_type) => self.decompose(document, root_type),
            Err(unknown) => {
                warn!(error = %unknown, "keeping document verbatim");
                Decomposition {
                    root: Element::passthrough(document.clone()),
                    type_refs: BTreeSet::new(),
                    warnings: vec![unknown],
                }
            }
        }
    }

    fn element(&self, fields: Map<String, Value>, ty: &TypeId, walk: &mut Walk) -> Element {
        walk.type_refs.insert(ty.clone());
        let mut working = Value::Object(fields);
        let mut children = Vec::new();
        for entry in self.table.relations_for(ty) {
            let Some(found) = get(&working, &entry.path).filter(|value| !is_vacant(value)) else {
                continue;
            };
            if let Some(problem) = shape_problem(entry, found) {
                let warning = WeaveError::RetainedValue {
                    parent: ty.clone(),
                    child: entry.child.clone(),
                    path: entry.path.clone(),
                    expected: if entry.is_array { Arity::Array } else { Arity::Single },
                    found: problem,
                };
                warn!(error = %warning, "value retained");
                walk.warnings.push(warning);
                continue;
            }
            let Some(value) = take(&mut working, &entry.path) else {
                continue;
            };
            let selector = self.table.selector(entry);
            let values = match value {
                Value::Array(items) => items,
                single => vec![single],
            };
            for item in values {
                if let Value::Object(nested) = item {
                    let mut child = self.element(nested, &entry.child, walk);
                    child.discriminator.clone_from(&selector);
                    children.push(Node::Element(child));
                }
            }
        }

        let remaining = match working {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let unshaped = unshape_fields(remaining, self.table.shape(ty), &self.options.metadata_marker);
        children.extend(
            unshaped
                .verbatim
                .into_iter()
                .map(|(key, value)| Node::Literal(Literal::field(DotPath::keys([key]), value))),
        );
        Element {
            type_id: ty.clone(),
            props: unshaped.props,
            discriminator: None,
            children,
        }
    }
}

/// Types referenced and warnings raised while walking one document.
#[derive(Default)]
struct Walk {
    type_refs: BTreeSet<TypeId>,
    warnings: Vec<WeaveError>,
}

/// Kind of `found` when it cannot be decomposed through `entry`.
fn shape_problem(entry: &RelationEntry, found: &Value) -> Option<&'static str> {
    match (entry.is_array, found) {
        (true, Value::Array(items)) => items
            .iter()
            .any(|item| !item.is_object())
            .then_some("an array holding non-object items"),
        (false, Value::Object(_)) => None,
        (_, other) => Some(kind_of(other)),
    }
}
