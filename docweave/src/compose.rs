//! Single-pass composition of a node tree into documents.
//!
//! The composer walks the tree depth first while tracking the chain of
//! enclosing element types. Each element resolves its placement against the
//! innermost enclosing element through the [`RelationTable`]; literals write
//! at explicit paths; transforms compose into a scratch copy, rewrite it and
//! deep-merge the rewritten value over the composed one and then back into
//! the document.
//!
//! A pass never returns partial output on error: the first insertion failure
//! aborts the whole pass. Components that suspend are counted and skipped;
//! [`Composer::compose`] rejects such a pass, while the
//! [`Scheduler`](crate::schedule::Scheduler) waits and retries it.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::document::{append, get, merge_at, merge_value, set};
use crate::error::ParentChain;
use crate::node::{ComponentNode, Element, Literal, Node, Transform};
use crate::path::DotPath;
use crate::relation::{RelationTable, TypeId};
use crate::schedule::{Pass, PassState, Scope};
use crate::shape::{DEFAULT_METADATA_MARKER, shape_props};
use crate::{WeaveError, WeaveResult};

/// Options controlling composition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComposeOptions {
    /// Prefix marking properties hoisted into `metadata`.
    pub metadata_marker: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            metadata_marker: DEFAULT_METADATA_MARKER.to_owned(),
        }
    }
}

/// Evaluates node trees against a relation table.
#[derive(Clone, Debug)]
pub struct Composer<'t> {
    table: &'t RelationTable,
    options: ComposeOptions,
}

impl<'t> Composer<'t> {
    /// Create a composer with default options.
    #[must_use]
    pub fn new(table: &'t RelationTable) -> Self {
        Self {
            table,
            options: ComposeOptions::default(),
        }
    }

    /// Override composition options.
    #[must_use]
    pub fn with_options(mut self, options: ComposeOptions) -> Self {
        self.options = options;
        self
    }

    /// Compose `tree` in a single pass.
    ///
    /// A [`Node::Root`] yields one document per child; any other node yields
    /// exactly one document.
    ///
    /// # Errors
    ///
    /// Returns the first placement or insertion error, [`WeaveError::Unsettled`]
    /// when a component suspended, and [`WeaveError::Assertions`] when
    /// deferred assertions fail.
    ///
    /// # Examples
    ///
    /// ```
    /// use docweave::{Composer, Element, Node, RelationEntry, RelationTable};
    /// use docweave::path::DotPath;
    /// use serde_json::json;
    ///
    /// let table = RelationTable::builder()
    ///     .relation(RelationEntry::new("Container", "Pod", DotPath::keys(["containers"])).array())
    ///     .build()?;
    /// let tree = Node::root([Element::new("Pod")
    ///     .prop("name", "web")
    ///     .child(Element::new("Container").prop("image", "nginx"))]);
    /// let documents = Composer::new(&table).compose(&tree)?;
    /// assert_eq!(documents, vec![json!({"name": "web", "containers": [{"image": "nginx"}]})]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn compose(&self, tree: &Node) -> WeaveResult<Vec<Value>> {
        self.pass(tree)?.finalize()
    }

    /// Run one pass over `tree` without judging whether it settled.
    ///
    /// # Errors
    ///
    /// Returns the first placement or insertion error.
    pub fn pass(&self, tree: &Node) -> WeaveResult<Pass> {
        let mut run = Run {
            table: self.table,
            options: &self.options,
            context: Vec::new(),
            state: PassState::default(),
            suspended: 0,
        };
        let mut documents = Vec::new();
        run.collect(tree, &mut documents).map_err(Arc::new)?;
        debug!(
            documents = documents.len(),
            suspended = run.suspended,
            "composition pass finished"
        );
        Ok(Pass {
            documents,
            state: run.state,
            suspended: run.suspended,
        })
    }
}

/// Mutable state of one pass.
struct Run<'r> {
    table: &'r RelationTable,
    options: &'r ComposeOptions,
    context: Vec<TypeId>,
    state: PassState,
    suspended: usize,
}

impl Run<'_> {
    /// Gather the documents produced by a top-level node.
    fn collect(&mut self, node: &Node, documents: &mut Vec<Value>) -> Result<(), WeaveError> {
        match node {
            Node::Root(children) => children
                .iter()
                .try_for_each(|child| self.collect(child, documents)),
            Node::Component(component) => match self.render(component) {
                Some(rendered) => self.collect(&rendered, documents),
                None => Ok(()),
            },
            other => {
                documents.push(self.document(other)?);
                Ok(())
            }
        }
    }

    fn document(&mut self, node: &Node) -> Result<Value, WeaveError> {
        let mut doc = Value::Null;
        self.compose_into(node, &mut doc, &DotPath::root())?;
        if doc.is_null() {
            doc = Value::Object(Map::new());
        }
        Ok(doc)
    }

    /// Compose `node` into `doc`, relative to `base`.
    fn compose_into(&mut self, node: &Node, doc: &mut Value, base: &DotPath) -> Result<(), WeaveError> {
        match node {
            // A nested root is a fragment: its children share the context.
            Node::Root(children) => children
                .iter()
                .try_for_each(|child| self.compose_into(child, doc, base)),
            Node::Element(element) => self.element(element, doc, base),
            Node::Literal(literal) => self.literal(literal, doc, base),
            Node::Transform(transform) => self.transform(transform, doc, base),
            Node::Component(component) => match self.render(component) {
                Some(rendered) => self.compose_into(&rendered, doc, base),
                None => Ok(()),
            },
        }
    }

    fn element(&mut self, element: &Element, doc: &mut Value, base: &DotPath) -> Result<(), WeaveError> {
        let table = self.table;
        let entry = match self.context.last() {
            Some(parent) => Some(
                table
                    .resolve(parent, &element.type_id, element.discriminator.as_deref())
                    .map_err(|err| err.with_chain(ParentChain::new(self.context.clone())))?,
            ),
            None => None,
        };

        let shape = table.shape(&element.type_id);
        let fields = shape_props(&element.props, shape, &self.options.metadata_marker)?;
        let mut value = Value::Object(fields);
        self.context.push(element.type_id.clone());
        let composed = element
            .children
            .iter()
            .try_for_each(|child| self.compose_into(child, &mut value, &DotPath::root()));
        self.context.pop();
        composed?;

        match entry {
            None => merge_at(doc, base, value),
            Some(entry) => {
                let target = base.join(&entry.path);
                trace!(child = %element.type_id, path = %target, array = entry.is_array, "placing element");
                if entry.is_array {
                    append(doc, &target, value).map(|_| ())
                } else {
                    set(doc, &target, value)
                }
            }
        }
    }

    fn literal(&mut self, literal: &Literal, doc: &mut Value, base: &DotPath) -> Result<(), WeaveError> {
        let target = base.join(&literal.path);
        let child_base = if literal.array_item {
            let item = literal
                .value
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new()));
            let index = append(doc, &target, item)?;
            target.child_index(index)
        } else {
            if let Some(value) = &literal.value {
                set(doc, &target, value.clone())?;
            }
            target
        };
        literal
            .children
            .iter()
            .try_for_each(|child| self.compose_into(child, doc, &child_base))
    }

    fn transform(&mut self, transform: &Transform, doc: &mut Value, base: &DotPath) -> Result<(), WeaveError> {
        let mut scratch = get(doc, base)
            .filter(|existing| !existing.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        for child in &transform.children {
            self.compose_into(child, &mut scratch, &DotPath::root())?;
        }
        let mut merged = scratch.clone();
        merge_value(&mut merged, (transform.apply)(scratch));
        trace!(path = %base, "merging transform result");
        merge_at(doc, base, merged)
    }

    fn render(&mut self, component: &ComponentNode) -> Option<Node> {
        let name = component.0.name();
        let mut scope = Scope::new(name, &mut self.state);
        match component.0.render(&mut scope) {
            Ok(node) => Some(node),
            Err(_) => {
                self.suspended += 1;
                debug!(component = name, "component suspended");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use super::Composer;
    use crate::node::{Element, Literal, Node, Transform};
    use crate::path::DotPath;
    use crate::relation::{RelationEntry, RelationTable};
    use crate::WeaveError;

    fn path(text: &str) -> DotPath {
        DotPath::parse(text).expect("valid path")
    }

    #[fixture]
    fn table() -> RelationTable {
        RelationTable::builder()
            .relation(RelationEntry::new("EnvVar", "Container", path("env")).array())
            .build()
            .expect("table builds")
    }

    fn compose_one(table: &RelationTable, node: impl Into<Node>) -> Value {
        let mut documents = Composer::new(table)
            .compose(&Node::root([node.into()]))
            .expect("composes");
        assert_eq!(documents.len(), 1);
        documents.remove(0)
    }

    #[rstest]
    fn array_literal_children_target_the_appended_item(table: RelationTable) {
        let node = Element::new("Container").child(
            Literal::item(path("ports"), json!({"containerPort": 80}))
                .child(Literal::field(path("protocol"), "TCP")),
        );
        let doc = compose_one(&table, node);
        assert_eq!(doc, json!({"ports": [{"containerPort": 80, "protocol": "TCP"}]}));
    }

    #[rstest]
    fn open_literal_gives_elements_a_base(table: RelationTable) {
        let node = Element::new("Container").child(
            Literal::open(path("sidecar")).child(Element::new("EnvVar").prop("name", "A")),
        );
        let doc = compose_one(&table, node);
        assert_eq!(doc, json!({"sidecar": {"env": [{"name": "A"}]}}));
    }

    #[rstest]
    fn null_literal_is_written(table: RelationTable) {
        let doc = compose_one(&table, Element::new("Container").child(Literal::field(path("x"), Value::Null)));
        assert_eq!(doc, json!({"x": null}));
    }

    #[rstest]
    fn null_literal_blocks_later_children(table: RelationTable) {
        let node = Element::new("Container").child(
            Literal::field(path("sidecar"), Value::Null)
                .child(Element::new("EnvVar").prop("name", "A")),
        );
        let err = Composer::new(&table)
            .compose(&Node::root([Node::from(node)]))
            .expect_err("null field is occupied");
        assert!(
            matches!(&*err, WeaveError::PathCollision { path } if path.to_string() == "sidecar"),
            "{err}"
        );
    }

    #[rstest]
    fn transform_sees_existing_fields_and_merges_back(table: RelationTable) {
        let node = Element::new("Container")
            .prop("name", "app")
            .child(
                Transform::new(|mut value| {
                    value["name"] = json!("renamed");
                    value["extra"] = json!(true);
                    value
                })
                .child(Element::new("EnvVar").prop("name", "A")),
            );
        let doc = compose_one(&table, node);
        assert_eq!(
            doc,
            json!({"name": "renamed", "env": [{"name": "A"}], "extra": true})
        );
    }

    #[rstest]
    fn bare_top_level_node_yields_one_document(table: RelationTable) {
        let documents = Composer::new(&table)
            .compose(&Node::from(Literal::field(path("a.b"), 1)))
            .expect("composes");
        assert_eq!(documents, vec![json!({"a": {"b": 1}})]);
    }
}
