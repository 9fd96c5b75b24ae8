//! Declarative node trees.
//!
//! A tree is built from four data nodes ([`Node::Root`], [`Element`],
//! [`Literal`], [`Transform`]) plus [`Component`]s: author-defined nodes that
//! render a subtree on every composition pass and may wait on deferred values
//! or register deferred assertions through their [`Scope`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::DotPath;
use crate::relation::TypeId;
use crate::schedule::{Scope, Suspended};

/// Type of elements that carry an unrecognised document verbatim.
pub const PASSTHROUGH_TYPE: &str = "docweave.Passthrough";

/// Function applied by a [`Transform`] to the value its children composed.
pub type TransformFn = dyn Fn(Value) -> Value + Send + Sync;

/// One node of a declarative tree.
#[derive(Clone, Debug)]
pub enum Node {
    /// Top of a tree; each child becomes an independent document.
    Root(Vec<Node>),
    /// Typed object placed through the relation table.
    Element(Element),
    /// Raw field assignment at a literal path.
    Literal(Literal),
    /// Subtree whose composed value is rewritten and merged back.
    Transform(Transform),
    /// Author-defined node rendered on every pass.
    Component(ComponentNode),
}

impl Node {
    /// Build a root from `children`.
    #[must_use]
    pub fn root<I>(children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Self>,
    {
        Self::Root(children.into_iter().map(Into::into).collect())
    }

    /// Wrap a component.
    #[must_use]
    pub fn component(component: impl Component + 'static) -> Self {
        Self::Component(ComponentNode(Arc::new(component)))
    }

    /// Wrap a rendering closure as a named component.
    #[must_use]
    pub fn from_fn<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&mut Scope<'_>) -> Result<Self, Suspended> + Send + Sync + 'static,
    {
        Self::component(FnComponent {
            name: name.into(),
            render,
        })
    }
}

/// Typed object instance.
#[derive(Clone, Debug)]
pub struct Element {
    /// Type used to resolve the element's placement.
    pub type_id: TypeId,
    /// Scalar properties before field shaping.
    pub props: Map<String, Value>,
    /// Tag selecting one of several placements under the parent.
    pub discriminator: Option<String>,
    /// Nested nodes composed into the element's value.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element without properties or children.
    #[must_use]
    pub fn new(type_id: impl Into<TypeId>) -> Self {
        Self {
            type_id: type_id.into(),
            props: Map::new(),
            discriminator: None,
            children: Vec::new(),
        }
    }

    /// Create an element that reproduces `document` verbatim.
    ///
    /// Non-object documents are stored under a `value` property.
    #[must_use]
    pub fn passthrough(document: Value) -> Self {
        let props = match document {
            Value::Object(map) => map,
            other => Map::from_iter([(String::from("value"), other)]),
        };
        Self::new(PASSTHROUGH_TYPE).props(props)
    }

    /// Returns `true` for elements created by [`Element::passthrough`].
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.type_id.as_str() == PASSTHROUGH_TYPE
    }

    /// Set one property.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Replace all properties.
    #[must_use]
    pub fn props(mut self, props: Map<String, Value>) -> Self {
        self.props = props;
        self
    }

    /// Select a placement by discriminator.
    #[must_use]
    pub fn discriminator(mut self, tag: impl Into<String>) -> Self {
        self.discriminator = Some(tag.into());
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several child nodes.
    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

/// Raw field assignment.
#[derive(Clone, Debug)]
pub struct Literal {
    /// Path relative to the current insertion base.
    pub path: DotPath,
    /// Value assigned or appended. `None` writes nothing for a field and
    /// appends an empty object for an array item; children still compose
    /// at the path.
    pub value: Option<Value>,
    /// Append to the array at `path` instead of assigning.
    pub array_item: bool,
    /// Nested nodes composed at `path` (or at the appended index).
    pub children: Vec<Node>,
}

impl Literal {
    /// Assign `value` at `path`. A `null` value occupies the field like any
    /// other.
    #[must_use]
    pub fn field(path: DotPath, value: impl Into<Value>) -> Self {
        Self {
            path,
            value: Some(value.into()),
            array_item: false,
            children: Vec::new(),
        }
    }

    /// Use `path` as the insertion base for children without assigning it.
    #[must_use]
    pub const fn open(path: DotPath) -> Self {
        Self {
            path,
            value: None,
            array_item: false,
            children: Vec::new(),
        }
    }

    /// Append `value` to the array at `path`.
    #[must_use]
    pub fn item(path: DotPath, value: impl Into<Value>) -> Self {
        Self {
            array_item: true,
            ..Self::field(path, value)
        }
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// Subtree rewritten by a function before being merged into its context.
#[derive(Clone)]
pub struct Transform {
    /// Function applied to the scratch value.
    pub apply: Arc<TransformFn>,
    /// Nodes composed into the scratch value.
    pub children: Vec<Node>,
}

impl Transform {
    /// Create a transform applying `apply`.
    #[must_use]
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            apply: Arc::new(apply),
            children: Vec::new(),
        }
    }

    /// Append a child node.
    #[must_use]
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Author-defined node rendered on every composition pass.
///
/// Rendering must be a pure function of the component's own state and the
/// values it reads through `scope`: a pass may be abandoned and rerun from
/// scratch any number of times.
pub trait Component: Send + Sync {
    /// Name reported in assertion failures and logs.
    fn name(&self) -> &str;

    /// Render the subtree for this pass.
    ///
    /// # Errors
    ///
    /// Returns [`Suspended`] when a deferred value read through `scope` is not
    /// yet available.
    fn render(&self, scope: &mut Scope<'_>) -> Result<Node, Suspended>;
}

/// Shared handle to a [`Component`].
#[derive(Clone)]
pub struct ComponentNode(pub Arc<dyn Component>);

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.0.name()).finish()
    }
}

struct FnComponent<F> {
    name: String,
    render: F,
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&mut Scope<'_>) -> Result<Node, Suspended> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, scope: &mut Scope<'_>) -> Result<Node, Suspended> {
        (self.render)(scope)
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

impl From<Literal> for Node {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<Transform> for Node {
    fn from(value: Transform) -> Self {
        Self::Transform(value)
    }
}

/// Serialisable subset of [`Node`] used to describe trees in data files.
///
/// Transforms and components carry code and have no data form.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum NodeSpec {
    /// See [`Node::Root`].
    Root {
        /// Independent documents.
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
    /// See [`Element`].
    Element {
        /// Element type.
        #[serde(rename = "type")]
        type_id: TypeId,
        /// Scalar properties.
        #[serde(default)]
        props: Map<String, Value>,
        /// Placement discriminator.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discriminator: Option<String>,
        /// Nested nodes.
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
    /// See [`Literal`].
    #[serde(rename_all = "camelCase")]
    Literal {
        /// Target path.
        path: DotPath,
        /// Assigned value; omit it to only open the path.
        #[serde(
            default,
            deserialize_with = "present_value",
            skip_serializing_if = "Option::is_none"
        )]
        value: Option<Value>,
        /// Append instead of assign.
        #[serde(default)]
        array_item: bool,
        /// Nested nodes.
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing field
/// becomes `None`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl From<NodeSpec> for Node {
    fn from(spec: NodeSpec) -> Self {
        match spec {
            NodeSpec::Root { children } => Self::root(children),
            NodeSpec::Element {
                type_id,
                props,
                discriminator,
                children,
            } => Self::Element(Element {
                type_id,
                props,
                discriminator,
                children: children.into_iter().map(Into::into).collect(),
            }),
            NodeSpec::Literal {
                path,
                value,
                array_item,
                children,
            } => Self::Literal(Literal {
                path,
                value,
                array_item,
                children: children.into_iter().map(Into::into).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::{Node, NodeSpec};

    #[rstest]
    fn node_spec_parses_nested_tree() {
        let spec: NodeSpec = serde_json::from_value(json!({
            "node": "root",
            "children": [{
                "node": "element",
                "type": "Deployment",
                "props": {"name": "web"},
                "children": [
                    {"node": "literal", "path": "spec.replicas", "value": 2},
                    {"node": "literal", "path": "spec.ports", "value": 80, "arrayItem": true}
                ]
            }]
        }))
        .expect("spec parses");
        let Node::Root(children) = Node::from(spec) else {
            panic!("expected root");
        };
        let [Node::Element(element)] = children.as_slice() else {
            panic!("expected one element");
        };
        assert_eq!(element.type_id.as_str(), "Deployment");
        assert_eq!(element.children.len(), 2);
        assert!(matches!(
            element.children.get(1),
            Some(Node::Literal(literal)) if literal.array_item
        ));
    }

    #[rstest]
    fn node_spec_tells_null_from_missing_values() {
        let spec: NodeSpec = serde_json::from_value(json!({
            "node": "element",
            "type": "Pod",
            "children": [
                {"node": "literal", "path": "nodeName", "value": null},
                {"node": "literal", "path": "spec"}
            ]
        }))
        .expect("spec parses");
        let Node::Element(element) = Node::from(spec) else {
            panic!("expected element");
        };
        let values: Vec<Option<serde_json::Value>> = element
            .children
            .iter()
            .filter_map(|child| match child {
                Node::Literal(literal) => Some(literal.value.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![Some(serde_json::Value::Null), None]);
    }
}
