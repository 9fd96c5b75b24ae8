//! Schema-driven composition and decomposition of structured documents.
//!
//! `docweave` turns a declarative tree of typed elements into finished
//! documents (nested maps and arrays such as infrastructure manifests), and
//! turns finished documents back into equivalent trees. Both directions are
//! driven by one [`RelationTable`] recording where each node type may appear
//! inside every other type.
//!
//! - [`Composer`] evaluates a tree in a single synchronous pass.
//! - [`Scheduler`] repeats passes until components waiting on
//!   [`Deferred`](schedule::Deferred) values settle, then checks deferred
//!   assertions as a batch.
//! - [`Decomposer`] walks a document and the same table in reverse.
//! - [`catalog`] loads the table from a JSON, YAML or TOML catalog, and
//!   [`serialize`] renders documents and generated source.
//!
//! ```
//! use docweave::{Composer, Decomposer, Element, Node, RelationEntry, RelationTable, TypeId};
//! use docweave::path::DotPath;
//! use serde_json::json;
//!
//! let table = RelationTable::builder()
//!     .relation(
//!         RelationEntry::new("Container", "Deployment", DotPath::parse("spec.template.spec.containers")?)
//!             .array(),
//!     )
//!     .build()?;
//!
//! let tree = Node::root([Element::new("Deployment")
//!     .prop("name", "nginx")
//!     .child(Element::new("Container").prop("name", "nginx").prop("image", "nginx:1.14"))]);
//! let documents = Composer::new(&table).compose(&tree)?;
//! assert_eq!(
//!     documents[0],
//!     json!({"name": "nginx", "spec": {"template": {"spec": {"containers": [
//!         {"name": "nginx", "image": "nginx:1.14"}
//!     ]}}}})
//! );
//!
//! let decomposition = Decomposer::new(&table).decompose(&documents[0], &TypeId::new("Deployment"));
//! let again = Composer::new(&table).compose(&Node::root([decomposition.tree()]))?;
//! assert_eq!(again, documents);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod compose;
pub mod config;
pub mod decompose;
pub mod document;
mod error;
pub mod node;
pub mod path;
pub mod registry;
pub mod relation;
mod result_ext;
pub mod schedule;
pub mod serialize;
pub mod shape;

pub use catalog::{Catalog, Schema};
pub use compose::{ComposeOptions, Composer};
pub use config::WeaveConfig;
pub use decompose::{DecomposeOptions, Decomposer, Decomposition};
pub use error::{AggregatedErrors, Arity, ParentChain, WeaveError};
pub use node::{Component, Element, Literal, Node, NodeSpec, Transform};
pub use registry::TypeRegistry;
pub use relation::{DEFAULT_DISCRIMINATOR, RelationEntry, RelationTable, TypeId, TypeShape};
pub use result_ext::{FileResultExt, WeaveResult, WeaveResultExt};
pub use schedule::{Deferred, Resolver, Scheduler, Scope, Suspended, deferred};
