//! Schema catalog: the data a relation table and type registry are built from.
//!
//! A catalog lists node types and the relations between them. It is usually
//! generated from a third-party schema and stored as JSON, YAML or TOML:
//!
//! ```yaml
//! types:
//!   - id: k8s.Deployment
//!     apiVersion: apps/v1
//!     kind: Deployment
//!     module: k8s::apps
//!     hoistMetadata: true
//! relations:
//!   - child: k8s.Container
//!     parent: k8s.Deployment
//!     path: spec.template.spec.containers
//!     array: true
//! ```

use std::sync::Arc;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::path::DotPath;
use crate::registry::TypeRegistry;
use crate::relation::{RelationEntry, RelationTable, TypeId, TypeShape};
use crate::result_ext::FileResultExt;
use crate::{WeaveResult, WeaveResultExt};

/// Serialisation formats a catalog can be read from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CatalogFormat {
    /// `.json`
    Json,
    /// `.yaml` or `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl CatalogFormat {
    /// Pick a format from the extension of `path`, ignoring case.
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        let ext = path.extension().map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Declaration of one node type.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeDecl {
    /// Unique type identifier.
    pub id: TypeId,
    /// `apiVersion` of top-level documents of this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// `kind` of top-level documents of this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Source module that defines the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Hoist marker-prefixed properties into `metadata`.
    #[serde(default)]
    pub hoist_metadata: bool,
    /// Property unwrapped into the element's value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_key: Option<String>,
}

/// Declaration of one relation entry.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationDecl {
    /// Type being placed.
    pub child: TypeId,
    /// Type receiving the child.
    pub parent: TypeId,
    /// Path relative to the parent's value.
    pub path: DotPath,
    /// Append instances to an array.
    #[serde(default)]
    pub array: bool,
    /// Tag selecting this entry among several for the same pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
}

/// Types and relations as stored on disk.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Declared types.
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    /// Declared relations, in priority order for decomposition.
    #[serde(default)]
    pub relations: Vec<RelationDecl>,
}

/// Compiled catalog shared by composition and decomposition.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    /// Placement rules.
    pub relations: RelationTable,
    /// Document identification and module lookup.
    pub registry: TypeRegistry,
}

impl Catalog {
    /// Parse a catalog from `text`.
    ///
    /// # Errors
    ///
    /// Returns the parser's error when `text` is not a valid catalog.
    pub fn parse(format: CatalogFormat, text: &str) -> WeaveResult<Self> {
        match format {
            CatalogFormat::Json => serde_json::from_str(text).into_weave(),
            CatalogFormat::Yaml => serde_yaml::from_str(text).into_weave(),
            CatalogFormat::Toml => toml::from_str(text).into_weave(),
        }
    }

    /// Read and parse the catalog at `path`, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::File`](crate::WeaveError::File) when the file cannot be read, has an
    /// unsupported extension or fails to parse.
    pub fn load(path: &Utf8Path) -> WeaveResult<Self> {
        let format = CatalogFormat::from_path(path)
            .ok_or_else(|| std::io::Error::other("unsupported catalog extension; expected json, yaml, yml or toml"))
            .for_file(path)?;
        let text = std::fs::read_to_string(path).for_file(path)?;
        let catalog: Self = match format {
            CatalogFormat::Json => serde_json::from_str(&text).for_file(path),
            CatalogFormat::Yaml => serde_yaml::from_str(&text).for_file(path),
            CatalogFormat::Toml => toml::from_str(&text).for_file(path),
        }?;
        debug!(
            %path,
            types = catalog.types.len(),
            relations = catalog.relations.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Compile the catalog into a relation table and type registry.
    ///
    /// A type declaring only one of `apiVersion` and `kind` is not
    /// registered for document identification.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::DuplicateRelation`](crate::WeaveError::DuplicateRelation) when the relations violate
    /// the uniqueness rules.
    pub fn compile(&self) -> WeaveResult<Schema> {
        let mut builder = RelationTable::builder();
        let mut registry = TypeRegistry::new();
        for decl in &self.types {
            builder = builder.shape(
                &decl.id,
                TypeShape {
                    hoist_metadata: decl.hoist_metadata,
                    spec_key: decl.spec_key.clone(),
                },
            );
            if let Some(module) = &decl.module {
                registry.set_module(&decl.id, module.clone());
            }
            if let (Some(api_version), Some(kind)) = (&decl.api_version, &decl.kind) {
                if let Some(previous) = registry.register(api_version.clone(), kind.clone(), &decl.id) {
                    warn!(%api_version, %kind, replaced = %previous, by = %decl.id, "document type registered twice");
                }
            }
        }
        for decl in &self.relations {
            let mut entry = RelationEntry::new(&decl.child, &decl.parent, decl.path.clone());
            entry.is_array = decl.array;
            entry.discriminator.clone_from(&decl.discriminator);
            builder = builder.relation(entry);
        }
        let relations = builder.build().map_err(Arc::new)?;
        debug!(entries = relations.len(), types = registry.len(), "catalog compiled");
        Ok(Schema { relations, registry })
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use rstest::rstest;

    use super::{Catalog, CatalogFormat};
    use crate::relation::TypeId;
    use crate::WeaveError;

    const YAML: &str = "
types:
  - id: Deployment
    apiVersion: apps/v1
    kind: Deployment
    module: k8s::apps
    hoistMetadata: true
  - id: Container
relations:
  - child: Container
    parent: Deployment
    path: spec.template.spec.containers
    array: true
";

    const TOML: &str = r#"
[[types]]
id = "Deployment"
apiVersion = "apps/v1"
kind = "Deployment"

[[relations]]
child = "Container"
parent = "Deployment"
path = "spec.template.spec.containers"
array = true
"#;

    #[rstest]
    #[case("catalog.json", Some(CatalogFormat::Json))]
    #[case("catalog.YML", Some(CatalogFormat::Yaml))]
    #[case("catalog.toml", Some(CatalogFormat::Toml))]
    #[case("catalog.txt", None)]
    fn format_follows_extension(#[case] path: &str, #[case] expected: Option<CatalogFormat>) {
        assert_eq!(CatalogFormat::from_path(Utf8Path::new(path)), expected);
    }

    #[rstest]
    #[case(CatalogFormat::Yaml, YAML)]
    #[case(CatalogFormat::Toml, TOML)]
    fn compiles_into_table_and_registry(#[case] format: CatalogFormat, #[case] text: &str) {
        let schema = Catalog::parse(format, text)
            .expect("catalog parses")
            .compile()
            .expect("catalog compiles");
        let deployment = TypeId::new("Deployment");
        let entry = schema
            .relations
            .resolve(&deployment, &TypeId::new("Container"), None)
            .expect("container resolves");
        assert!(entry.is_array);
        assert_eq!(schema.registry.lookup("apps/v1", "Deployment"), Some(&deployment));
    }

    #[rstest]
    fn type_declarations_carry_shapes() {
        let schema = Catalog::parse(CatalogFormat::Yaml, YAML)
            .expect("catalog parses")
            .compile()
            .expect("catalog compiles");
        let deployment = TypeId::new("Deployment");
        assert!(schema.relations.shape(&deployment).hoist_metadata);
        assert_eq!(schema.registry.module_of(&deployment), Some("k8s::apps"));
    }

    #[rstest]
    fn unknown_fields_are_rejected() {
        let err = Catalog::parse(CatalogFormat::Json, r#"{"types": [], "extra": 1}"#)
            .expect_err("unknown field");
        assert!(matches!(&*err, WeaveError::Json(_)));
    }

    #[rstest]
    fn duplicate_relations_fail_compilation() {
        let text = r#"{"relations": [
            {"child": "C", "parent": "P", "path": "a"},
            {"child": "C", "parent": "P", "path": "b"}
        ]}"#;
        let err = Catalog::parse(CatalogFormat::Json, text)
            .expect("catalog parses")
            .compile()
            .expect_err("duplicate");
        assert!(matches!(&*err, WeaveError::DuplicateRelation { .. }));
    }

    #[rstest]
    fn load_reads_files_by_extension() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("catalog.yaml"))
            .map_err(|p| anyhow::anyhow!("non UTF-8 path: {}", p.display()))?;
        std::fs::write(&path, YAML)?;
        let catalog = Catalog::load(&path).map_err(|e| anyhow::anyhow!("{e}"))?;
        assert_eq!(catalog.types.len(), 2);

        let err = Catalog::load(&path.with_extension("ini")).expect_err("unsupported");
        assert!(matches!(&*err, WeaveError::File { .. }));
        Ok(())
    }
}
