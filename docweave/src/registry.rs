//! Lookup from a document's identifying fields to its type.

use std::collections::HashMap;

use serde_json::Value;

use crate::relation::TypeId;
use crate::WeaveError;

/// Document field holding the API group and version.
pub const API_VERSION_FIELD: &str = "apiVersion";
/// Document field holding the type name within its API version.
pub const KIND_FIELD: &str = "kind";

/// Maps `(apiVersion, kind)` pairs to types, and types to source modules.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    by_identity: HashMap<(String, String), TypeId>,
    modules: HashMap<TypeId, String>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty` as the type of documents identified by the pair.
    ///
    /// Returns the type previously registered for the pair, if any.
    pub fn register(
        &mut self,
        api_version: impl Into<String>,
        kind: impl Into<String>,
        ty: impl Into<TypeId>,
    ) -> Option<TypeId> {
        self.by_identity
            .insert((api_version.into(), kind.into()), ty.into())
    }

    /// Record the source module that defines `ty`.
    pub fn set_module(&mut self, ty: impl Into<TypeId>, module: impl Into<String>) {
        self.modules.insert(ty.into(), module.into());
    }

    /// Type registered for the pair.
    #[must_use]
    pub fn lookup(&self, api_version: &str, kind: &str) -> Option<&TypeId> {
        self.by_identity
            .get(&(api_version.to_owned(), kind.to_owned()))
    }

    /// Module recorded for `ty`.
    #[must_use]
    pub fn module_of(&self, ty: &TypeId) -> Option<&str> {
        self.modules.get(ty).map(String::as_str)
    }

    /// Identify the type of `document` from its `apiVersion` and `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::UnrecognizedDocumentType`] when either field is
    /// missing or the pair is unregistered. Missing fields are reported as
    /// empty strings.
    pub fn identify(&self, document: &Value) -> Result<&TypeId, WeaveError> {
        let field = |name: &str| {
            document
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let api_version = field(API_VERSION_FIELD);
        let kind = field(KIND_FIELD);
        self.lookup(&api_version, &kind)
            .ok_or(WeaveError::UnrecognizedDocumentType { api_version, kind })
    }

    /// Number of registered pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::TypeRegistry;
    use crate::relation::TypeId;
    use crate::WeaveError;

    #[rstest]
    fn identifies_registered_documents() {
        let mut registry = TypeRegistry::new();
        assert!(registry.register("apps/v1", "Deployment", "k8s.Deployment").is_none());
        registry.set_module("k8s.Deployment", "k8s::apps");
        let ty = registry
            .identify(&json!({"apiVersion": "apps/v1", "kind": "Deployment"}))
            .expect("known type");
        assert_eq!(ty, &TypeId::new("k8s.Deployment"));
        assert_eq!(registry.module_of(ty), Some("k8s::apps"));
    }

    #[rstest]
    #[case(json!({"apiVersion": "v1", "kind": "Mystery"}), "v1", "Mystery")]
    #[case(json!({"kind": "Pod"}), "", "Pod")]
    #[case(json!(42), "", "")]
    fn unknown_documents_are_reported(
        #[case] document: serde_json::Value,
        #[case] api: &str,
        #[case] kind: &str,
    ) {
        let registry = TypeRegistry::new();
        let err = registry.identify(&document).expect_err("unknown");
        assert!(matches!(
            err,
            WeaveError::UnrecognizedDocumentType { ref api_version, kind: ref k }
                if api_version == api && k == kind
        ));
    }
}
