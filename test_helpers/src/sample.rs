//! Sample catalog and manifests modelled on a small slice of Kubernetes.
//!
//! The catalog covers every relation shape the core supports: array and
//! single placements, discriminated placements sharing a pair, metadata
//! hoisting and a spec key.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use docweave::{Catalog, Schema};
use serde_json::json;

/// Catalog used by tests across the workspace.
pub static SAMPLE_CATALOG: LazyLock<serde_json::Value> = LazyLock::new(|| {
    json!({
        "types": [
            {"id": "k8s.Deployment", "apiVersion": "apps/v1", "kind": "Deployment", "module": "k8s::apps", "hoistMetadata": true},
            {"id": "k8s.Service", "apiVersion": "v1", "kind": "Service", "module": "k8s::core", "hoistMetadata": true},
            {"id": "k8s.ConfigMap", "apiVersion": "v1", "kind": "ConfigMap", "module": "k8s::core", "hoistMetadata": true},
            {"id": "k8s.Container", "module": "k8s::core"},
            {"id": "k8s.ContainerPort", "module": "k8s::core"},
            {"id": "k8s.EnvVar", "module": "k8s::core"},
            {"id": "k8s.Probe", "module": "k8s::core"},
            {"id": "k8s.Volume", "module": "k8s::core"},
            {"id": "k8s.ServicePort", "module": "k8s::core"},
            {"id": "example.Widget", "apiVersion": "example.dev/v1", "kind": "Widget", "module": "example", "hoistMetadata": true, "specKey": "spec"},
            {"id": "example.Gadget", "module": "example"}
        ],
        "relations": [
            {"child": "k8s.Container", "parent": "k8s.Deployment", "path": "spec.template.spec.containers", "array": true},
            {"child": "k8s.Container", "parent": "k8s.Deployment", "path": "spec.template.spec.initContainers", "array": true, "discriminator": "init"},
            {"child": "k8s.Volume", "parent": "k8s.Deployment", "path": "spec.template.spec.volumes", "array": true},
            {"child": "k8s.ContainerPort", "parent": "k8s.Container", "path": "ports", "array": true},
            {"child": "k8s.EnvVar", "parent": "k8s.Container", "path": "env", "array": true},
            {"child": "k8s.Probe", "parent": "k8s.Container", "path": "livenessProbe", "discriminator": "liveness"},
            {"child": "k8s.Probe", "parent": "k8s.Container", "path": "readinessProbe", "discriminator": "readiness"},
            {"child": "k8s.ServicePort", "parent": "k8s.Service", "path": "spec.ports", "array": true},
            {"child": "example.Gadget", "parent": "example.Widget", "path": "parts", "array": true}
        ]
    })
});

/// Two known documents followed by one of an unknown type.
pub const SAMPLE_MANIFEST: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  labels:
    app: web
spec:
  replicas: 2
  template:
    spec:
      initContainers:
        - name: migrate
          image: web:1.0
      containers:
        - name: web
          image: web:1.0
          ports:
            - containerPort: 8080
          livenessProbe:
            path: /healthz
---
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  type: ClusterIP
  ports:
    - port: 80
      targetPort: 8080
---
apiVersion: batch/v1
kind: CronJob
metadata:
  name: nightly
";

/// Parse [`SAMPLE_CATALOG`].
///
/// # Errors
///
/// Returns an error if the sample no longer matches the catalog format.
pub fn catalog() -> Result<Catalog> {
    serde_json::from_value(SAMPLE_CATALOG.clone()).context("parse sample catalog")
}

/// Compile [`SAMPLE_CATALOG`].
///
/// # Errors
///
/// Returns an error if the sample does not compile.
pub fn schema() -> Result<Schema> {
    catalog()?
        .compile()
        .map_err(|err| anyhow::anyhow!("compile sample catalog: {err}"))
}

/// Serialise [`SAMPLE_CATALOG`] as pretty JSON, for writing to disk.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn catalog_json() -> Result<String> {
    serde_json::to_string_pretty(&*SAMPLE_CATALOG).context("serialise sample catalog")
}
