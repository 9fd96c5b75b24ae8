//! End-to-end runs of the `docweave` commands against the sample catalog.
#![allow(
    unfulfilled_lint_expectations,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
#![expect(
    clippy::expect_used,
    reason = "tests panic to surface composition mistakes"
)]

use anyhow::{Result, anyhow};
use camino::Utf8PathBuf;
use clap::Parser;
use docweave_cli::cli::Args;
use docweave_cli::error::CliError;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;
use test_helpers::figment::{jail_error, with_jail};
use test_helpers::sample;

struct Workspace {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn write(&self, name: &str, content: &str) -> Result<Utf8PathBuf> {
        let path = self.root.join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

#[fixture]
fn workspace() -> Workspace {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8 temp dir");
    let workspace = Workspace { _temp: temp, root };
    workspace
        .write("catalog.json", &sample::catalog_json().expect("sample catalog serialises"))
        .expect("write catalog");
    workspace
}

fn run(args: &[&str]) -> Result<String, CliError> {
    let parsed = Args::try_parse_from(std::iter::once("docweave").chain(args.iter().copied()))
        .unwrap_or_else(|err| panic!("arguments parse: {err}"));
    let mut out = Vec::new();
    docweave_cli::run(&parsed, &mut out)?;
    Ok(String::from_utf8(out).unwrap_or_else(|err| panic!("UTF-8 output: {err}")))
}

#[rstest]
fn import_writes_generated_source(workspace: Workspace) -> Result<()> {
    let manifest = workspace.write("web-app.yaml", sample::SAMPLE_MANIFEST)?;
    let out_dir = workspace.root.join("generated");
    let catalog = workspace.root.join("catalog.json");
    let printed = run(&[
        "import",
        manifest.as_str(),
        "--catalog",
        catalog.as_str(),
        "--out-dir",
        out_dir.as_str(),
        "--module-root",
        "crate::k8s_types",
    ])?;
    let written = out_dir.join("web_app.rs");
    assert_eq!(printed.trim_end(), written.as_str());
    let source = std::fs::read_to_string(&written)?;
    assert!(source.contains("pub fn web_app() -> Node {"), "{source}");
    assert!(source.contains("use crate::k8s_types::k8s::apps::DEPLOYMENT;"), "{source}");
    assert!(source.contains("Element::passthrough("), "{source}");
    Ok(())
}

#[rstest]
fn explicit_function_name_names_function_and_file(workspace: Workspace) -> Result<()> {
    let manifest = workspace.write("web.yaml", sample::SAMPLE_MANIFEST)?;
    let out_dir = workspace.root.join("generated");
    let catalog = workspace.root.join("catalog.json");
    run(&[
        "import",
        manifest.as_str(),
        "--function",
        "manifests",
        "--catalog",
        catalog.as_str(),
        "--out-dir",
        out_dir.as_str(),
    ])?;
    assert!(!out_dir.join("web.rs").exists());
    let source = std::fs::read_to_string(out_dir.join("manifests.rs"))?;
    assert!(source.contains("pub fn manifests() -> Node {"), "{source}");
    Ok(())
}

#[rstest]
fn empty_manifest_is_rejected(workspace: Workspace) -> Result<()> {
    let manifest = workspace.write("empty.yaml", "---\n")?;
    let catalog = workspace.root.join("catalog.json");
    let err = run(&["import", manifest.as_str(), "--catalog", catalog.as_str()]).expect_err("empty");
    assert!(matches!(err, CliError::EmptyInput(_)), "{err}");
    Ok(())
}

#[rstest]
fn relations_lists_entries_in_declaration_order(workspace: Workspace) -> Result<()> {
    let catalog = workspace.root.join("catalog.json");
    let printed = run(&["relations", "k8s.Container", "--catalog", catalog.as_str()])?;
    assert_eq!(
        printed,
        "k8s.ContainerPort\tports\tarray\t-\n\
         k8s.EnvVar\tenv\tarray\t-\n\
         k8s.Probe\tlivenessProbe\tsingle\tliveness\n\
         k8s.Probe\treadinessProbe\tsingle\treadiness\n"
    );
    Ok(())
}

#[rstest]
fn synth_composes_a_tree_file(workspace: Workspace) -> Result<()> {
    let tree = json!({
        "node": "root",
        "children": [{
            "node": "element",
            "type": "k8s.Service",
            "props": {"@name": "web", "apiVersion": "v1", "kind": "Service"},
            "children": [
                {"node": "element", "type": "k8s.ServicePort", "props": {"port": 80}},
                {"node": "literal", "path": "spec.type", "value": "ClusterIP"}
            ]
        }]
    });
    let tree_path = workspace.write("tree.json", &tree.to_string())?;
    let catalog = workspace.root.join("catalog.json");
    let printed = run(&[
        "synth",
        tree_path.as_str(),
        "--output",
        "json",
        "--catalog",
        catalog.as_str(),
    ])?;
    let documents: serde_json::Value = serde_json::from_str(&printed)?;
    assert_eq!(
        documents,
        json!([{
            "metadata": {"name": "web"},
            "apiVersion": "v1",
            "kind": "Service",
            "spec": {"ports": [{"port": 80}], "type": "ClusterIP"}
        }])
    );
    Ok(())
}

#[rstest]
fn synth_reports_placement_errors(workspace: Workspace) -> Result<()> {
    let tree = json!({
        "node": "element",
        "type": "k8s.Service",
        "children": [{"node": "element", "type": "k8s.Container"}]
    });
    let tree_path = workspace.write("bad.json", &tree.to_string())?;
    let catalog = workspace.root.join("catalog.json");
    let err = run(&["synth", tree_path.as_str(), "--catalog", catalog.as_str()]).expect_err("misplaced");
    assert!(err.to_string().contains("cannot be placed under 'k8s.Service'"), "{err}");
    Ok(())
}

#[rstest]
fn configuration_file_supplies_defaults() -> Result<()> {
    let printed = with_jail(|jail| {
        jail.create_file("catalog.json", &sample::catalog_json().map_err(|e| jail_error(&e))?)?;
        jail.create_file("docweave.toml", "catalog = \"catalog.json\"\n")?;
        run(&["relations", "k8s.Service"]).map_err(|e| jail_error(&e))
    })?;
    assert_eq!(printed, "k8s.ServicePort\tspec.ports\tarray\t-\n");
    Ok(())
}

#[rstest]
fn missing_catalog_is_reported() -> Result<()> {
    let outcome = with_jail(|_| Ok(run(&["relations", "k8s.Service"])))?;
    match outcome {
        Err(CliError::MissingCatalog) => Ok(()),
        other => Err(anyhow!("expected a missing catalog error, got {other:?}")),
    }
}
