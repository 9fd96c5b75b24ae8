//! Rendering composed documents and decomposed trees as text.
//!
//! Documents are emitted as a YAML stream or a JSON array. Decomposed trees
//! are emitted as Rust source that rebuilds them with this crate's node
//! builders, importing a constant per referenced type from the module the
//! registry records for it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use heck::{ToShoutySnakeCase, ToSnakeCase};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decompose::Decomposition;
use crate::node::{Element, Literal, Node};
use crate::path::{DotPath, Segment};
use crate::registry::TypeRegistry;
use crate::relation::TypeId;
use crate::{WeaveResult, WeaveResultExt};

/// Text format for composed documents.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-document YAML stream.
    #[default]
    Yaml,
    /// Pretty-printed JSON array.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}'; expected yaml or json")),
        }
    }
}

/// Render `documents` as a YAML stream separated by `---`.
///
/// # Errors
///
/// Returns [`WeaveError::Yaml`](crate::WeaveError::Yaml) when a document cannot be encoded.
pub fn to_yaml(documents: &[Value]) -> WeaveResult<String> {
    let mut out = String::new();
    for (i, document) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&serde_yaml::to_string(document).into_weave()?);
    }
    Ok(out)
}

/// Render `documents` as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`WeaveError::Json`](crate::WeaveError::Json) when encoding fails.
pub fn to_json(documents: &[Value]) -> WeaveResult<String> {
    let mut out = serde_json::to_string_pretty(documents).into_weave()?;
    out.push('\n');
    Ok(out)
}

/// Render `documents` in `format`.
///
/// # Errors
///
/// Propagates encoder failures.
pub fn emit(documents: &[Value], format: OutputFormat) -> WeaveResult<String> {
    match format {
        OutputFormat::Yaml => to_yaml(documents),
        OutputFormat::Json => to_json(documents),
    }
}

/// Split a YAML stream into documents, skipping empty ones.
///
/// JSON input is accepted too, being a subset of YAML.
///
/// # Errors
///
/// Returns [`WeaveError::Yaml`](crate::WeaveError::Yaml) for malformed input.
pub fn parse_documents(text: &str) -> WeaveResult<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document).into_weave()?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Options for [`render_source`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceOptions {
    /// Path prefix of the modules holding type constants.
    pub module_root: String,
    /// Name of the generated function.
    pub function_name: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            module_root: String::from("crate::imports"),
            function_name: String::from("build"),
        }
    }
}

impl SourceOptions {
    /// Use a function name derived from `stem`, e.g. a manifest file name.
    #[must_use]
    pub fn with_function_for(mut self, stem: &str) -> Self {
        let name = stem.to_snake_case();
        self.function_name = if name.is_empty() {
            String::from("build")
        } else if name.starts_with(|c: char| c.is_ascii_digit()) {
            format!("build_{name}")
        } else {
            name
        };
        self
    }
}

/// Render Rust source rebuilding every decomposed document.
///
/// The generated function returns a [`Node::Root`] with one child per
/// decomposition. Types whose module is known are referenced through a
/// SCREAMING_SNAKE constant imported from `module_root::module`; others are
/// written as string literals.
#[must_use]
pub fn render_source(
    decompositions: &[Decomposition],
    registry: &TypeRegistry,
    options: &SourceOptions,
) -> String {
    let type_refs: BTreeSet<&TypeId> = decompositions
        .iter()
        .flat_map(|d| d.type_refs.iter())
        .collect();
    let names = TypeNames::new(type_refs, registry);

    let mut body = String::new();
    for decomposition in decompositions {
        body.push_str("        ");
        render_element(&mut body, &decomposition.root, &names, 2);
        body.push_str(",\n");
    }

    let mut out = String::from("// Generated by `docweave import`.\n\n");
    if body.contains("Literal::") {
        out.push_str("use docweave::path::DotPath;\n");
        out.push_str("use docweave::{Element, Literal, Node};\n");
    } else {
        out.push_str("use docweave::{Element, Node};\n");
    }
    if body.contains("json!(") {
        out.push_str("use serde_json::json;\n");
    }
    for (module, constants) in &names.imports {
        let list: Vec<&str> = constants.iter().map(String::as_str).collect();
        let imported = match list.as_slice() {
            [single] => (*single).to_owned(),
            _ => format!("{{{}}}", list.join(", ")),
        };
        out.push_str(&format!("use {}::{module}::{imported};\n", options.module_root));
    }
    out.push_str(&format!(
        "\n#[must_use]\npub fn {}() -> Node {{\n    Node::root([\n{body}    ])\n}}\n",
        options.function_name
    ));
    out
}

/// Source expression for each referenced type, plus the imports it needs.
struct TypeNames {
    exprs: HashMap<TypeId, String>,
    imports: BTreeMap<String, BTreeSet<String>>,
}

impl TypeNames {
    fn new(type_refs: BTreeSet<&TypeId>, registry: &TypeRegistry) -> Self {
        let mut exprs = HashMap::new();
        let mut imports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut taken = BTreeSet::new();
        for ty in type_refs {
            let constant = ty.short_name().to_shouty_snake_case();
            let expr = match registry.module_of(ty) {
                Some(module) if !constant.is_empty() && taken.insert(constant.clone()) => {
                    imports.entry(module.to_owned()).or_default().insert(constant.clone());
                    constant
                }
                _ => format!("{:?}", ty.as_str()),
            };
            exprs.insert(ty.clone(), expr);
        }
        Self { exprs, imports }
    }

    fn expr(&self, ty: &TypeId) -> String {
        self.exprs
            .get(ty)
            .cloned()
            .unwrap_or_else(|| format!("{:?}", ty.as_str()))
    }
}

fn render_element(out: &mut String, element: &Element, names: &TypeNames, depth: usize) {
    let pad = "    ".repeat(depth + 1);
    if element.is_passthrough() {
        out.push_str("Element::passthrough(json!(");
        render_json(out, &Value::Object(element.props.clone()));
        out.push_str("))");
        return;
    }
    out.push_str(&format!("Element::new({})", names.expr(&element.type_id)));
    if let Some(tag) = &element.discriminator {
        out.push_str(&format!("\n{pad}.discriminator({tag:?})"));
    }
    for (key, value) in &element.props {
        out.push_str(&format!("\n{pad}.prop({key:?}, json!("));
        render_json(out, value);
        out.push_str("))");
    }
    render_children(out, &element.children, names, depth);
}

fn render_children(out: &mut String, children: &[Node], names: &TypeNames, depth: usize) {
    let pad = "    ".repeat(depth + 1);
    for node in children {
        match node {
            Node::Element(child) => {
                out.push_str(&format!("\n{pad}.child(\n{pad}    "));
                render_element(out, child, names, depth + 2);
                out.push_str(&format!(",\n{pad})"));
            }
            Node::Literal(literal) => {
                out.push_str(&format!("\n{pad}.child(\n{pad}    "));
                render_literal(out, literal, names, depth + 2);
                out.push_str(&format!(",\n{pad})"));
            }
            Node::Root(_) | Node::Transform(_) | Node::Component(_) => {}
        }
    }
}

fn render_literal(out: &mut String, literal: &Literal, names: &TypeNames, depth: usize) {
    let path = render_path(&literal.path);
    match (&literal.value, literal.array_item) {
        (Some(value), true) => {
            out.push_str(&format!("Literal::item({path}, json!("));
            render_json(out, value);
            out.push_str("))");
        }
        (Some(value), false) => {
            out.push_str(&format!("Literal::field({path}, json!("));
            render_json(out, value);
            out.push_str("))");
        }
        (None, true) => out.push_str(&format!("Literal::item({path}, json!({{}}))")),
        (None, false) => out.push_str(&format!("Literal::open({path})")),
    }
    render_children(out, &literal.children, names, depth);
}

/// Source expression building `path`.
fn render_path(path: &DotPath) -> String {
    let segments = path.segments();
    let keys: Vec<String> = segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Key(key) => Some(format!("{key:?}")),
            Segment::Index(_) => None,
        })
        .collect();
    if keys.len() == segments.len() {
        return format!("DotPath::keys([{}])", keys.join(", "));
    }
    let mut expr = String::from("DotPath::root()");
    for segment in segments {
        match segment {
            Segment::Key(key) => expr.push_str(&format!(".child_key({key:?})")),
            Segment::Index(index) => expr.push_str(&format!(".child_index({index})")),
        }
    }
    expr
}

/// Write `value` in `json!` macro syntax with Rust string escapes.
fn render_json(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Number(number) => out.push_str(&number.to_string()),
        Value::String(text) => out.push_str(&format!("{text:?}")),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_json(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format!("{key:?}: "));
                render_json(out, item);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::{OutputFormat, SourceOptions, parse_documents, render_path, to_json, to_yaml};
    use crate::path::DotPath;

    #[rstest]
    fn yaml_stream_separates_documents() {
        let text = to_yaml(&[json!({"a": 1}), json!({"b": [1, 2]})]).expect("encodes");
        assert_eq!(text, "a: 1\n---\nb:\n- 1\n- 2\n");
    }

    #[rstest]
    fn json_output_is_an_array() {
        let text = to_json(&[json!({"a": 1})]).expect("encodes");
        let parsed: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed, json!([{"a": 1}]));
    }

    #[rstest]
    fn parse_skips_empty_documents() {
        let documents = parse_documents("---\nkind: A\n---\n---\nkind: B\n").expect("parses");
        assert_eq!(documents, vec![json!({"kind": "A"}), json!({"kind": "B"})]);
    }

    #[rstest]
    #[case("yaml", OutputFormat::Yaml)]
    #[case("YML", OutputFormat::Yaml)]
    #[case("json", OutputFormat::Json)]
    fn output_format_parses(#[case] text: &str, #[case] expected: OutputFormat) {
        assert_eq!(text.parse::<OutputFormat>(), Ok(expected));
    }

    #[rstest]
    #[case("web-deployment", "web_deployment")]
    #[case("01-app", "build_01_app")]
    fn function_name_follows_file_stem(#[case] stem: &str, #[case] expected: &str) {
        assert_eq!(SourceOptions::default().with_function_for(stem).function_name, expected);
    }

    #[rstest]
    fn literal_paths_render_as_constructors() {
        assert_eq!(render_path(&DotPath::keys(["@raw"])), "DotPath::keys([\"@raw\"])");
        let mixed = DotPath::keys(["ports"]).child_index(0).child_key("name");
        assert_eq!(
            render_path(&mixed),
            "DotPath::root().child_key(\"ports\").child_index(0).child_key(\"name\")"
        );
    }
}
