//! Field shaping between author-facing properties and document fields.
//!
//! Two per-type rules apply:
//!
//! - metadata hoisting: properties prefixed with the marker are gathered into
//!   a nested `metadata` object;
//! - spec-key wrapping: the designated property, when it holds an object, is
//!   unwrapped so its fields become direct fields of the element's value.
//!
//! [`shape_props`] applies the rules while composing and [`unshape_fields`]
//! reverses them while decomposing.

use serde_json::{Map, Value};

use crate::path::DotPath;
use crate::relation::TypeShape;
use crate::WeaveError;

/// Marker prefixing properties that belong in `metadata`.
pub const DEFAULT_METADATA_MARKER: &str = "@";

const METADATA_KEY: &str = "metadata";

/// Turn author properties into the fields of an element's value.
///
/// # Errors
///
/// Returns [`WeaveError::PathCollision`] when two properties shape to the
/// same field.
pub fn shape_props(
    props: &Map<String, Value>,
    shape: &TypeShape,
    marker: &str,
) -> Result<Map<String, Value>, WeaveError> {
    let mut metadata = Map::new();
    let mut fields = Map::new();
    for (key, value) in props {
        if shape.hoist_metadata && !marker.is_empty() {
            if let Some(field) = key.strip_prefix(marker) {
                insert_unique(&mut metadata, field.to_owned(), value.clone())?;
                continue;
            }
        }
        if let Value::Object(bag) = value {
            if shape.spec_key.as_deref() == Some(key.as_str()) {
                for (field, nested) in bag {
                    insert_unique(&mut fields, field.clone(), nested.clone())?;
                }
                continue;
            }
        }
        insert_unique(&mut fields, key.clone(), value.clone())?;
    }
    if metadata.is_empty() {
        return Ok(fields);
    }
    let mut shaped = Map::new();
    shaped.insert(METADATA_KEY.to_owned(), Value::Object(metadata));
    for (key, value) in fields {
        insert_unique(&mut shaped, key, value)?;
    }
    Ok(shaped)
}

/// Leftover fields of a decomposed value, split by how they are rebuilt.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Unshaped {
    /// Properties that shape back into the same fields.
    pub props: Map<String, Value>,
    /// Fields named with the marker; as properties they would be hoisted, so
    /// they are written back at their own key.
    pub verbatim: Map<String, Value>,
}

/// Turn the leftover fields of a decomposed value back into properties.
///
/// With hoisting on, a non-empty `metadata` object is flattened into
/// marker-prefixed properties and fields already starting with the marker
/// are set aside as [`Unshaped::verbatim`]. The remaining fields are
/// re-nested under the spec key when the type declares one.
#[must_use]
pub fn unshape_fields(fields: Map<String, Value>, shape: &TypeShape, marker: &str) -> Unshaped {
    let hoisting = shape.hoist_metadata && !marker.is_empty();
    let mut unshaped = Unshaped::default();
    let mut rest = Map::new();
    for (key, value) in fields {
        if hoisting && key.starts_with(marker) {
            unshaped.verbatim.insert(key, value);
            continue;
        }
        match value {
            Value::Object(metadata) if hoisting && key == METADATA_KEY && !metadata.is_empty() => {
                for (field, nested) in metadata {
                    unshaped.props.insert(format!("{marker}{field}"), nested);
                }
            }
            other => {
                rest.insert(key, other);
            }
        }
    }
    match &shape.spec_key {
        Some(spec_key) if !rest.is_empty() => {
            unshaped.props.insert(spec_key.clone(), Value::Object(rest));
        }
        _ => unshaped.props.extend(rest),
    }
    unshaped
}

fn insert_unique(map: &mut Map<String, Value>, key: String, value: Value) -> Result<(), WeaveError> {
    if map.contains_key(&key) {
        return Err(WeaveError::PathCollision {
            path: DotPath::keys([key]),
        });
    }
    map.insert(key, value);
    Ok(())
}
