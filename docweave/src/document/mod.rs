//! Document builder primitives over [`serde_json::Value`].
//!
//! Documents are plain JSON values built with `preserve_order`, so field order
//! follows insertion order. A missing key is vacant and intermediate objects
//! are created on demand wherever a path passes through one; a key holding
//! `null` is occupied like any other.

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::Arity;
use crate::path::{DotPath, Segment};
use crate::WeaveError;

/// Human-readable JSON kind of `value`.
#[must_use]
pub const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Returns `true` for `null`, `[]` and `{}`.
#[must_use]
pub fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}

/// Read the value at `path`.
#[must_use]
pub fn get<'a>(doc: &'a Value, path: &DotPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(doc, |current, segment| match segment {
            Segment::Key(key) => current.as_object().and_then(|map| map.get(key)),
            Segment::Index(index) => current.as_array().and_then(|items| items.get(*index)),
        })
}

/// Slot reached by [`slot_mut`].
struct Slot<'a> {
    value: &'a mut Value,
    /// The slot did not exist before the walk.
    vacant: bool,
}

/// Walk to the slot at `path`, creating missing intermediate objects.
///
/// A key that is present holds its value even when that value is `null`:
/// walking through it is a collision.
fn slot_mut<'a>(doc: &'a mut Value, path: &DotPath) -> Result<Slot<'a>, WeaveError> {
    let mut vacant = doc.is_null();
    let mut current = doc;
    for (depth, segment) in path.segments().iter().enumerate() {
        current = match segment {
            Segment::Key(key) => {
                if current.is_null() {
                    if !vacant {
                        return Err(WeaveError::PathCollision {
                            path: path.prefix(depth),
                        });
                    }
                    *current = Value::Object(Map::new());
                }
                match current {
                    Value::Object(map) => {
                        vacant = !map.contains_key(key);
                        map.entry(key.clone()).or_insert(Value::Null)
                    }
                    _ => {
                        return Err(WeaveError::PathCollision {
                            path: path.prefix(depth),
                        });
                    }
                }
            }
            Segment::Index(index) => match current {
                Value::Array(items) => {
                    let len = items.len();
                    vacant = false;
                    items.get_mut(*index).ok_or_else(|| {
                        WeaveError::invalid_path(
                            path.to_string(),
                            format!("index {index} is out of bounds for {len} item(s)"),
                        )
                    })?
                }
                other => {
                    return Err(WeaveError::ArityMismatch {
                        path: path.prefix(depth),
                        expected: Arity::Array,
                        found: kind_of(other),
                    });
                }
            },
        };
    }
    Ok(Slot {
        value: current,
        vacant,
    })
}

/// Assign `value` at `path`.
///
/// # Errors
///
/// Returns [`WeaveError::PathCollision`] when the slot already exists, even
/// as `null`, and [`WeaveError::ArityMismatch`] when it holds an array.
pub fn set(doc: &mut Value, path: &DotPath, value: Value) -> Result<(), WeaveError> {
    let slot = slot_mut(doc, path)?;
    if slot.value.is_array() {
        return Err(WeaveError::ArityMismatch {
            path: path.clone(),
            expected: Arity::Single,
            found: "an array",
        });
    }
    if !slot.vacant {
        return Err(WeaveError::PathCollision { path: path.clone() });
    }
    trace!(%path, "set");
    *slot.value = value;
    Ok(())
}

/// Append `value` to the array at `path`, creating it when absent.
///
/// Returns the index of the appended item.
///
/// # Errors
///
/// Returns [`WeaveError::ArityMismatch`] when the slot holds a non-array
/// value, including an explicit `null`.
pub fn append(doc: &mut Value, path: &DotPath, value: Value) -> Result<usize, WeaveError> {
    let slot = slot_mut(doc, path)?;
    if slot.vacant {
        *slot.value = Value::Array(Vec::new());
    }
    match slot.value {
        Value::Array(items) => {
            items.push(value);
            let index = items.len() - 1;
            trace!(%path, index, "append");
            Ok(index)
        }
        other => Err(WeaveError::ArityMismatch {
            path: path.clone(),
            expected: Arity::Array,
            found: kind_of(other),
        }),
    }
}

/// Deep-merge `value` into the slot at `path`.
///
/// # Errors
///
/// Returns an error when `path` cannot be navigated.
pub fn merge_at(doc: &mut Value, path: &DotPath, value: Value) -> Result<(), WeaveError> {
    let slot = slot_mut(doc, path)?;
    merge_value(slot.value, value);
    Ok(())
}

/// Remove and return the value at `path`.
///
/// Objects left empty by the removal are pruned from their parents. Array
/// items are never pruned. The root itself cannot be taken.
pub fn take(doc: &mut Value, path: &DotPath) -> Option<Value> {
    take_segments(doc, path.segments())
}

fn take_segments(current: &mut Value, segments: &[Segment]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    match (first, current) {
        (Segment::Key(key), Value::Object(map)) => {
            if rest.is_empty() {
                return map.shift_remove(key);
            }
            let child = map.get_mut(key)?;
            let taken = take_segments(child, rest)?;
            if child.as_object().is_some_and(Map::is_empty) {
                map.shift_remove(key);
            }
            Some(taken)
        }
        (Segment::Index(index), Value::Array(items)) => {
            if rest.is_empty() {
                return (*index < items.len()).then(|| items.remove(*index));
            }
            take_segments(items.get_mut(*index)?, rest)
        }
        _ => None,
    }
}

/// Overlay `layer` onto `target`, updating `target` in place.
///
/// Behaviour:
/// - When merging an object into a non-object target, target is initialised to
///   `{}` first.
/// - Objects are merged recursively (keys are added or overwritten, and nested
///   objects are overlaid).
/// - Arrays and scalars replace `target` wholesale (no deep merge for arrays).
///
/// # Examples
///
/// ```rust
/// use docweave::document::merge_value;
/// use serde_json::json;
///
/// let mut acc = json!({"a": 1, "b": {"x": 1}});
/// merge_value(&mut acc, json!({"b": {"y": 2}, "c": 3}));
/// assert_eq!(acc, json!({"a": 1, "b": {"x": 1, "y": 2}, "c": 3}));
///
/// // Arrays replace existing values.
/// merge_value(&mut acc, json!({"b": [1, 2, 3]}));
/// assert_eq!(acc["b"], json!([1, 2, 3]));
/// ```
pub fn merge_value(target: &mut Value, layer: Value) {
    match layer {
        Value::Object(map) => merge_object(target, map),
        _ => *target = layer,
    }
}

fn merge_object(target: &mut Value, map: Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    let Some(target_map) = target.as_object_mut() else {
        return;
    };

    for (key, value) in map {
        match target_map.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target_map.insert(key, value);
            }
        }
    }
}
