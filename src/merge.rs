//! Structural merge of JSON content
//!
//! Composition layers content files on top of each other with
//! [`deep_merge`]. Objects merge key by key, arrays concatenate and scalars
//! are replaced. Array concatenation is what lets an override append menu
//! sections or feature entries, so merging the same layer twice repeats
//! those entries.

use serde_json::{Map, Value};

/// Merge `source` into `target`, returning the combined value
///
/// - a `null` source leaves the target untouched; a `null` target yields the source
/// - two arrays concatenate (`target` first)
/// - two objects merge recursively, new keys keep their source order
/// - any other combination takes the source
///
/// # Example
/// ```
/// use restaurant_content::merge::deep_merge;
/// use serde_json::json;
///
/// let merged = deep_merge(json!({"a": 1, "b": 2}), json!({"b": 3, "c": 4}));
/// assert_eq!(merged, json!({"a": 1, "b": 3, "c": 4}));
/// ```
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (target, Value::Null) => target,
        (Value::Null, source) => source,
        (Value::Array(mut target), Value::Array(source)) => {
            target.extend(source);
            Value::Array(target)
        }
        (Value::Object(target), Value::Object(source)) => {
            Value::Object(merge_objects(target, source))
        }
        (_, source) => source,
    }
}

fn merge_objects(mut target: Map<String, Value>, source: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => {
                let current = existing.take();
                *existing = deep_merge(current, value);
            }
            None => {
                target.insert(key, value);
            }
        }
    }
    target
}

/// Top-level key assignment of `source` onto `target`
///
/// Nested objects are replaced wholesale rather than merged. Non-object
/// sources are ignored.
pub fn shallow_assign(target: &mut Map<String, Value>, source: Value) {
    if let Value::Object(source) = source {
        for (key, value) in source {
            target.insert(key, value);
        }
    }
}
