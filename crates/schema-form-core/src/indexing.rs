//! Translation between generic pointers (`/list/-/name`) and indexed
//! pointers (`/list/3/name`).
//!
//! The [`ArrayMap`] records every array location (as a generic pointer) with
//! its count of fixed tuple positions. An index below that count is a tuple
//! position and is kept verbatim when generalizing; anything at or above it
//! is a list position and becomes `-`. Locations missing from the map are
//! never generalized, so numeric object keys survive untouched.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pointer::{self, array_index};
use crate::schema;

/// Generic array pointer → number of tuple items (0 for pure list arrays).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrayMap(BTreeMap<String, usize>);

impl ArrayMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an array location. The first registration wins; entries are
    /// never rewritten once created.
    pub fn register(&mut self, generic_pointer: impl Into<String>, tuple_items: usize) {
        self.0.entry(generic_pointer.into()).or_insert(tuple_items);
    }

    /// Tuple-item count for a registered array location.
    pub fn tuple_items(&self, generic_pointer: &str) -> Option<usize> {
        self.0.get(generic_pointer).copied()
    }

    pub fn contains(&self, generic_pointer: &str) -> bool {
        self.0.contains_key(generic_pointer)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Register every array location reachable from the root schema.
    ///
    /// Local `$ref`s are followed; a reference already being expanded on the
    /// current branch is not entered again.
    pub fn from_schema(root: &Value, max_depth: usize) -> Self {
        let mut map = Self::new();
        let mut trail = HashSet::new();
        map.scan(root, root, "", &mut trail, 0, max_depth);
        map
    }

    fn scan(
        &mut self,
        root: &Value,
        node: &Value,
        data_pointer: &str,
        trail: &mut HashSet<String>,
        depth: usize,
        max_depth: usize,
    ) {
        if depth > max_depth {
            tracing::debug!(data_pointer, max_depth, "array scan depth limit reached");
            return;
        }
        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            if !trail.insert(reference.to_string()) {
                return;
            }
            if let Ok(target) = schema::resolve_ref(root, reference) {
                self.scan(root, target, data_pointer, trail, depth + 1, max_depth);
            }
            trail.remove(reference);
            return;
        }

        if let Some(properties) = node.get("properties").and_then(Value::as_object) {
            for (key, child) in properties {
                let child_pointer = pointer::join(data_pointer, &[key]);
                self.scan(root, child, &child_pointer, trail, depth + 1, max_depth);
            }
        }

        match node.get("items") {
            Some(Value::Array(tuple)) => {
                self.register(data_pointer, tuple.len());
                for (i, child) in tuple.iter().enumerate() {
                    let child_pointer = format!("{data_pointer}/{i}");
                    self.scan(root, child, &child_pointer, trail, depth + 1, max_depth);
                }
                if let Some(additional) = node.get("additionalItems").filter(|v| v.is_object()) {
                    let child_pointer = format!("{data_pointer}/-");
                    self.scan(root, additional, &child_pointer, trail, depth + 1, max_depth);
                }
            }
            Some(items @ Value::Object(_)) => {
                self.register(data_pointer, 0);
                let child_pointer = format!("{data_pointer}/-");
                self.scan(root, items, &child_pointer, trail, depth + 1, max_depth);
            }
            _ => {
                if schema::schema_type(node) == Some(crate::node::DataType::Array) {
                    self.register(data_pointer, 0);
                }
            }
        }
    }
}

/// Replace `-` placeholders with concrete indices, left to right.
///
/// With an array map, only placeholders whose generic prefix is a registered
/// array consume an index. Placeholders left over when `indices` runs out
/// stay as `-`.
pub fn to_indexed_pointer(
    generic_pointer: &str,
    indices: &[usize],
    array_map: Option<&ArrayMap>,
) -> String {
    let Ok(keys) = pointer::parse(generic_pointer) else {
        tracing::warn!(generic_pointer, "cannot index an invalid pointer");
        return generic_pointer.to_string();
    };
    let mut next = indices.iter();
    let mut indexed = String::new();
    let mut generic_prefix = String::new();
    for key in &keys {
        let replace = key == "-" && array_map.is_none_or(|map| map.contains(&generic_prefix));
        indexed.push('/');
        match replace.then(|| next.next()).flatten() {
            Some(index) => indexed.push_str(&index.to_string()),
            None => indexed.push_str(&pointer::escape(key)),
        }
        generic_prefix.push('/');
        generic_prefix.push_str(&pointer::escape(key));
    }
    indexed
}

/// Collapse list indices back to `-` using the array map.
pub fn to_generic_pointer(indexed_pointer: &str, array_map: &ArrayMap) -> String {
    let Ok(mut keys) = pointer::parse(indexed_pointer) else {
        tracing::warn!(indexed_pointer, "cannot generalize an invalid pointer");
        return indexed_pointer.to_string();
    };
    let mut prefix = String::new();
    for key in keys.iter_mut() {
        if let (Some(tuple_items), Some(index)) = (array_map.tuple_items(&prefix), array_index(key)) {
            if index >= tuple_items {
                *key = "-".to_string();
            }
        }
        prefix.push('/');
        prefix.push_str(&pointer::escape(key));
    }
    prefix
}

/// Replace every numeric key with `-`.
///
/// Layout pointers address `items` collections only, so every numeric key
/// is a position.
pub fn generalize_layout_pointer(layout_pointer: &str) -> String {
    match pointer::parse(layout_pointer) {
        Ok(keys) => {
            let generic: Vec<&str> = keys
                .iter()
                .map(|k| if array_index(k).is_some() { "-" } else { k.as_str() })
                .collect();
            pointer::compile_keys(&generic)
        }
        Err(_) => layout_pointer.to_string(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tuple_map() -> ArrayMap {
        let mut map = ArrayMap::new();
        map.register("/foo", 2);
        map.register("/foo/-/tags", 0);
        map
    }

    #[test]
    fn test_tuple_positions_are_preserved() {
        let map = tuple_map();
        assert_eq!(to_generic_pointer("/foo/1/name", &map), "/foo/1/name");
        assert_eq!(to_generic_pointer("/foo/2/name", &map), "/foo/-/name");
        assert_eq!(to_generic_pointer("/foo/7/tags/0", &map), "/foo/-/tags/-");
    }

    #[test]
    fn test_unmapped_numeric_keys_are_literal() {
        let map = tuple_map();
        assert_eq!(to_generic_pointer("/codes/404", &map), "/codes/404");
    }

    #[test]
    fn test_root_array_generalizes() {
        let mut map = ArrayMap::new();
        map.register("", 0);
        assert_eq!(to_generic_pointer("/3/name", &map), "/-/name");
    }

    #[test]
    fn test_to_indexed_without_map() {
        assert_eq!(to_indexed_pointer("/a/-/b/-", &[1, 2], None), "/a/1/b/2");
        assert_eq!(to_indexed_pointer("/a/-/b/-", &[4], None), "/a/4/b/-");
    }

    #[test]
    fn test_to_indexed_with_map_skips_unregistered() {
        let mut map = ArrayMap::new();
        map.register("/list", 0);
        // `/obj/-` is an object key named "-", not an array position.
        assert_eq!(
            to_indexed_pointer("/obj/-/list/-", &[5], Some(&map)),
            "/obj/-/list/-"
        );
        map.register("/obj/-/list", 0);
        assert_eq!(
            to_indexed_pointer("/obj/-/list/-", &[5], Some(&map)),
            "/obj/-/list/5"
        );
    }

    #[test]
    fn test_register_first_wins() {
        let mut map = ArrayMap::new();
        map.register("/a", 1);
        map.register("/a", 5);
        assert_eq!(map.tuple_items("/a"), Some(1));
    }

    #[test]
    fn test_generalize_layout_pointer() {
        assert_eq!(generalize_layout_pointer("/0/items/3/items/1"), "/-/items/-/items/-");
    }

    #[test]
    fn test_from_schema_registers_nested_arrays() {
        let schema = json!({
            "type": "object",
            "properties": {
                "pairs": {
                    "type": "array",
                    "items": [{ "type": "string" }, { "type": "number" }],
                    "additionalItems": {
                        "type": "object",
                        "properties": { "tags": { "type": "array", "items": { "type": "string" } } }
                    }
                },
                "people": { "type": "array", "items": { "$ref": "#/definitions/person" } }
            },
            "definitions": {
                "person": {
                    "type": "object",
                    "properties": {
                        "friends": { "type": "array", "items": { "$ref": "#/definitions/person" } }
                    }
                }
            }
        });
        let map = ArrayMap::from_schema(&schema, 50);
        assert_eq!(map.tuple_items("/pairs"), Some(2));
        assert_eq!(map.tuple_items("/pairs/-/tags"), Some(0));
        assert_eq!(map.tuple_items("/people"), Some(0));
        assert_eq!(map.tuple_items("/people/-/friends"), Some(0));
        assert!(!map.contains("/people/-/friends/-/friends"));
    }
}
