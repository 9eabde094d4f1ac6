//! Schema introspection: control-type classification, required detection,
//! option harvesting, and translation between data pointers and schema
//! pointers.
//!
//! Only local references (`#/...`) are resolved. Data pointers are mapped to
//! schema locations key by key: object keys go through `properties` (or an
//! object `additionalProperties`), array positions through `items`, tuple
//! positions through `items/<n>`, and positions past the tuple (including
//! `-`) through `additionalItems`.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::FormError;
use crate::node::{ControlType, DataType, NodeOptions};
use crate::pointer::{self, array_index};

/// Stand-in for locations the schema allows without describing
/// (`additionalProperties` / `additionalItems` left unset).
static ANY_SCHEMA: Value = Value::Bool(true);

/// Hop limit when following `$ref` chains.
const MAX_REF_HOPS: usize = 32;

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// Resolve a local `$ref` (`#`, `#/definitions/x`) against the root schema.
pub fn resolve_ref<'a>(root: &'a Value, reference: &str) -> Result<&'a Value, FormError> {
    let unresolvable = || FormError::UnresolvableRef {
        path: reference.to_string(),
        reference: reference.to_string(),
    };
    if !reference.starts_with('#') {
        return Err(unresolvable());
    }
    let keys = pointer::parse(reference).map_err(|_| unresolvable())?;
    pointer::get_keys(root, &keys).ok_or_else(unresolvable)
}

/// Follow `$ref`s until a schema without one is reached.
///
/// Returns the final schema and its schema pointer (the pointer of the last
/// reference target, or `schema_pointer` when no reference was followed).
pub fn deref<'a>(root: &'a Value, schema: &'a Value, schema_pointer: &str) -> (&'a Value, String) {
    let mut current = schema;
    let mut current_pointer = schema_pointer.to_string();
    for _ in 0..MAX_REF_HOPS {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return (current, current_pointer);
        };
        match resolve_ref(root, reference) {
            Ok(target) => {
                current = target;
                current_pointer = pointer::normalize(reference).unwrap_or_default();
            }
            Err(e) => {
                tracing::warn!(error = %e, "leaving $ref unresolved");
                return (current, current_pointer);
            }
        }
    }
    tracing::warn!(schema_pointer, max_hops = MAX_REF_HOPS, "$ref chain too long");
    (current, current_pointer)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The schema's data type.
///
/// Multi-type lists collapse to one member by priority: object (only with
/// `properties`) > array (only with `items`) > string > number > integer >
/// boolean > null. Without `type`, `$ref` / `properties` / `items` imply
/// `$ref` / object / array.
pub fn schema_type(schema: &Value) -> Option<DataType> {
    match schema.get("type") {
        Some(Value::String(tag)) => DataType::parse(tag),
        Some(Value::Array(types)) => {
            let has = |t: &str| types.iter().any(|v| v.as_str() == Some(t));
            Some(if has("object") && schema.get("properties").is_some() {
                DataType::Object
            } else if has("array") && schema.get("items").is_some() {
                DataType::Array
            } else if has("string") {
                DataType::String
            } else if has("number") {
                DataType::Number
            } else if has("integer") {
                DataType::Integer
            } else if has("boolean") {
                DataType::Boolean
            } else {
                DataType::Null
            })
        }
        _ if schema.get("$ref").is_some() => Some(DataType::Ref),
        _ if schema.get("properties").is_some() => Some(DataType::Object),
        _ if schema.get("items").is_some() => Some(DataType::Array),
        _ => None,
    }
}

/// Choose the control type for a schema.
pub fn classify_input_type(schema: &Value) -> ControlType {
    let override_tag = schema
        .get("x-schema-form")
        .and_then(|x| x.get("type"))
        .and_then(Value::as_str)
        .or_else(|| schema.get("ui:widget").and_then(Value::as_str));
    if let Some(tag) = override_tag {
        return tag.parse().unwrap_or(ControlType::Text);
    }

    let data_type = schema_type(schema);
    match data_type {
        Some(DataType::Ref) => return ControlType::Ref,
        Some(DataType::Boolean) => return ControlType::Checkbox,
        Some(DataType::Object) => {
            return if schema.get("properties").is_some() {
                ControlType::Fieldset
            } else {
                ControlType::Textarea
            };
        }
        Some(DataType::Array) => {
            let items = schema
                .get("items")
                .or_else(|| schema.get("additionalItems").filter(|v| v.is_object()));
            return match items {
                Some(items) if items.get("enum").is_some() => ControlType::Checkboxes,
                Some(_) => ControlType::Array,
                None => {
                    tracing::debug!("array schema without items, using a text control");
                    ControlType::Text
                }
            };
        }
        Some(DataType::Null) => return ControlType::Hidden,
        _ => {}
    }

    if schema.get("enum").is_some() {
        return ControlType::Select;
    }
    match data_type {
        Some(numeric @ (DataType::Number | DataType::Integer)) => {
            let bounded = schema.get("minimum").is_some() && schema.get("maximum").is_some();
            if bounded && (numeric == DataType::Integer || schema.get("multipleOf").is_some()) {
                ControlType::Range
            } else if numeric == DataType::Integer {
                ControlType::Integer
            } else {
                ControlType::Number
            }
        }
        _ => match schema.get("format").and_then(Value::as_str) {
            Some("color") => ControlType::Color,
            Some("date") => ControlType::Date,
            Some("date-time") => ControlType::DatetimeLocal,
            Some("email") => ControlType::Email,
            Some("uri") => ControlType::Url,
            _ => ControlType::Text,
        },
    }
}

/// Switch `checkboxes` / `radios` to their inline variants when the node asks
/// for `inline`.
pub fn check_inline_type(control: ControlType, options: &NodeOptions) -> ControlType {
    if !options.get_bool("inline").unwrap_or(false) {
        return control;
    }
    match control {
        ControlType::Checkboxes => ControlType::CheckboxesInline,
        ControlType::Radios => ControlType::RadiosInline,
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Data pointer → schema
// ---------------------------------------------------------------------------

/// Schema node and schema pointer for each key of a data pointer.
fn walk_data_keys<'a, S: AsRef<str>>(root: &'a Value, keys: &[S]) -> Option<(&'a Value, String)> {
    let (mut schema, mut schema_pointer) = deref(root, root, "");
    for key in keys {
        let key = key.as_ref();
        let (child, child_pointer) = child_schema(schema, &schema_pointer, key)?;
        (schema, schema_pointer) = deref(root, child, &child_pointer);
    }
    Some((schema, schema_pointer))
}

fn child_schema<'a>(schema: &'a Value, schema_pointer: &str, key: &str) -> Option<(&'a Value, String)> {
    if schema == &ANY_SCHEMA {
        return Some((&ANY_SCHEMA, schema_pointer.to_string()));
    }
    let index = if key == "-" { Some(usize::MAX) } else { array_index(key) };
    match (schema_type(schema), index) {
        (Some(DataType::Array), Some(index)) => {
            match schema.get("items") {
                Some(items @ Value::Object(_)) => {
                    return Some((items, pointer::join(schema_pointer, &["items"])));
                }
                Some(Value::Array(tuple)) => {
                    if let Some(item) = tuple.get(index) {
                        return Some((item, pointer::join(schema_pointer, &["items", key])));
                    }
                }
                _ => {}
            }
            additional(schema, schema_pointer, "additionalItems")
        }
        (Some(DataType::Object), _) => {
            if let Some(property) = schema.get("properties").and_then(|p| p.get(key)) {
                return Some((property, pointer::join(schema_pointer, &["properties", key])));
            }
            additional(schema, schema_pointer, "additionalProperties")
        }
        _ => None,
    }
}

fn additional<'a>(schema: &'a Value, schema_pointer: &str, keyword: &str) -> Option<(&'a Value, String)> {
    let child_pointer = pointer::join(schema_pointer, &[keyword]);
    match schema.get(keyword) {
        Some(Value::Bool(false)) => None,
        Some(extra @ Value::Object(_)) => Some((extra, child_pointer)),
        _ => Some((&ANY_SCHEMA, child_pointer)),
    }
}

/// Schema pointer for a (generic or indexed) data pointer, following `$ref`s.
pub fn to_schema_pointer(data_pointer: &str, root: &Value) -> Option<String> {
    let keys = pointer::parse(data_pointer).ok()?;
    walk_data_keys(root, &keys).map(|(_, p)| p)
}

/// Schema node describing the value at `data_pointer`.
pub fn get_from_schema<'a>(root: &'a Value, data_pointer: &str) -> Option<&'a Value> {
    let keys = pointer::parse(data_pointer).ok()?;
    walk_data_keys(root, &keys).map(|(s, _)| s)
}

/// Schema node describing the container of the value at `data_pointer`.
pub fn get_from_schema_parent<'a>(root: &'a Value, data_pointer: &str) -> Option<&'a Value> {
    let keys = pointer::parse(data_pointer).ok()?;
    let parent = keys.split_last().map_or(&keys[..], |(_, parent)| parent);
    walk_data_keys(root, parent).map(|(s, _)| s)
}

/// Data pointer for a schema pointer.
///
/// Returns `None` for locations that hold no form data themselves
/// (`definitions`, `additionalProperties`, composition keywords) and for
/// pointers that do not resolve against `root`.
pub fn to_data_pointer(schema_pointer: &str, root: &Value) -> Option<String> {
    let keys = pointer::parse(schema_pointer).ok()?;
    pointer::get_keys(root, &keys)?;
    let mut data_keys: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < keys.len() {
        match keys[i].as_str() {
            "properties" => {
                data_keys.push(keys.get(i + 1)?);
                i += 2;
            }
            "items" => match keys.get(i + 1).filter(|k| array_index(k).is_some()) {
                Some(index) => {
                    data_keys.push(index);
                    i += 2;
                }
                None => {
                    data_keys.push("-");
                    i += 1;
                }
            },
            "additionalItems" => {
                data_keys.push("-");
                i += 1;
            }
            _ => return None,
        }
    }
    Some(pointer::compile_keys(&data_keys))
}

/// True when the last key of `data_pointer` is listed in its parent's
/// `required` (for array elements, the array's item schema).
pub fn is_required(root: &Value, data_pointer: &str) -> bool {
    let Ok(keys) = pointer::parse(data_pointer) else {
        return false;
    };
    let Some((name, parent)) = keys.split_last() else {
        return false;
    };
    let parent_schema = match parent.split_last() {
        Some((last, grand)) if last == "-" => walk_data_keys(root, grand)
            .and_then(|(s, _)| s.get("items").filter(|v| v.is_object()))
            .map(|items| deref(root, items, "").0),
        _ => walk_data_keys(root, parent).map(|(s, _)| s),
    };
    parent_schema
        .and_then(|s| s.get("required"))
        .and_then(Value::as_array)
        .is_some_and(|required| required.iter().any(|r| r.as_str() == Some(name)))
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Schema keywords copied into node options (schema name, option name).
const OPTION_KEYWORDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("description", "description"),
    ("default", "default"),
    ("minimum", "minimum"),
    ("maximum", "maximum"),
    ("exclusiveMinimum", "exclusiveMinimum"),
    ("exclusiveMaximum", "exclusiveMaximum"),
    ("multipleOf", "multipleOf"),
    ("minLength", "minLength"),
    ("maxLength", "maxLength"),
    ("pattern", "pattern"),
    ("format", "format"),
    ("minItems", "minItems"),
    ("maxItems", "maxItems"),
    ("uniqueItems", "uniqueItems"),
    ("minProperties", "minProperties"),
    ("maxProperties", "maxProperties"),
    ("enum", "enum"),
    ("readOnly", "readonly"),
];

/// Fill node options from the schema, then from the form defaults.
///
/// Values already on the node (from an authored layout) are never replaced;
/// `x-schema-form` / `ui:*` hints beat plain schema keywords, which beat
/// the defaults. Enumerations get a normalized `titleMap`.
pub fn update_options(options: &mut NodeOptions, schema: &Value, defaults: &Map<String, Value>) {
    if let Some(Value::Object(hints)) = schema.get("x-schema-form") {
        for (key, value) in hints {
            if key != "type" && key != "key" {
                options.set_if_absent(key, value.clone());
            }
        }
    }
    if let Value::Object(map) = schema {
        for (key, value) in map {
            if let Some(option) = key.strip_prefix("ui:") {
                if option != "widget" && option != "order" {
                    options.set_if_absent(option, value.clone());
                }
            }
        }
    }
    for (keyword, option) in OPTION_KEYWORDS {
        if let Some(value) = schema.get(*keyword) {
            options.set_if_absent(option, value.clone());
        }
    }
    // Checkbox groups offer the item schema's enumeration.
    if let Some(item_enum) = schema.get("items").and_then(|i| i.get("enum")) {
        options.set_if_absent("enum", item_enum.clone());
    }

    let enum_list = options.get("enum").and_then(Value::as_array).cloned();
    if enum_list.is_some() || options.contains("titleMap") {
        let title_map = build_title_map(
            options.get("titleMap"),
            enum_list.as_deref(),
            options.required(),
        );
        options.set("titleMap", Value::Array(title_map));
    }

    for (key, value) in defaults {
        options.set_if_absent(key, value.clone());
    }
}

/// Normalize a title map into `[{name, value}, ...]`.
///
/// Accepts an array of `{name, value}`, an object of value → name (with an
/// enum) or name → value (without one), or nothing (names from the enum).
/// Entries not in the enum are dropped. Optional fields get a leading empty
/// choice unless one is already present.
pub fn build_title_map(
    title_map: Option<&Value>,
    enum_list: Option<&[Value]>,
    field_required: bool,
) -> Vec<Value> {
    let entry = |name: Value, value: Value| serde_json::json!({ "name": name, "value": value });
    let mut entries = Vec::new();
    let mut has_empty_value = false;

    match (title_map, enum_list) {
        (Some(Value::Array(list)), Some(enum_list)) => {
            for item in list {
                let value = item.get("value").cloned().unwrap_or(Value::Null);
                if enum_list.contains(&value) {
                    has_empty_value |= is_falsy(&value);
                    let name = item.get("name").cloned().unwrap_or(Value::Null);
                    entries.push(entry(name, value));
                }
            }
        }
        (Some(Value::Array(list)), None) => {
            entries = list.clone();
            if !field_required {
                has_empty_value = entries
                    .iter()
                    .any(|e| is_falsy(e.get("value").unwrap_or(&Value::Null)));
            }
        }
        (Some(Value::Object(map)), Some(enum_list)) => {
            for value in enum_list {
                if let Some(name) = map.get(&value_key(value)) {
                    has_empty_value |= is_falsy(value);
                    entries.push(entry(name.clone(), value.clone()));
                }
            }
        }
        (Some(Value::Object(map)), None) => {
            for (name, value) in map {
                has_empty_value |= is_falsy(value);
                entries.push(entry(Value::from(name.as_str()), value.clone()));
            }
        }
        (_, Some(enum_list)) => {
            for value in enum_list {
                has_empty_value |= is_falsy(value);
                entries.push(entry(value.clone(), value.clone()));
            }
        }
        (_, None) => {}
    }

    if !field_required && !has_empty_value {
        entries.insert(0, entry(Value::from(""), Value::from("")));
    }
    entries
}

/// Object-key spelling of an enum value.
fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Property keys in display order.
///
/// Declared order, unless `ui:order` (or `x-schema-form.order`) lists keys;
/// then listed keys come first and `*` stands for all unlisted keys.
pub fn property_order(schema: &Value) -> Vec<String> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let declared: Vec<String> = properties.keys().cloned().collect();
    let order = schema
        .get("ui:order")
        .or_else(|| schema.get("x-schema-form").and_then(|x| x.get("order")))
        .and_then(Value::as_array);
    let Some(order) = order else {
        return declared;
    };

    let listed: Vec<&str> = order.iter().filter_map(Value::as_str).collect();
    let unlisted: Vec<String> = declared
        .iter()
        .filter(|k| !listed.contains(&k.as_str()))
        .cloned()
        .collect();
    let mut ordered = Vec::with_capacity(declared.len());
    let mut wildcard_used = false;
    for key in &listed {
        if *key == "*" {
            ordered.extend(unlisted.iter().cloned());
            wildcard_used = true;
        } else if properties.contains_key(*key) && !ordered.iter().any(|o| o == key) {
            ordered.push(key.to_string());
        }
    }
    if !wildcard_used {
        ordered.extend(unlisted);
    }
    ordered
}

// ---------------------------------------------------------------------------
// Data templates
// ---------------------------------------------------------------------------

/// Fresh data value for a new instance of `schema`.
///
/// `default` wins; objects collect their properties' non-null templates;
/// arrays start empty; everything else is `null`. Reference cycles yield
/// `null` at the point of recursion.
pub fn default_data(root: &Value, schema: &Value) -> Value {
    let mut trail = HashSet::new();
    default_data_inner(root, schema, &mut trail)
}

fn default_data_inner(root: &Value, schema: &Value, trail: &mut HashSet<String>) -> Value {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        if !trail.insert(reference.to_string()) {
            return Value::Null;
        }
        let value = match resolve_ref(root, reference) {
            Ok(target) => default_data_inner(root, target, trail),
            Err(_) => Value::Null,
        };
        trail.remove(reference);
        return value;
    }
    if let Some(default) = schema.get("default") {
        return default.clone();
    }
    match schema_type(schema) {
        Some(DataType::Object) => {
            let mut object = Map::new();
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (key, child) in properties {
                    let value = default_data_inner(root, child, trail);
                    if !value.is_null() {
                        object.insert(key.clone(), value);
                    }
                }
            }
            Value::Object(object)
        }
        Some(DataType::Array) => Value::Array(Vec::new()),
        _ => Value::Null,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
