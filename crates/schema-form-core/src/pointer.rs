//! JSON Pointer (RFC 6901) parsing, compiling and traversal over `serde_json::Value`.
//!
//! Pointers are accepted in string form (`/a/b~1c`) or `#`-fragment form
//! (`#/a/b~1c`); both normalize to the plain string form. A final key of `-`
//! denotes the append position of an array when setting, and the last element
//! of a non-empty array when reading.
//!
//! Read operations return `Option` for traversal misses. Write operations
//! return `Result` so callers can tell a malformed pointer from a structural
//! conflict; nothing in this module panics on bad input.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::FormError;

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape a single pointer key.
///
/// - `~` → `~0`
/// - `/` → `~1`
///
/// Returns `Cow::Borrowed` when no escaping is needed (the common case).
pub fn escape(key: &str) -> Cow<'_, str> {
    if key.contains('~') || key.contains('/') {
        Cow::Owned(key.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(key)
    }
}

/// Unescape a single pointer key.
///
/// - `~1` → `/`
/// - `~0` → `~`
///
/// `~1` is replaced first so `~01` decodes to `~1`, not `/`.
pub fn unescape(key: &str) -> Cow<'_, str> {
    if key.contains("~0") || key.contains("~1") {
        Cow::Owned(key.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(key)
    }
}

// ---------------------------------------------------------------------------
// Parse / compile
// ---------------------------------------------------------------------------

/// Split a pointer into its unescaped keys.
///
/// A leading `#` is stripped; `""` and `"#"` are the root (no keys).
///
/// # Example
/// ```
/// use schema_form_core::pointer::parse;
/// assert_eq!(parse("#/a~1b/0").unwrap(), vec!["a/b", "0"]);
/// assert!(parse("").unwrap().is_empty());
/// assert!(parse("no-slash").is_err());
/// ```
pub fn parse(pointer: &str) -> Result<Vec<String>, FormError> {
    let stripped = pointer.strip_prefix('#').unwrap_or(pointer);
    if stripped.is_empty() {
        return Ok(Vec::new());
    }
    let Some(body) = stripped.strip_prefix('/') else {
        return Err(FormError::InvalidPointer {
            pointer: pointer.to_string(),
            message: "must be empty or start with '/'".to_string(),
        });
    };
    body.split('/')
        .map(|key| {
            if has_bad_escape(key) {
                Err(FormError::InvalidPointer {
                    pointer: pointer.to_string(),
                    message: format!("invalid escape sequence in key {key:?}"),
                })
            } else {
                Ok(unescape(key).into_owned())
            }
        })
        .collect()
}

fn has_bad_escape(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b'~' && !matches!(bytes.get(i + 1), Some(b'0') | Some(b'1')))
}

/// Join keys into a pointer string, replacing empty keys with `default`.
///
/// The default lets callers mark positions positionally, e.g. an object path
/// `tags[]` compiles to `/tags/-` with `default = "-"`.
pub fn compile<S: AsRef<str>>(keys: &[S], default: &str) -> String {
    let mut pointer = String::new();
    for key in keys {
        pointer.push('/');
        match key.as_ref() {
            "" => pointer.push_str(default),
            key => pointer.push_str(&escape(key)),
        }
    }
    pointer
}

/// Join keys into a pointer string, keeping empty keys.
pub fn compile_keys<S: AsRef<str>>(keys: &[S]) -> String {
    compile(keys, "")
}

/// Canonical string form of a pointer (`#` stripped, escapes normalized).
pub fn normalize(pointer: &str) -> Result<String, FormError> {
    parse(pointer).map(|keys| compile_keys(&keys))
}

/// Append already-unescaped keys to a pointer string.
pub fn join(parent: &str, keys: &[&str]) -> String {
    let mut pointer = parent.to_string();
    for key in keys {
        pointer.push('/');
        pointer.push_str(&escape(key));
    }
    pointer
}

/// True for `""`, `"#"`, and any string whose body starts with `/` and uses
/// only valid escapes.
pub fn is_json_pointer(value: &str) -> bool {
    let stripped = value.strip_prefix('#').unwrap_or(value);
    stripped.is_empty() || (stripped.starts_with('/') && !has_bad_escape(stripped))
}

/// The last key of a pointer, if any.
pub fn to_key(pointer: &str) -> Option<String> {
    parse(pointer).ok()?.pop()
}

/// Parse or log. Traversal helpers treat invalid pointers as misses.
fn keys_or_log(pointer: &str) -> Option<Vec<String>> {
    match parse(pointer) {
        Ok(keys) => Some(keys),
        Err(e) => {
            tracing::warn!(pointer, error = %e, "ignoring invalid JSON Pointer");
            None
        }
    }
}

/// A key usable as an array index: ASCII digits only.
pub(crate) fn array_index(key: &str) -> Option<usize> {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        key.parse().ok()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

fn step<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match node {
        Value::Array(items) if key == "-" => items.last(),
        Value::Array(items) => items.get(array_index(key)?),
        Value::Object(map) => map.get(key),
        _ => None,
    }
}

fn step_mut<'a>(node: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match node {
        Value::Array(items) => {
            if key == "-" {
                items.last_mut()
            } else {
                items.get_mut(array_index(key)?)
            }
        }
        Value::Object(map) => map.get_mut(key),
        _ => None,
    }
}

/// Walk already-parsed keys.
pub fn get_keys<'a, S: AsRef<str>>(root: &'a Value, keys: &[S]) -> Option<&'a Value> {
    keys.iter().try_fold(root, |node, key| step(node, key.as_ref()))
}

/// Value at `pointer`, or `None` when any key is missing.
pub fn get<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    get_keys(root, &keys_or_log(pointer)?)
}

/// Value at a slice of `pointer`'s keys.
///
/// `start` and `end` follow slice semantics with negative values counting
/// from the end, so `get_range(root, p, 0, Some(-1))` is the parent of `p`.
/// A slice that selects no keys yields `root`.
pub fn get_range<'a>(
    root: &'a Value,
    pointer: &str,
    start: isize,
    end: Option<isize>,
) -> Option<&'a Value> {
    let keys = keys_or_log(pointer)?;
    let (from, to) = slice_bounds(keys.len(), start, end);
    if from >= to {
        return Some(root);
    }
    get_keys(root, &keys[from..to])
}

fn slice_bounds(len: usize, start: isize, end: Option<isize>) -> (usize, usize) {
    let clamp = |i: isize| -> usize {
        if i < 0 {
            len.saturating_sub(i.unsigned_abs())
        } else {
            (i as usize).min(len)
        }
    };
    (clamp(start), end.map_or(len, clamp))
}

/// Mutable value at `pointer`.
pub fn get_mut<'a>(root: &'a mut Value, pointer: &str) -> Option<&'a mut Value> {
    let keys = keys_or_log(pointer)?;
    get_keys_mut(root, &keys)
}

pub fn get_keys_mut<'a, S: AsRef<str>>(root: &'a mut Value, keys: &[S]) -> Option<&'a mut Value> {
    keys.iter()
        .try_fold(root, |node, key| step_mut(node, key.as_ref()))
}

/// True when a value (including `null`) exists at `pointer`.
pub fn has(root: &Value, pointer: &str) -> bool {
    get(root, pointer).is_some()
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Most `null`s a write past the end of an array may pad with.
pub const MAX_ARRAY_GAP: usize = 1024;

/// Grow `items` with `null`s so `index` is a valid slot.
fn pad_to(items: &mut Vec<Value>, index: usize, path: &str) -> Result<(), FormError> {
    if index < items.len() {
        return Ok(());
    }
    let new_len = index
        .checked_add(1)
        .filter(|_| index - items.len() <= MAX_ARRAY_GAP)
        .ok_or_else(|| FormError::InvalidPointer {
            pointer: path.to_string(),
            message: format!("index {index} is too far past the end of a {}-item array", items.len()),
        })?;
    items.resize(new_len, Value::Null);
    Ok(())
}

/// Empty container to create in front of `next_key`.
fn container_for(next_key: &str) -> Value {
    if next_key == "-" || array_index(next_key).is_some() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Descend into `key`, creating a container shaped for `next_key` when the
/// slot is missing or `null`.
fn descend_or_create<'a>(
    node: &'a mut Value,
    key: &str,
    next_key: &str,
    path: &str,
) -> Result<&'a mut Value, FormError> {
    if node.is_null() {
        *node = container_for(key);
    }
    let slot = match node {
        Value::Array(items) => {
            let index = if key == "-" {
                items.len()
            } else {
                array_index(key).ok_or_else(|| FormError::PointerNotFound {
                    path: path.to_string(),
                })?
            };
            pad_to(items, index, path)?;
            &mut items[index]
        }
        Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
        _ => {
            return Err(FormError::PointerNotFound {
                path: path.to_string(),
            })
        }
    };
    if !slot.is_object() && !slot.is_array() {
        *slot = container_for(next_key);
    }
    Ok(slot)
}

/// Set already-parsed keys. See [`set`].
pub fn set_keys<S: AsRef<str>>(
    root: &mut Value,
    keys: &[S],
    value: Value,
    insert: bool,
) -> Result<(), FormError> {
    let Some((last, parents)) = keys.split_last() else {
        *root = value;
        return Ok(());
    };
    let mut node = root;
    for (i, key) in parents.iter().enumerate() {
        let next = keys[i + 1].as_ref();
        let path = compile_keys(&keys[..=i]);
        node = descend_or_create(node, key.as_ref(), next, &path)?;
    }
    let last = last.as_ref();
    if node.is_null() {
        *node = container_for(last);
    }
    match node {
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index = array_index(last).ok_or_else(|| FormError::PointerNotFound {
                path: compile_keys(keys),
            })?;
            if insert {
                items.insert(index.min(items.len()), value);
            } else {
                pad_to(items, index, &compile_keys(keys))?;
                items[index] = value;
            }
        }
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        _ => {
            return Err(FormError::PointerNotFound {
                path: compile_keys(&keys[..keys.len() - 1]),
            })
        }
    }
    Ok(())
}

/// Set `value` at `pointer`, creating missing containers on the way.
///
/// A missing intermediate becomes an array when the key after it is numeric
/// or `-`, otherwise an object. A final `-` appends. With `insert`, a numeric
/// final key on an array splices the value in instead of overwriting; past the
/// end, overwriting pads with `null`, at most [`MAX_ARRAY_GAP`] of them.
pub fn set(root: &mut Value, pointer: &str, value: Value, insert: bool) -> Result<(), FormError> {
    set_keys(root, &parse(pointer)?, value, insert)
}

/// Splice `value` in at `pointer` (shorthand for `set(.., true)`).
pub fn insert(root: &mut Value, pointer: &str, value: Value) -> Result<(), FormError> {
    set(root, pointer, value, true)
}

/// Like [`set`], but leaves `root` untouched and returns the updated copy.
pub fn set_copy(
    root: &Value,
    pointer: &str,
    value: Value,
    insert: bool,
) -> Result<Value, FormError> {
    let mut copy = root.clone();
    set(&mut copy, pointer, value, insert)?;
    Ok(copy)
}

/// Remove and return the value at `pointer`.
///
/// Array elements shift down; `-` removes the last element. The root itself
/// cannot be removed.
pub fn remove(root: &mut Value, pointer: &str) -> Option<Value> {
    let keys = keys_or_log(pointer)?;
    remove_keys(root, &keys)
}

pub fn remove_keys<S: AsRef<str>>(root: &mut Value, keys: &[S]) -> Option<Value> {
    let (last, parents) = keys.split_last()?;
    let last = last.as_ref();
    match get_keys_mut(root, parents)? {
        Value::Array(items) if last == "-" => items.pop(),
        Value::Array(items) => {
            let index = array_index(last)?;
            (index < items.len()).then(|| items.remove(index))
        }
        Value::Object(map) => map.shift_remove(last),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Deep traversal
// ---------------------------------------------------------------------------

/// Visit every value in `root` (the root included) with its pointer.
///
/// Pre-order by default; post-order when `bottom_up` is set. Scalars are
/// visited but never descended into.
pub fn for_each_deep<F>(root: &Value, mut visitor: F, bottom_up: bool)
where
    F: FnMut(&Value, &str, &Value),
{
    walk(root, "", root, &mut visitor, bottom_up);
}

fn walk<F>(value: &Value, pointer: &str, root: &Value, visitor: &mut F, bottom_up: bool)
where
    F: FnMut(&Value, &str, &Value),
{
    if !bottom_up {
        visitor(value, pointer, root);
    }
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{pointer}/{i}"), root, visitor, bottom_up);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                walk(item, &join(pointer, &[key]), root, visitor, bottom_up);
            }
        }
        _ => {}
    }
    if bottom_up {
        visitor(value, pointer, root);
    }
}

/// Rebuild `root` from the visitor's return values without touching the input.
///
/// Top-down, a container is passed to the visitor before its children are
/// rebuilt, so the visitor may reshape what gets descended into. Bottom-up,
/// the visitor sees containers whose children are already rebuilt.
pub fn for_each_deep_copy<F>(root: &Value, mut visitor: F, bottom_up: bool) -> Value
where
    F: FnMut(Value, &str, &Value) -> Value,
{
    copy_walk(root.clone(), "", root, &mut visitor, bottom_up)
}

fn copy_walk<F>(value: Value, pointer: &str, root: &Value, visitor: &mut F, bottom_up: bool) -> Value
where
    F: FnMut(Value, &str, &Value) -> Value,
{
    let value = if bottom_up {
        value
    } else {
        visitor(value, pointer, root)
    };
    let value = match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| copy_walk(item, &format!("{pointer}/{i}"), root, visitor, bottom_up))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| {
                    let child = join(pointer, &[&key]);
                    (key, copy_walk(item, &child, root, visitor, bottom_up))
                })
                .collect(),
        ),
        other => other,
    };
    if bottom_up {
        visitor(value, pointer, root)
    } else {
        value
    }
}

/// Flatten `root` into a map from pointer to scalar leaf value.
pub fn dict(root: &Value) -> Map<String, Value> {
    let mut leaves = Map::new();
    for_each_deep(
        root,
        |value, pointer, _| {
            if !value.is_object() && !value.is_array() {
                leaves.insert(pointer.to_string(), value.clone());
            }
        },
        false,
    );
    leaves
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// True when `short` addresses an ancestor of `long`.
///
/// Equal pointers return `true_if_matching`. Invalid pointers are never
/// sub-pointers.
pub fn is_sub_pointer(short: &str, long: &str, true_if_matching: bool) -> bool {
    let (Ok(short), Ok(long)) = (normalize(short), normalize(long)) else {
        return false;
    };
    if short == long {
        return true_if_matching;
    }
    long.len() > short.len() && long.starts_with(&short) && long.as_bytes()[short.len()] == b'/'
}

/// Parse a JavaScript-style accessor path into pointer keys.
///
/// Supports dotted keys, bare brackets and quoted brackets:
/// `a.b[0]["c.d"]` → `["a", "b", "0", "c.d"]`; `tags[]` → `["tags", ""]`.
/// Strings that are already pointers go through [`parse`].
pub fn parse_object_path(path: &str) -> Result<Vec<String>, FormError> {
    if is_json_pointer(path) {
        return parse(path);
    }
    let mut keys = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        let bracket = rest.find('[');
        let dot = match (rest.find('.'), bracket) {
            (Some(d), Some(b)) if b < d => None,
            (d, _) => d,
        };
        if let Some(d) = dot {
            keys.push(rest[..d].to_string());
            rest = &rest[d + 1..];
        } else if let Some(b) = bracket {
            if b > 0 {
                keys.push(rest[..b].to_string());
            }
            let inner = &rest[b + 1..];
            let (key, after) = match inner.chars().next() {
                Some(quote @ ('"' | '\'')) => bracket_quoted(&inner[1..], quote, path)?,
                _ => match inner.find(']') {
                    Some(close) => (inner[..close].to_string(), &inner[close + 1..]),
                    None => (inner.to_string(), ""),
                },
            };
            keys.push(key);
            rest = after.strip_prefix('.').unwrap_or(after);
        } else {
            keys.push(rest.to_string());
            rest = "";
        }
    }
    Ok(keys)
}

/// Read a quoted bracket key up to `quote]`, honoring backslash escapes.
fn bracket_quoted<'a>(
    body: &'a str,
    quote: char,
    path: &str,
) -> Result<(String, &'a str), FormError> {
    let mut key = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    key.push(escaped);
                }
            }
            c if c == quote => {
                let after = &body[i + c.len_utf8()..];
                return match after.strip_prefix(']') {
                    Some(after) => Ok((key, after)),
                    None => Err(FormError::InvalidPointer {
                        pointer: path.to_string(),
                        message: "expected ']' after closing quote".to_string(),
                    }),
                };
            }
            c => key.push(c),
        }
    }
    Err(FormError::InvalidPointer {
        pointer: path.to_string(),
        message: "unterminated quoted key".to_string(),
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_and_compile() {
        assert_eq!(parse("/a/b").unwrap(), vec!["a", "b"]);
        assert_eq!(parse("#/a~1b/c~0d").unwrap(), vec!["a/b", "c~d"]);
        assert_eq!(parse("#").unwrap(), Vec::<String>::new());
        assert_eq!(parse("/").unwrap(), vec![""]);
        assert!(parse("a/b").is_err());
        assert!(parse("/a~2").is_err());

        assert_eq!(compile(&["a/b", "c~d"], ""), "/a~1b/c~0d");
        assert_eq!(compile(&["tags", ""], "-"), "/tags/-");
        assert_eq!(compile::<&str>(&[], "-"), "");
        assert_eq!(normalize("#/x/0").unwrap(), "/x/0");
    }

    #[test]
    fn test_to_key_and_is_json_pointer() {
        assert_eq!(to_key("/a/b~1c").as_deref(), Some("b/c"));
        assert_eq!(to_key(""), None);
        assert!(is_json_pointer(""));
        assert!(is_json_pointer("#"));
        assert!(is_json_pointer("#/a"));
        assert!(!is_json_pointer("a.b"));
        assert!(!is_json_pointer("/bad~"));
    }

    #[test]
    fn test_get_dash_and_misses() {
        let data = json!({ "list": [1, 2, 3], "empty": [], "obj": { "-": "dash" } });
        assert_eq!(get(&data, "/list/-"), Some(&json!(3)));
        assert_eq!(get(&data, "/list/1"), Some(&json!(2)));
        assert_eq!(get(&data, "/empty/-"), None);
        assert_eq!(get(&data, "/obj/-"), Some(&json!("dash")));
        assert_eq!(get(&data, "/list/9"), None);
        assert_eq!(get(&data, "/list/01x"), None);
        assert_eq!(get(&data, "not a pointer"), None);
        assert_eq!(get(&data, ""), Some(&data));
    }

    #[test]
    fn test_get_range_selects_ancestors() {
        let data = json!({ "a": { "b": { "c": 1 } } });
        assert_eq!(get_range(&data, "/a/b/c", 0, Some(-1)), Some(&json!({ "c": 1 })));
        assert_eq!(get_range(&data, "/a/b/c", 0, Some(-2)), Some(&json!({ "b": { "c": 1 } })));
        assert_eq!(get_range(&data, "/a/b/c", 1, Some(2)), None);
        assert_eq!(get_range(&data, "/a/b/c", 5, None), Some(&data));
    }

    #[test]
    fn test_set_creates_containers() {
        let mut data = Value::Null;
        set(&mut data, "/a/0/b", json!(1), false).unwrap();
        assert_eq!(data, json!({ "a": [{ "b": 1 }] }));

        set(&mut data, "/a/-/b", json!(2), false).unwrap();
        assert_eq!(data, json!({ "a": [{ "b": 1 }, { "b": 2 }] }));

        set(&mut data, "/a/3", json!("x"), false).unwrap();
        assert_eq!(data["a"], json!([{ "b": 1 }, { "b": 2 }, null, "x"]));
    }

    #[test]
    fn test_set_far_past_the_end_is_rejected() {
        let mut data = json!([]);
        assert!(set(&mut data, "/18446744073709551615", json!(1), false).is_err());
        assert!(set(&mut data, "/4000000000", json!(1), false).is_err());
        assert!(set(&mut data, "/4000000000/a", json!(1), false).is_err());
        assert_eq!(data, json!([]));

        let gap = MAX_ARRAY_GAP.to_string();
        set(&mut data, &format!("/{gap}"), json!(1), false).unwrap();
        assert_eq!(data.as_array().map(Vec::len), Some(MAX_ARRAY_GAP + 1));

        // Splicing clamps to the end instead of padding.
        let mut list = json!(["a"]);
        insert(&mut list, "/18446744073709551615", json!("b")).unwrap();
        assert_eq!(list, json!(["a", "b"]));
    }

    #[test]
    fn test_set_insert_splices() {
        let mut data = json!({ "list": ["a", "c"] });
        insert(&mut data, "/list/1", json!("b")).unwrap();
        assert_eq!(data, json!({ "list": ["a", "b", "c"] }));

        set(&mut data, "/list/0", json!("z"), false).unwrap();
        assert_eq!(data, json!({ "list": ["z", "b", "c"] }));
    }

    #[test]
    fn test_set_replaces_scalar_slots() {
        let mut data = json!({ "a": 5 });
        assert!(set(&mut data, "/a/b", json!(1), false).is_ok());
        assert_eq!(data, json!({ "a": { "b": 1 } }));

        // Arrays only take numeric keys.
        let mut list = json!(["x"]);
        assert!(set(&mut list, "/name", json!(1), false).is_err());
    }

    #[test]
    fn test_set_copy_leaves_input() {
        let data = json!({ "a": { "b": 1 } });
        let copy = set_copy(&data, "/a/c", json!(2), false).unwrap();
        assert_eq!(data, json!({ "a": { "b": 1 } }));
        assert_eq!(copy, json!({ "a": { "b": 1, "c": 2 } }));
    }

    #[test]
    fn test_remove() {
        let mut data = json!({ "list": [1, 2, 3], "o": { "x": 1, "y": 2, "z": 3 } });
        assert_eq!(remove(&mut data, "/list/0"), Some(json!(1)));
        assert_eq!(remove(&mut data, "/list/-"), Some(json!(3)));
        assert_eq!(data["list"], json!([2]));
        assert_eq!(remove(&mut data, "/o/x"), Some(json!(1)));
        let keys: Vec<&String> = data["o"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["y", "z"]);
        assert_eq!(remove(&mut data, "/missing/x"), None);
        assert_eq!(remove(&mut data, ""), None);
    }

    #[test]
    fn test_for_each_deep_orders() {
        let data = json!({ "a": [1, { "b": 2 }] });
        let mut pre = Vec::new();
        for_each_deep(&data, |_, p, _| pre.push(p.to_string()), false);
        assert_eq!(pre, vec!["", "/a", "/a/0", "/a/1", "/a/1/b"]);

        let mut post = Vec::new();
        for_each_deep(&data, |_, p, _| post.push(p.to_string()), true);
        assert_eq!(post, vec!["/a/0", "/a/1/b", "/a/1", "/a", ""]);
    }

    #[test]
    fn test_for_each_deep_copy_transforms_leaves() {
        let data = json!({ "a": [1, 2], "b": "x" });
        let doubled = for_each_deep_copy(
            &data,
            |v, _, _| match v.as_i64() {
                Some(n) => json!(n * 2),
                None => v,
            },
            false,
        );
        assert_eq!(doubled, json!({ "a": [2, 4], "b": "x" }));
        assert_eq!(data, json!({ "a": [1, 2], "b": "x" }));
    }

    #[test]
    fn test_dict() {
        let data = json!({ "a": { "b": 1 }, "c": [true] });
        let flat = dict(&data);
        assert_eq!(flat.get("/a/b"), Some(&json!(1)));
        assert_eq!(flat.get("/c/0"), Some(&json!(true)));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_is_sub_pointer() {
        assert!(is_sub_pointer("/a", "/a/b", false));
        assert!(is_sub_pointer("", "/a", false));
        assert!(!is_sub_pointer("/a", "/ab", false));
        assert!(!is_sub_pointer("/a", "/a", false));
        assert!(is_sub_pointer("#/a", "/a", true));
        assert!(!is_sub_pointer("bad", "/a", true));
    }

    #[test]
    fn test_parse_object_path() {
        assert_eq!(
            parse_object_path(r#"a.b[0]["c.d"]"#).unwrap(),
            vec!["a", "b", "0", "c.d"]
        );
        assert_eq!(parse_object_path("['x']").unwrap(), vec!["x"]);
        assert_eq!(parse_object_path("tags[]").unwrap(), vec!["tags", ""]);
        assert_eq!(parse_object_path(r#"a["q\"x"].b"#).unwrap(), vec!["a", "q\"x", "b"]);
        assert_eq!(parse_object_path("/already/pointer").unwrap(), vec!["already", "pointer"]);
        assert_eq!(parse_object_path("name").unwrap(), vec!["name"]);
        assert!(parse_object_path("a['open").is_err());
    }
}
