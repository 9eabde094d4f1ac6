//! Default layout synthesized from the schema alone.
//!
//! Objects become fieldsets of their properties, arrays become array nodes
//! with one node per item plus an "Add" button backed by a library template,
//! and references are expanded inline unless they close a cycle, in which
//! case a `$ref` node points at a template built once under the `$ref`.

use serde_json::Value;

use super::{add_button_title, default_title, ensure_title, SynthesisContext};
use crate::error::FormError;
use crate::node::{ArrayItemType, ControlType, DataType, LayoutNode, ListItems, NodeBody};
use crate::pointer;
use crate::schema;

/// How a node sits inside its parent array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayItem {
    pub item_type: ArrayItemType,
    pub removable: bool,
}

impl ArrayItem {
    pub fn tuple(removable: bool) -> Self {
        Self {
            item_type: ArrayItemType::Tuple,
            removable,
        }
    }

    pub fn list(removable: bool) -> Self {
        Self {
            item_type: ArrayItemType::List,
            removable,
        }
    }
}

/// Synthesize the layout for the schema at `schema_pointer`, bound to the
/// generic `data_pointer` and placed at the generic `layout_pointer` slot.
///
/// Yields nothing for schemas without a type, one node, or, for the root
/// object, the root's children flattened into the slot.
pub fn synthesize(
    ctx: &mut SynthesisContext<'_>,
    schema_pointer: &str,
    data_pointer: &str,
    layout_pointer: &str,
    item: Option<ArrayItem>,
    required: bool,
) -> Vec<LayoutNode> {
    let slot = if layout_pointer.is_empty() { "/-" } else { layout_pointer };
    let flatten = is_flattened_root(ctx, data_pointer);
    match build_node(ctx, schema_pointer, data_pointer, slot, item, required) {
        Some(mut node) if flatten && node.data_type == Some(DataType::Object) => node.take_items(),
        Some(node) => vec![node],
        None => Vec::new(),
    }
}

/// The root object of the live layout is replaced by its children.
fn is_flattened_root(ctx: &SynthesisContext<'_>, data_pointer: &str) -> bool {
    data_pointer.is_empty() && ctx.library_scope.is_none()
}

/// One node (with its subtree) for a schema location, depth-guarded.
pub(super) fn build_node(
    ctx: &mut SynthesisContext<'_>,
    schema_pointer: &str,
    data_pointer: &str,
    layout_pointer: &str,
    item: Option<ArrayItem>,
    required: bool,
) -> Option<LayoutNode> {
    if !ctx.descend() {
        let e = FormError::RecursionDepthExceeded {
            path: data_pointer.to_string(),
            max_depth: ctx.options.max_depth,
        };
        tracing::warn!(error = %e, schema_pointer, "skipping schema node");
        return None;
    }
    let node = build_node_at_depth(ctx, schema_pointer, data_pointer, layout_pointer, item, required);
    ctx.ascend();
    node
}

fn build_node_at_depth(
    ctx: &mut SynthesisContext<'_>,
    schema_pointer: &str,
    data_pointer: &str,
    layout_pointer: &str,
    item: Option<ArrayItem>,
    required: bool,
) -> Option<LayoutNode> {
    let Some(schema) = pointer::get(ctx.schema, schema_pointer) else {
        tracing::warn!(schema_pointer, "schema pointer does not resolve");
        return None;
    };
    if schema.get("$ref").is_some() {
        return build_reference(ctx, schema_pointer, data_pointer, layout_pointer, item, required);
    }

    let data_type = schema::schema_type(schema);
    if data_type.is_none() && schema.get("x-schema-form").is_none() {
        tracing::debug!(schema_pointer, "schema declares no type, no control");
        return None;
    }
    let control = schema::classify_input_type(schema);
    let mut node = new_node(ctx, control, data_pointer, layout_pointer, item, required);
    node.data_type = data_type;
    schema::update_options(&mut node.options, schema, &ctx.options.form_defaults);
    ensure_title(&mut node);
    ctx.register_data(data_pointer, Some(schema_pointer.to_string()), node.control.as_ref());

    match data_type {
        Some(DataType::Object) if node.control.as_ref().is_some_and(ControlType::is_container) => {
            let items = object_children(ctx, schema, schema_pointer, data_pointer, layout_pointer);
            node.set_items(items);
        }
        Some(DataType::Array) if node.control.as_ref().is_some_and(ControlType::is_array) => {
            build_array(ctx, &mut node, schema, schema_pointer, data_pointer, required);
        }
        _ => {}
    }
    Some(node)
}

fn new_node(
    ctx: &mut SynthesisContext<'_>,
    control: ControlType,
    data_pointer: &str,
    layout_pointer: &str,
    item: Option<ArrayItem>,
    required: bool,
) -> LayoutNode {
    let mut node = LayoutNode::new(control);
    node.id = ctx.next_id();
    node.data_pointer = Some(data_pointer.to_string());
    node.layout_pointer = layout_pointer.to_string();
    node.name = pointer::to_key(data_pointer).filter(|k| k != "-");
    node.widget = node.control.as_ref().and_then(|c| ctx.widget(c));
    if let Some(item) = item {
        node.array_item = true;
        node.array_item_type = Some(item.item_type);
        node.options.set("removable", item.removable);
    }
    if required {
        node.options.set("required", true);
        ctx.fields_required = true;
    }
    node
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

fn object_children(
    ctx: &mut SynthesisContext<'_>,
    schema: &Value,
    schema_pointer: &str,
    data_pointer: &str,
    layout_pointer: &str,
) -> Vec<LayoutNode> {
    let child_layout_pointer = if is_flattened_root(ctx, data_pointer) {
        layout_pointer.to_string()
    } else {
        format!("{layout_pointer}/items/-")
    };
    let required_keys: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut items = Vec::new();
    for key in schema::property_order(schema) {
        let child_schema = pointer::join(schema_pointer, &["properties", key.as_str()]);
        let child_data = pointer::join(data_pointer, &[key.as_str()]);
        let required = required_keys.contains(&key.as_str());
        items.extend(build_node(ctx, &child_schema, &child_data, &child_layout_pointer, None, required));
    }

    // Undeclared keys present in the initial data.
    let extra = schema.get("additionalProperties").filter(|v| v.is_object());
    if let (Some(_), Some(Value::Object(data))) = (extra, ctx.initial_data(data_pointer)) {
        let declared = schema.get("properties").and_then(Value::as_object);
        let extra_schema = pointer::join(schema_pointer, &["additionalProperties"]);
        for key in data.keys() {
            if declared.is_some_and(|d| d.contains_key(key)) {
                continue;
            }
            let child_data = pointer::join(data_pointer, &[key.as_str()]);
            let required = required_keys.contains(&key.as_str());
            items.extend(build_node(ctx, &extra_schema, &child_data, &child_layout_pointer, None, required));
        }
    }
    items
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

fn build_array(
    ctx: &mut SynthesisContext<'_>,
    node: &mut LayoutNode,
    schema: &Value,
    schema_pointer: &str,
    data_pointer: &str,
    required: bool,
) {
    let child_layout_pointer = format!("{}/items/-", node.layout_pointer);
    let min_items = match node.options.get_usize("minItems") {
        Some(n) if n > 0 => n,
        _ => usize::from(required),
    };
    let max_items = node
        .options
        .get_usize("maxItems")
        .unwrap_or(ctx.options.max_items);
    let removable = node.options.get_bool("removable").unwrap_or(true);
    let schema_max = schema.get("maxItems").and_then(Value::as_u64);
    let data_len = ctx
        .initial_data(data_pointer)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let append_pointer = pointer::join(data_pointer, &["-"]);

    let (tuple_items, list_items) = array_counts(schema);
    let mut items = Vec::new();
    let additional = match schema.get("items") {
        Some(Value::Array(tuple)) => {
            ctx.register_array(data_pointer, tuple.len());
            for i in 0..tuple.len() {
                let index = i.to_string();
                let item_schema = pointer::join(schema_pointer, &["items", index.as_str()]);
                let item_data = pointer::join(data_pointer, &[index.as_str()]);
                let item = ArrayItem::tuple(removable && i >= min_items);
                items.extend(build_node(ctx, &item_schema, &item_data, &child_layout_pointer, Some(item), false));
            }
            let extra_schema = schema
                .get("additionalItems")
                .filter(|v| v.is_object())
                .map(|_| pointer::join(schema_pointer, &["additionalItems"]));
            if let Some(extra_schema) = &extra_schema {
                for i in tuple.len()..data_len.min(max_items) {
                    let item = ArrayItem::list(removable && i >= min_items);
                    items.extend(ctx.with_item_index(i, |ctx| {
                        build_node(ctx, extra_schema, &append_pointer, &child_layout_pointer, Some(item), false)
                    }));
                }
            }
            extra_schema
        }
        Some(_) => {
            ctx.register_array(data_pointer, 0);
            let item_schema = pointer::join(schema_pointer, &["items"]);
            let count = data_len.max(min_items).max(1).min(max_items);
            for i in 0..count {
                let item = ArrayItem::list(removable && i >= min_items);
                items.extend(ctx.with_item_index(i, |ctx| {
                    build_node(ctx, &item_schema, &append_pointer, &child_layout_pointer, Some(item), false)
                }));
            }
            Some(item_schema)
        }
        None => {
            ctx.register_array(data_pointer, 0);
            None
        }
    };

    let last_is_ref = items.last().is_some_and(|n| n.is_control(&ControlType::Ref));
    let addable = node.options.get_bool("addable") != Some(false);
    match additional {
        Some(item_schema) if items.len() < max_items && addable && !last_is_ref => {
            let key = ctx.template_key(&append_pointer);
            // The template stands for an item past the initial data.
            let template = ctx.with_item_index(data_len, |ctx| {
                build_node(
                    ctx,
                    &item_schema,
                    &append_pointer,
                    &child_layout_pointer,
                    Some(ArrayItem::list(removable)),
                    false,
                )
            });
            if let Some(mut template) = template {
                template.key = None;
                template.name = None;
                let title = add_button_title(
                    template.options.title(),
                    schema.get("title").and_then(Value::as_str),
                    node.name.as_deref(),
                );
                ctx.layout_ref_library.insert(key.clone(), Some(template));
                ctx.register_data_template(&key, &item_schema);
                items.push(add_button(
                    ctx,
                    &append_pointer,
                    &child_layout_pointer,
                    &key,
                    title,
                    (tuple_items, list_items),
                    schema_max,
                ));
            }
        }
        _ if last_is_ref => {
            // A recursive item type is its own "Add" control.
            if let Some(last) = items.last_mut() {
                last.set_array_counts(tuple_items, list_items);
                if let Some(max) = schema_max {
                    last.options.set("maxItems", max);
                }
            }
        }
        _ => {}
    }

    node.body = NodeBody::Array {
        items,
        tuple_items,
        list_items,
    };
}

/// `(tupleItems, listItems)` declared by an array schema.
///
/// Tuple arrays are open only with an `additionalItems` schema; the open
/// count is what `maxItems` leaves after the tuple positions.
pub(super) fn array_counts(schema: &Value) -> (Option<usize>, ListItems) {
    let max = schema.get("maxItems").and_then(Value::as_u64).map(|m| m as usize);
    match schema.get("items") {
        Some(Value::Array(tuple)) => {
            let list_items = match (schema.get("additionalItems").filter(|v| v.is_object()), max) {
                (None, _) => ListItems::Closed,
                (Some(_), Some(max)) => ListItems::Count(max.saturating_sub(tuple.len())),
                (Some(_), None) => ListItems::Unbounded,
            };
            (Some(tuple.len()), list_items)
        }
        Some(_) => (None, max.map_or(ListItems::Unbounded, ListItems::Count)),
        None => (None, ListItems::Closed),
    }
}

/// The trailing `$ref` control that adds an item from the template at `key`.
pub(super) fn add_button(
    ctx: &mut SynthesisContext<'_>,
    append_pointer: &str,
    layout_pointer: &str,
    key: &str,
    title: String,
    (tuple_items, list_items): (Option<usize>, ListItems),
    max_items: Option<u64>,
) -> LayoutNode {
    let mut button = LayoutNode::new(ControlType::Ref);
    button.id = ctx.next_id();
    button.data_pointer = Some(append_pointer.to_string());
    button.layout_pointer = layout_pointer.to_string();
    button.array_item = true;
    button.array_item_type = Some(ArrayItemType::List);
    button.options.set("removable", false);
    button.options.set("title", title);
    if let Some(max) = max_items {
        button.options.set("maxItems", max);
    }
    button.widget = ctx.widget(&ControlType::Ref);
    button.body = NodeBody::Ref {
        reference: key.to_string(),
        circular: false,
        tuple_items,
        list_items,
    };
    button
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// Layout for a `$ref` schema.
///
/// A reference that does not close a cycle is inlined as its target's layout;
/// only a circular one becomes a `$ref` node backed by a library template.
fn build_reference(
    ctx: &mut SynthesisContext<'_>,
    schema_pointer: &str,
    data_pointer: &str,
    layout_pointer: &str,
    item: Option<ArrayItem>,
    required: bool,
) -> Option<LayoutNode> {
    let root = ctx.schema;
    let schema = pointer::get(root, schema_pointer)?;
    let reference = schema.get("$ref").and_then(Value::as_str)?;
    let resolved = schema::resolve_ref(root, reference)
        .and_then(|target| pointer::normalize(reference).map(|p| (target, p)));
    let (target, target_pointer) = match resolved {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, data_pointer, "dropping unresolvable reference");
            return None;
        }
    };

    if !ctx.on_trail(&target_pointer) {
        ctx.ref_trail.push(target_pointer.clone());
        let node = build_node_at_depth(ctx, &target_pointer, data_pointer, layout_pointer, item, required);
        ctx.ref_trail.pop();
        return node;
    }

    tracing::debug!(reference, data_pointer, "circular reference");
    let mut node = new_node(ctx, ControlType::Ref, data_pointer, layout_pointer, item, required);
    node.data_type = Some(DataType::Ref);
    schema::update_options(&mut node.options, schema, &ctx.options.form_defaults);

    let parent = pointer::get_range(root, schema_pointer, 0, Some(-1));
    let title = match (node.options.title(), node.name.as_deref()) {
        (Some(title), _) => format!("Add {title}"),
        (None, Some(name)) => format!("Add {}", default_title(name)),
        (None, None) => match parent.and_then(|p| p.get("title")).and_then(Value::as_str) {
            Some(parent_title) => format!("Add to {parent_title}"),
            None => "Add".to_string(),
        },
    };
    node.options.set("title", title);
    node.options.set("removable", false);
    if let Some(max) = parent.and_then(|p| p.get("maxItems")).and_then(Value::as_u64) {
        node.options.set("maxItems", max);
    }
    node.body = NodeBody::Ref {
        reference: reference.to_string(),
        circular: true,
        tuple_items: None,
        list_items: ListItems::Closed,
    };

    let target_control = schema::classify_input_type(target);
    ctx.register_data(data_pointer, Some(target_pointer.clone()), Some(&target_control));
    if ctx.library_scope.is_none() {
        ctx.circular_ref_map
            .entry(reference.to_string())
            .or_insert_with(|| data_pointer.to_string());
    }
    build_reference_template(ctx, reference, &target_pointer);
    Some(node)
}

/// Build the library template for a circular `$ref` once.
///
/// The entry is seeded with a pending placeholder first, so a reference met
/// again while its template is being built is not entered a second time.
fn build_reference_template(ctx: &mut SynthesisContext<'_>, reference: &str, target_pointer: &str) {
    if ctx.layout_ref_library.contains_key(reference) {
        return;
    }
    ctx.layout_ref_library.insert(reference.to_string(), None);

    let outer_scope = ctx.library_scope.replace(reference.to_string());
    let outer_trail = std::mem::replace(&mut ctx.ref_trail, vec![target_pointer.to_string()]);
    let template = build_node(ctx, target_pointer, "", "", None, false);
    ctx.ref_trail = outer_trail;
    ctx.library_scope = outer_scope;

    ctx.register_data_template(reference, target_pointer);
    match template {
        Some(template) => {
            ctx.layout_ref_library.insert(reference.to_string(), Some(template));
        }
        None => tracing::warn!(reference, "reference template is empty"),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormOptions;
    use crate::synth::SynthesisState;
    use crate::tree::for_each_node;
    use crate::widgets::StandardWidgets;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(schema: &Value, data: &Value, options: &FormOptions) -> (Vec<LayoutNode>, SynthesisState) {
        let widgets = StandardWidgets::new();
        let mut ctx = SynthesisContext::new(schema, data, &widgets, options);
        let layout = synthesize(&mut ctx, "", "", "/-", None, false);
        (layout, ctx.into_state())
    }

    #[test]
    fn test_required_string_property() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        let (layout, state) = run(&schema, &Value::Null, &FormOptions::default());
        assert_eq!(layout.len(), 1);
        let node = &layout[0];
        assert_eq!(node.data_pointer.as_deref(), Some("/name"));
        assert_eq!(node.control, Some(ControlType::Text));
        assert!(node.options.required());
        assert_eq!(node.options.title(), Some("Name"));
        assert_eq!(node.layout_pointer, "/-");
        assert!(state.fields_required);
        assert_eq!(
            state.data_map["/name"].schema_pointer.as_deref(),
            Some("/properties/name")
        );
    }

    #[test]
    fn test_min_items_pins_leading_items() {
        let schema = json!({ "type": "array", "items": { "type": "string" }, "minItems": 2 });
        let (layout, state) = run(&schema, &Value::Null, &FormOptions::default());
        assert_eq!(layout.len(), 1);
        let items = layout[0].items();
        assert_eq!(items.len(), 3);
        for item in &items[..2] {
            assert_eq!(item.control, Some(ControlType::Text));
            assert_eq!(item.options.get_bool("removable"), Some(false));
            assert_eq!(item.data_pointer.as_deref(), Some("/-"));
        }
        let add = &items[2];
        assert_eq!(add.control, Some(ControlType::Ref));
        assert_eq!(add.reference(), Some("/-"));
        assert!(!add.is_circular());
        assert!(state.layout_ref_library.contains_key("/-"));
        assert_eq!(state.array_map.tuple_items(""), Some(0));
    }

    #[test]
    fn test_items_past_min_are_removable() {
        let schema = json!({
            "type": "object",
            "properties": { "tags": { "type": "array", "items": { "type": "string" }, "minItems": 1 } }
        });
        let data = json!({ "tags": ["a", "b", "c"] });
        let (layout, _) = run(&schema, &data, &FormOptions::default());
        let removable: Vec<Option<bool>> = layout[0]
            .items()
            .iter()
            .map(|n| n.options.get_bool("removable"))
            .collect();
        assert_eq!(removable, vec![Some(false), Some(true), Some(true), Some(false)]);
        assert_eq!(layout[0].items()[3].options.title(), Some("Add to Tags"));
    }

    #[test]
    fn test_tuple_array_counts() {
        let schema = json!({
            "type": "object",
            "properties": {
                "pair": {
                    "type": "array",
                    "items": [{ "type": "string" }, { "type": "integer" }],
                    "additionalItems": { "type": "boolean", "title": "Flag" },
                    "maxItems": 4
                }
            }
        });
        let (layout, state) = run(&schema, &Value::Null, &FormOptions::default());
        let pair = &layout[0];
        assert_eq!(pair.array_counts(), (Some(2), ListItems::Count(2)));
        let items = pair.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].data_pointer.as_deref(), Some("/pair/0"));
        assert_eq!(items[0].array_item_type, Some(ArrayItemType::Tuple));
        assert_eq!(items[1].control, Some(ControlType::Integer));
        assert_eq!(items[2].options.title(), Some("Add Flag"));
        assert_eq!(items[2].options.get_usize("maxItems"), Some(4));
        assert_eq!(state.array_map.tuple_items("/pair"), Some(2));
        assert_eq!(state.data_template_library.get("/pair/-"), Some(&Value::Null));
    }

    #[test]
    fn test_self_reference_builds_one_template() {
        let schema = json!({
            "type": "object",
            "properties": { "person": { "$ref": "#/definitions/person" } },
            "definitions": {
                "person": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "manager": { "$ref": "#/definitions/person" }
                    }
                }
            }
        });
        let (layout, state) = run(&schema, &Value::Null, &FormOptions::default());
        let mut circular = Vec::new();
        for_each_node(&layout, |node, _| {
            if node.is_circular() {
                circular.push(node.data_pointer.clone());
            }
        });
        assert_eq!(circular, vec![Some("/person/manager".to_string())]);
        assert_eq!(state.layout_ref_library.len(), 1);
        let template = state.layout_ref_library["#/definitions/person"].as_ref().unwrap();
        assert_eq!(template.data_pointer.as_deref(), Some(""));
        assert_eq!(template.items()[0].data_pointer.as_deref(), Some("/name"));
        assert_eq!(template.items()[0].layout_pointer, "/items/-");
        assert_eq!(
            state.circular_ref_map.get("#/definitions/person").map(String::as_str),
            Some("/person/manager")
        );
    }

    #[test]
    fn test_root_self_reference() {
        let schema = json!({
            "type": "object",
            "properties": { "label": { "type": "string" }, "child": { "$ref": "#" } }
        });
        let (layout, state) = run(&schema, &Value::Null, &FormOptions::default());
        assert_eq!(layout.len(), 2);
        assert!(layout[1].is_circular());
        assert_eq!(layout[1].options.title(), Some("Add Child"));
        assert!(state.layout_ref_library["#"].is_some());
    }

    #[test]
    fn test_property_order_and_untyped_skipped() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" }, "b": {}, "c": { "type": "boolean" } },
            "ui:order": ["c", "*"]
        });
        let (layout, _) = run(&schema, &Value::Null, &FormOptions::default());
        let pointers: Vec<_> = layout.iter().filter_map(|n| n.data_pointer.clone()).collect();
        assert_eq!(pointers, vec!["/c", "/a"]);
    }

    #[test]
    fn test_depth_guard_stops_synthesis() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "type": "object", "properties": {
                    "b": { "type": "object", "properties": { "c": { "type": "string" } } }
                } }
            }
        });
        let options = FormOptions {
            max_depth: 2,
            ..FormOptions::default()
        };
        let (layout, _) = run(&schema, &Value::Null, &options);
        assert_eq!(layout[0].data_pointer.as_deref(), Some("/a"));
        assert!(layout[0].items().is_empty());
    }

    #[test]
    fn test_additional_properties_from_data() {
        let schema = json!({
            "type": "object",
            "properties": {
                "labels": { "type": "object", "properties": {}, "additionalProperties": { "type": "string" } }
            }
        });
        let data = json!({ "labels": { "env": "prod" } });
        let (layout, state) = run(&schema, &data, &FormOptions::default());
        assert_eq!(layout[0].items()[0].data_pointer.as_deref(), Some("/labels/env"));
        assert!(state.data_map.contains_key("/labels/env"));
    }
}
