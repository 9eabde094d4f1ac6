//! Integration tests for the mutation API: adding, removing and moving
//! items keeps the layout, the data and the bookkeeping maps consistent.

use schema_form_core::{build_form, ControlType, Form, FormOptions, LayoutNode, NodeContext};
use serde_json::{json, Value};

fn tags_schema(extra: Value) -> Value {
    let mut tags = json!({ "type": "array", "items": { "type": "string" } });
    if let (Some(tags), Value::Object(extra)) = (tags.as_object_mut(), extra) {
        tags.extend(extra);
    }
    json!({ "type": "object", "properties": { "tags": tags } })
}

fn build(schema: &Value, data: Value) -> Form {
    build_form(schema, None, Some(&data), &FormOptions::default()).expect("build should succeed")
}

/// The node's renderer shape without its id.
fn shape(node: &LayoutNode) -> Value {
    let mut value = node.to_value();
    if let Some(map) = value.as_object_mut() {
        map.remove("_id");
    }
    value
}

fn ctx(form: &Form, layout_index: &[usize]) -> NodeContext {
    form.node_context(layout_index).expect("layout index should exist")
}

// ── Add / remove ────────────────────────────────────────────────────────────

#[test]
fn test_remove_then_add_restores_item_shape() {
    let mut form = build(&tags_schema(json!({})), json!({ "tags": ["a", "b"] }));
    let original = shape(&form.layout[0].items()[1]);

    assert!(form.remove_item(&ctx(&form, &[0, 1])));
    assert_eq!(form.data, json!({ "tags": ["a"] }));
    assert_eq!(form.layout[0].items().len(), 2);

    assert!(form.add_item(&ctx(&form, &[0, 1])));
    assert_eq!(form.data["tags"].as_array().map(Vec::len), Some(2));
    assert_eq!(shape(&form.layout[0].items()[1]), original);
    assert!(form.layout[0].items()[2].is_control(&ControlType::Ref));
}

#[test]
fn test_add_stops_at_max_items() {
    let mut form = build(&tags_schema(json!({ "maxItems": 2 })), json!({ "tags": ["a"] }));
    assert!(form.add_item(&ctx(&form, &[0, 1])));
    assert_eq!(form.data, json!({ "tags": ["a", null] }));

    let button = ctx(&form, &[0, 2]);
    assert!(form.node(&button).unwrap().is_control(&ControlType::Ref));
    assert!(!form.add_item(&button));
    assert_eq!(form.layout[0].items().len(), 3);
}

#[test]
fn test_pinned_items_are_not_removable() {
    let mut form = build(&tags_schema(json!({ "minItems": 1 })), json!({ "tags": ["a"] }));
    assert!(!form.remove_item(&ctx(&form, &[0, 0])));
    assert_eq!(form.data, json!({ "tags": ["a"] }));

    // The add button itself is never removable.
    assert!(!form.remove_item(&ctx(&form, &[0, 1])));
}

#[test]
fn test_added_object_item_gets_template_data() {
    let schema = json!({
        "type": "object",
        "properties": {
            "phones": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "kind": { "type": "string", "default": "home" },
                        "number": { "type": "string" }
                    }
                }
            }
        }
    });
    let mut form = build(&schema, json!({ "phones": [{ "kind": "work" }] }));
    assert!(form.add_item(&ctx(&form, &[0, 1])));
    assert_eq!(
        form.data,
        json!({ "phones": [{ "kind": "work" }, { "kind": "home" }] })
    );

    let added = &form.layout[0].items()[1];
    assert_eq!(added.data_pointer.as_deref(), Some("/phones/-"));
    let kind = ctx(&form, &[0, 1, 0]);
    assert_eq!(form.data_pointer(&kind).as_deref(), Some("/phones/1/kind"));
    assert_eq!(form.value(&kind), Some(&json!("home")));

    let kind = ctx(&form, &[0, 0, 0]);
    assert_eq!(form.value(&kind), Some(&json!("work")));
}

#[test]
fn test_add_after_placeholders_backs_them_with_templates() {
    let schema = tags_schema(json!({ "minItems": 2, "items": { "type": "string", "default": "x" } }));
    let mut form = build(&schema, json!({ "tags": [] }));
    assert_eq!(form.layout[0].items().len(), 3);

    assert!(form.add_item(&ctx(&form, &[0, 2])));
    assert_eq!(form.data, json!({ "tags": ["x", "x", "x"] }));

    let added = ctx(&form, &[0, 2]);
    assert_eq!(form.data_pointer(&added).as_deref(), Some("/tags/2"));
    assert_eq!(form.value(&added), form.data_template_library.get("/tags/-"));
    for i in 0..3 {
        let item = ctx(&form, &[0, i]);
        assert_eq!(form.value(&item), Some(&json!("x")));
    }
    assert!(form.layout[0].items()[3].is_control(&ControlType::Ref));
}

#[test]
fn test_max_items_counts_backed_placeholders() {
    let schema = tags_schema(json!({ "minItems": 2, "maxItems": 3 }));
    let mut form = build(&schema, json!({ "tags": [] }));
    assert_eq!(form.layout[0].items().len(), 3);

    assert!(form.add_item(&ctx(&form, &[0, 2])));
    assert_eq!(form.data, json!({ "tags": [null, null, null] }));

    assert!(!form.add_item(&ctx(&form, &[0, 3])));
    assert_eq!(form.layout[0].items().len(), 4);
    assert_eq!(form.data["tags"].as_array().map(Vec::len), Some(3));
}

#[test]
fn test_update_inside_placeholder_item() {
    let schema = json!({
        "type": "object",
        "properties": {
            "people": {
                "type": "array",
                "minItems": 2,
                "items": { "type": "object", "properties": { "name": { "type": "string" } } }
            }
        }
    });
    let mut form = build(&schema, json!({}));
    let name = ctx(&form, &[0, 1, 0]);
    assert_eq!(form.data_pointer(&name).as_deref(), Some("/people/1/name"));

    assert!(form.update_value(&name, json!("Ann")));
    assert_eq!(form.data, json!({ "people": [{}, { "name": "Ann" }] }));
    assert_eq!(form.value(&name), Some(&json!("Ann")));
}

// ── Recursive templates ─────────────────────────────────────────────────────

#[test]
fn test_recursive_array_item_is_instantiated() {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "tags": { "type": "array", "items": { "type": "string" } },
            "children": { "type": "array", "items": { "$ref": "#" } }
        }
    });
    let mut form = build(&schema, json!({}));
    let children = form
        .layout
        .iter()
        .position(|n| n.data_pointer.as_deref() == Some("/children"))
        .unwrap();
    let button = ctx(&form, &[children, 0]);
    assert!(form.node(&button).unwrap().is_circular());

    assert!(form.add_item(&button));
    assert_eq!(form.data["children"].as_array().map(Vec::len), Some(1));

    let child = &form.layout[children].items()[0];
    assert_eq!(child.data_pointer.as_deref(), Some("/children/-"));
    assert!(child.array_item);
    assert_eq!(child.options.get_bool("removable"), Some(true));
    assert!(form.layout[children].items()[1].is_circular());

    let name = &child.items()[0];
    assert_eq!(name.data_pointer.as_deref(), Some("/children/-/name"));
    assert_eq!(
        form.data_map["/children/-/name"].schema_pointer.as_deref(),
        Some("/properties/name")
    );

    // The nested array template is re-keyed under the new location.
    assert!(form.layout_ref_library.contains_key("/children/-/tags/-"));
    let tags = child
        .items()
        .iter()
        .position(|n| n.data_pointer.as_deref() == Some("/children/-/tags"))
        .unwrap();
    let tag_button = ctx(&form, &[children, 0, tags, 1]);
    assert_eq!(
        form.node(&tag_button).and_then(LayoutNode::reference),
        Some("/children/-/tags/-")
    );
    assert_eq!(form.data_pointer(&tag_button).as_deref(), Some("/children/0/tags/1"));
}

#[test]
fn test_removing_recursive_item_keeps_button() {
    let schema = json!({
        "type": "object",
        "properties": { "children": { "type": "array", "items": { "$ref": "#" } } }
    });
    let mut form = build(&schema, json!({}));
    assert!(form.add_item(&ctx(&form, &[0, 0])));
    assert!(form.add_item(&ctx(&form, &[0, 1])));
    assert_eq!(form.layout[0].items().len(), 3);

    assert!(form.remove_item(&ctx(&form, &[0, 0])));
    assert_eq!(form.layout[0].items().len(), 2);
    assert_eq!(form.data["children"].as_array().map(Vec::len), Some(1));
    assert!(form.layout[0].items()[1].is_circular());
}

// ── Move / update ───────────────────────────────────────────────────────────

#[test]
fn test_move_keeps_layout_and_data_aligned() {
    let mut form = build(&tags_schema(json!({})), json!({ "tags": ["a", "b", "c"] }));
    let ids: Vec<usize> = form.layout[0].items().iter().map(|n| n.id).collect();

    assert!(form.move_item(&ctx(&form, &[0, 2]), 2, 0));
    assert_eq!(form.data, json!({ "tags": ["c", "a", "b"] }));
    let moved: Vec<usize> = form.layout[0].items().iter().map(|n| n.id).collect();
    assert_eq!(moved, vec![ids[2], ids[0], ids[1], ids[3]]);

    for i in 0..3 {
        let item = ctx(&form, &[0, i]);
        assert_eq!(form.data_pointer(&item), Some(format!("/tags/{i}")));
    }
}

#[test]
fn test_move_rejects_non_items() {
    let mut form = build(&tags_schema(json!({})), json!({ "tags": ["a"] }));
    assert!(!form.move_item(&ctx(&form, &[0]), 0, 0));
    assert!(!form.move_item(&ctx(&form, &[0, 0]), 0, 5));
    assert_eq!(form.data, json!({ "tags": ["a"] }));
}

#[test]
fn test_tuple_items_do_not_move() {
    let schema = json!({
        "type": "object",
        "properties": {
            "pair": { "type": "array", "items": [{ "type": "string" }, { "type": "number" }] }
        }
    });
    let mut form = build(&schema, json!({ "pair": ["a", 1] }));
    let ids: Vec<usize> = form.layout[0].items().iter().map(|n| n.id).collect();

    assert!(!form.move_item(&ctx(&form, &[0, 1]), 1, 0));
    assert_eq!(form.data, json!({ "pair": ["a", 1] }));
    let after: Vec<usize> = form.layout[0].items().iter().map(|n| n.id).collect();
    assert_eq!(after, ids);
}

#[test]
fn test_moving_placeholder_backs_its_data() {
    let mut form = build(&tags_schema(json!({ "minItems": 3 })), json!({ "tags": ["a"] }));
    let ids: Vec<usize> = form.layout[0].items().iter().map(|n| n.id).collect();
    assert_eq!(ids.len(), 4);

    assert!(form.move_item(&ctx(&form, &[0, 2]), 2, 1));
    assert_eq!(form.data, json!({ "tags": ["a", null, null] }));
    let moved: Vec<usize> = form.layout[0].items().iter().map(|n| n.id).collect();
    assert_eq!(moved, vec![ids[0], ids[2], ids[1], ids[3]]);

    assert!(form.move_item(&ctx(&form, &[0, 0]), 0, 2));
    assert_eq!(form.data, json!({ "tags": [null, null, "a"] }));
    let last = ctx(&form, &[0, 2]);
    assert_eq!(form.value(&last), Some(&json!("a")));
}

#[test]
fn test_update_value_and_stale_context() {
    let mut form = build(&tags_schema(json!({})), json!({ "tags": ["a"] }));
    assert!(form.update_value(&ctx(&form, &[0, 0]), json!("b")));
    assert_eq!(form.data, json!({ "tags": ["b"] }));

    let stale = NodeContext::new(vec![7, 3], vec![0]);
    assert!(!form.update_value(&stale, json!("c")));
    assert!(!form.remove_item(&stale));
    assert!(!form.add_item(&stale));
    assert_eq!(form.data, json!({ "tags": ["b"] }));
}
