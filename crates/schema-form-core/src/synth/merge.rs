//! Completing an authored layout from the schema.
//!
//! Authored items may be full node objects, pointer strings, or dotted
//! object paths. Every item is bound to a generic data pointer, typed and
//! given options from its schema, and array nodes receive the same
//! item-template bookkeeping as synthesized arrays. `"*"` expands in place
//! into the layout synthesized from the whole schema.

use serde_json::Value;

use super::schema_layout::{add_button, array_counts, build_node, synthesize};
use super::{ensure_title, SynthesisContext};
use crate::error::FormError;
use crate::indexing;
use crate::node::{ArrayItemType, ControlType, DataType, LayoutNode, ListItems, NodeBody};
use crate::pointer;
use crate::schema;
use crate::tree::{for_each_node, for_each_node_mut, map_layout, Mapped};

/// Merge an authored layout with the schema.
///
/// Items that are neither strings nor objects are dropped with a warning.
/// A submit button is appended when the options ask for one and the layout
/// has none.
pub fn merge_layout(ctx: &mut SynthesisContext<'_>, authored: &[Value]) -> Vec<LayoutNode> {
    let mut drafts = Vec::with_capacity(authored.len());
    for (index, item) in authored.iter().enumerate() {
        match LayoutNode::from_authored(item) {
            Ok(node) => drafts.push(node),
            Err(e) => tracing::warn!(index, error = %e, "dropping layout item"),
        }
    }

    let mut layout = map_layout(&drafts, |node, _, layout_pointer, _| merge_node(ctx, node, layout_pointer));

    if ctx.options.add_submit {
        let mut has_submit = false;
        for_each_node(&layout, |node, _| has_submit |= node.is_control(&ControlType::Submit));
        if !has_submit {
            let mut submit = LayoutNode::submit("Submit");
            submit.id = ctx.next_id();
            submit.widget = ctx.widget(&ControlType::Submit);
            layout.push(submit);
        }
    }
    layout
}

fn merge_node(ctx: &mut SynthesisContext<'_>, mut node: LayoutNode, layout_pointer: &str) -> Mapped<LayoutNode> {
    node.layout_pointer = indexing::generalize_layout_pointer(layout_pointer);

    if node.data_pointer.is_none() {
        if let Some(key) = node.key.take() {
            node.data_pointer = key_to_pointer(&key);
        } else if node.control.as_ref().is_some_and(ControlType::is_array) {
            node.data_pointer = find_array_pointer(node.items());
        }
    }

    match node.data_pointer.take() {
        Some(wildcard) if wildcard == "*" => {
            Mapped::Many(synthesize(ctx, "", "", &node.layout_pointer, None, false))
        }
        Some(data_pointer) => match pointer::normalize(&data_pointer) {
            Ok(data_pointer) => {
                bind_node(ctx, &mut node, &data_pointer);
                Mapped::Keep(node)
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping layout item with an invalid data pointer");
                Mapped::Drop
            }
        },
        None => {
            node.id = ctx.next_id();
            match &node.control {
                Some(control) => {
                    node.array_item = false;
                    node.widget = ctx.widget(control);
                    schema::update_options(&mut node.options, &Value::Null, &ctx.options.form_defaults);
                }
                None => tracing::warn!(
                    layout_pointer = %node.layout_pointer,
                    "layout item has neither a data binding nor a type"
                ),
            }
            Mapped::Keep(node)
        }
    }
}

/// Data pointer for an authored `key`: `*`, a JSON pointer, or an object
/// path whose empty keys (`list[]`) mean "any item".
fn key_to_pointer(key: &str) -> Option<String> {
    if key == "*" {
        return Some(key.to_string());
    }
    let keys = if pointer::is_json_pointer(key) {
        pointer::parse(key)
    } else {
        pointer::parse_object_path(key)
    };
    match keys {
        Ok(keys) => Some(pointer::compile(&keys, "-")),
        Err(e) => {
            tracing::warn!(key, error = %e, "cannot bind layout key");
            None
        }
    }
}

/// An unbound array node takes its binding from the first descendant bound
/// to an array item.
fn find_array_pointer(items: &[LayoutNode]) -> Option<String> {
    for item in items {
        if let Some(dp) = item.data_pointer.as_deref() {
            if let Some(end) = dp.rfind("/-") {
                return Some(dp[..end].to_string());
            }
        }
        if let Some(found) = find_array_pointer(item.items()) {
            return Some(found);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Bound nodes
// ---------------------------------------------------------------------------

fn bind_node(ctx: &mut SynthesisContext<'_>, node: &mut LayoutNode, data_pointer: &str) {
    let generic = indexing::to_generic_pointer(data_pointer, &ctx.array_map);
    node.id = ctx.next_id();
    node.name = pointer::to_key(&generic).filter(|k| k != "-");
    node.data_pointer = Some(generic.clone());

    let root = ctx.schema;
    let options = ctx.options;
    let defaults = &options.form_defaults;
    let schema_pointer = ctx
        .data_map
        .get(&generic)
        .and_then(|entry| entry.schema_pointer.clone())
        .or_else(|| schema::to_schema_pointer(&generic, root));
    let item_schema = schema_pointer
        .as_deref()
        .and_then(|p| pointer::get(root, p))
        .filter(|s| s.is_object());

    let Some(item_schema) = item_schema else {
        let e = FormError::SchemaMismatch {
            path: generic.clone(),
            message: "data pointer does not resolve against the schema".to_string(),
        };
        tracing::warn!(error = %e, "binding layout item without a schema");
        let control = node.control.get_or_insert(ControlType::Text).clone();
        schema::update_options(&mut node.options, &Value::Null, defaults);
        ensure_title(node);
        node.widget = ctx.widget(&control);
        ctx.register_data(&generic, None, Some(&control));
        return;
    };

    let classified = schema::classify_input_type(item_schema);
    let control = match node.control.take() {
        None => classified,
        Some(authored) if !ctx.widgets.has_widget(authored.as_str()) => {
            let e = FormError::SchemaMismatch {
                path: generic.clone(),
                message: format!("widget type \"{authored}\" not found in library"),
            };
            tracing::warn!(error = %e, replacement = %classified, "replacing unknown widget type");
            classified
        }
        Some(authored) => schema::check_inline_type(authored, &node.options),
    };
    let data_type = schema::schema_type(item_schema);
    node.data_type = data_type;
    schema::update_options(&mut node.options, item_schema, defaults);

    let mut counts = (None, ListItems::Closed);
    let items_schema = item_schema.get("items");
    if control == ControlType::Checkboxes || control == ControlType::CheckboxesInline {
        // Checkbox groups are one control over the item enumeration.
        if let Some(items) = items_schema {
            schema::update_options(&mut node.options, items, defaults);
        }
    } else if data_type == Some(DataType::Array) {
        counts = array_counts(item_schema);
    }
    node.control = Some(control.clone());
    ensure_title(node);
    if schema::is_required(root, &generic) {
        node.options.set("required", true);
        ctx.fields_required = true;
    }
    node.widget = ctx.widget(&control);
    ctx.register_data(&generic, schema_pointer.clone(), Some(&control));

    let container_schema = matches!(data_type, Some(DataType::Object | DataType::Array));
    if !node.has_items() && container_schema && control.is_container() {
        // Nothing authored inside: take the children the schema implies.
        if let Some(schema_pointer) = &schema_pointer {
            let required = node.options.required();
            if let Some(generated) = build_node(ctx, schema_pointer, &generic, &node.layout_pointer, None, required) {
                node.body = generated.body;
            }
        }
    } else if data_type == Some(DataType::Array) && node.has_items() {
        finish_array(ctx, node, item_schema, &generic, counts);
    }
}

// ---------------------------------------------------------------------------
// Authored arrays
// ---------------------------------------------------------------------------

/// Array bookkeeping for an authored array node with authored children.
///
/// Children bound below `<array>/-/` are gathered into one `fieldset` item;
/// a lone child is the item itself. The last item becomes the template for
/// new items, and an "Add" button follows the items.
fn finish_array(
    ctx: &mut SynthesisContext<'_>,
    node: &mut LayoutNode,
    schema: &Value,
    data_pointer: &str,
    (tuple_items, list_items): (Option<usize>, ListItems),
) {
    let append_pointer = pointer::join(data_pointer, &["-"]);
    let item_schema_pointer = schema::to_schema_pointer(&append_pointer, ctx.schema);
    ctx.register_array(data_pointer, tuple_items.unwrap_or(0));
    ctx.register_data(&append_pointer, item_schema_pointer.clone(), None);

    let min_items = match node.options.get_usize("minItems") {
        Some(n) if n > 0 => n,
        _ => usize::from(node.options.required()),
    };
    let removable = node.options.get_bool("removable") != Some(false);
    let item_layout_pointer = format!("{}/items/-", node.layout_pointer);
    let mut items = node.take_items();

    if items.len() > 1 {
        let member_prefix = format!("{append_pointer}/");
        let (members, mut others): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| {
            item.data_pointer
                .as_deref()
                .is_some_and(|dp| dp.starts_with(&member_prefix))
        });
        for other in &mut others {
            other.array_item = true;
            other.array_item_type = Some(ArrayItemType::List);
            other.options.set("removable", removable && min_items == 0);
        }
        if !members.is_empty() {
            let mut members = members;
            for_each_node_mut(&mut members, |member| {
                if let Some(rest) = member.layout_pointer.strip_prefix(node.layout_pointer.as_str()) {
                    member.layout_pointer = format!("{item_layout_pointer}{rest}");
                }
            });
            let item_type = if tuple_items.unwrap_or(0) > others.len() {
                ArrayItemType::Tuple
            } else {
                ArrayItemType::List
            };
            let mut wrapper = LayoutNode::new(ControlType::Fieldset);
            wrapper.id = ctx.next_id();
            wrapper.data_pointer = Some(append_pointer.clone());
            wrapper.layout_pointer = item_layout_pointer.clone();
            wrapper.array_item = true;
            wrapper.array_item_type = Some(item_type);
            wrapper.options.set("removable", removable && min_items <= others.len());
            wrapper.widget = ctx.widget(&ControlType::Fieldset);
            wrapper.body = NodeBody::Group { items: members };
            others.push(wrapper);
        }
        items = others;
    } else if let Some(first) = items.first_mut() {
        first.array_item = true;
        if first.data_pointer.is_none() {
            first.data_pointer = Some(indexing::to_generic_pointer(&append_pointer, &ctx.array_map));
        }
        if min_items > 0 {
            first.options.set("removable", false);
        } else {
            first.options.set_if_absent("removable", true);
        }
        first.array_item_type = Some(if tuple_items.is_some() {
            ArrayItemType::Tuple
        } else {
            ArrayItemType::List
        });
    }

    let addable = node.options.get_bool("addable") != Some(false);
    if let (true, Some(template)) = (addable, items.last().cloned()) {
        let key = ctx.template_key(&append_pointer);
        let data_len = ctx
            .initial_data(data_pointer)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        for _ in items.len()..data_len {
            let mut extra = template.clone();
            for_each_node_mut(std::slice::from_mut(&mut extra), |n| n.id = ctx.next_id());
            items.push(extra);
        }
        ctx.layout_ref_library.insert(key.clone(), Some(template));
        if let Some(item_schema_pointer) = &item_schema_pointer {
            ctx.register_data_template(&key, item_schema_pointer);
        }

        let title = match (node.options.title(), node.name.as_deref()) {
            (Some(title), _) => format!("Add {title}"),
            (None, Some(name)) => format!("Add {}", super::default_title(name)),
            (None, None) => match schema::get_from_schema_parent(ctx.schema, data_pointer)
                .and_then(|p| p.get("title"))
                .and_then(Value::as_str)
            {
                Some(parent_title) => format!("Add to {parent_title}"),
                None => "Add".to_string(),
            },
        };
        let max_items = schema.get("maxItems").and_then(Value::as_u64);
        let mut button = add_button(
            ctx,
            &append_pointer,
            &item_layout_pointer,
            &key,
            title,
            (tuple_items, list_items),
            max_items,
        );
        if let Some(style) = take_add_style(node) {
            button.options.set("fieldStyle", style);
        }
        items.push(button);
    }

    node.body = NodeBody::Array {
        items,
        tuple_items,
        list_items,
    };
}

/// Move `style.add` off an array node; it styles the "Add" button.
fn take_add_style(node: &mut LayoutNode) -> Option<Value> {
    let mut style = node.options.remove("style")?;
    let add = match style.as_object_mut() {
        Some(s) if s.get("add").is_some_and(Value::is_string) => s.shift_remove("add"),
        _ => None,
    };
    if !style.as_object().is_some_and(serde_json::Map::is_empty) {
        node.options.set("style", style);
    }
    add
}

// ===========================================================================
// Tests
// ===========================================================================
