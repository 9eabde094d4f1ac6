//! A built form and the operations that keep its layout and data in step.
//!
//! [`FormBuilder::build`] runs synthesis once and keeps everything the
//! renderer needs: the layout tree, the data model and the bookkeeping maps.
//! The mutation API ([`Form::add_item`], [`Form::remove_item`],
//! [`Form::move_item`], [`Form::update_value`]) addresses nodes through a
//! [`NodeContext`] and returns `false` when the context does not fit the form.

use serde::Serialize;
use serde_json::Value;

use crate::config::FormOptions;
use crate::error::FormError;
use crate::indexing::{to_indexed_pointer, ArrayMap};
use crate::node::{ArrayItemType, ControlType, LayoutNode, NodeBody};
use crate::pointer;
use crate::schema;
use crate::synth::{
    self, default_title, CircularRefMap, DataMap, DataMapEntry, DataTemplateLibrary,
    LayoutRefLibrary, SynthesisContext,
};
use crate::tree::{self, for_each_node, for_each_node_mut};
use crate::widgets::{StandardWidgets, WidgetLibrary};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and runs form building.
pub struct FormBuilder {
    options: FormOptions,
    widgets: Box<dyn WidgetLibrary>,
}

impl Default for FormBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FormBuilder {
    pub fn new() -> Self {
        Self {
            options: FormOptions::default(),
            widgets: Box::new(StandardWidgets::new()),
        }
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_widgets(mut self, widgets: impl WidgetLibrary + 'static) -> Self {
        self.widgets = Box::new(widgets);
        self
    }

    /// Build a form from a schema, an optional authored layout and optional
    /// initial data.
    ///
    /// Without a layout, `["*"]` is used. Without data, the schema defaults
    /// seed the data model. Only a schema root that is not an object is an
    /// error; everything else degrades with a logged warning.
    pub fn build(
        &self,
        schema: &Value,
        layout: Option<&Value>,
        data: Option<&Value>,
    ) -> Result<Form, FormError> {
        if !schema.is_object() {
            return Err(FormError::SchemaMismatch {
                path: String::new(),
                message: "schema root must be an object".to_string(),
            });
        }

        let wildcard = [Value::from("*")];
        let authored: &[Value] = match layout {
            None => &wildcard,
            Some(Value::Array(items)) => items,
            Some(other) => {
                tracing::warn!(layout = %other, "layout must be an array, using the schema layout");
                &wildcard
            }
        };
        let data = match data {
            Some(data) => data.clone(),
            None => schema::default_data(schema, schema),
        };

        let span = tracing::debug_span!("build_form", layout_items = authored.len());
        let _guard = span.enter();

        let mut ctx = SynthesisContext::new(schema, &data, self.widgets.as_ref(), &self.options);
        let layout = synth::merge_layout(&mut ctx, authored);
        let state = ctx.into_state();
        tracing::debug!(
            nodes = layout.len(),
            arrays = state.array_map.len(),
            templates = state.layout_ref_library.len(),
            "form built"
        );

        Ok(Form {
            schema: schema.clone(),
            data,
            layout,
            array_map: state.array_map,
            data_map: state.data_map,
            circular_ref_map: state.circular_ref_map,
            layout_ref_library: state.layout_ref_library,
            data_template_library: state.data_template_library,
            fields_required: state.fields_required,
            next_id: state.next_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// A node addressed by its position in the layout tree and in the data.
///
/// `layout_index` holds the sibling index at every tree level. `data_index`
/// holds the concrete index of every list placeholder in the node's generic
/// data pointer, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeContext {
    pub layout_index: Vec<usize>,
    pub data_index: Vec<usize>,
}

impl NodeContext {
    pub fn new(layout_index: Vec<usize>, data_index: Vec<usize>) -> Self {
        Self {
            layout_index,
            data_index,
        }
    }
}

/// The built form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(skip)]
    schema: Value,
    pub data: Value,
    pub layout: Vec<LayoutNode>,
    pub array_map: ArrayMap,
    pub data_map: DataMap,
    pub circular_ref_map: CircularRefMap,
    pub layout_ref_library: LayoutRefLibrary,
    pub data_template_library: DataTemplateLibrary,
    pub fields_required: bool,
    #[serde(skip)]
    next_id: usize,
}

impl Form {
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// The context of the node at `layout_index`, with its data indices
    /// derived from the list items on the way down.
    pub fn node_context(&self, layout_index: &[usize]) -> Option<NodeContext> {
        let mut data_index = Vec::new();
        let mut siblings = self.layout.as_slice();
        for &i in layout_index {
            let node = siblings.get(i)?;
            if node.array_item && node.data_key().as_deref() == Some("-") {
                data_index.push(i);
            }
            siblings = node.items();
        }
        Some(NodeContext::new(layout_index.to_vec(), data_index))
    }

    /// Contexts of every node, pre-order.
    pub fn node_contexts(&self) -> Vec<NodeContext> {
        let mut contexts = Vec::new();
        for_each_node(&self.layout, |_, layout_pointer| {
            if let Some(ctx) = tree::layout_indices(layout_pointer).and_then(|i| self.node_context(&i)) {
                contexts.push(ctx);
            }
        });
        contexts
    }

    pub fn node(&self, ctx: &NodeContext) -> Option<&LayoutNode> {
        tree::node_at(&self.layout, &ctx.layout_index)
    }

    /// The node's data pointer with the context's indices filled in.
    pub fn data_pointer(&self, ctx: &NodeContext) -> Option<String> {
        let generic = self.node(ctx)?.data_pointer.as_deref()?;
        Some(to_indexed_pointer(generic, &ctx.data_index, Some(&self.array_map)))
    }

    /// Indexed layout pointer of the node (`/0/items/2`).
    pub fn layout_pointer(&self, ctx: &NodeContext) -> String {
        tree::layout_pointer_for(&ctx.layout_index)
    }

    /// Name of the data control: the last key of the indexed data pointer.
    pub fn control_name(&self, ctx: &NodeContext) -> Option<String> {
        self.data_pointer(ctx).as_deref().and_then(pointer::to_key)
    }

    /// The sibling collection holding the node.
    pub fn layout_array(&self, ctx: &NodeContext) -> Option<&[LayoutNode]> {
        match ctx.layout_index.split_last()? {
            (_, []) => Some(self.layout.as_slice()),
            (_, parent) => tree::node_at(&self.layout, parent).map(LayoutNode::items),
        }
    }

    pub fn parent_node(&self, ctx: &NodeContext) -> Option<&LayoutNode> {
        let (_, parent) = ctx.layout_index.split_last()?;
        tree::node_at(&self.layout, parent)
    }

    /// Current data at the node.
    pub fn value(&self, ctx: &NodeContext) -> Option<&Value> {
        pointer::get(&self.data, &self.data_pointer(ctx)?)
    }

    /// Indexed data pointer for a mutation. Placeholders left unfilled are an
    /// error, except a trailing one when `append` is allowed.
    fn concrete_pointer(&self, ctx: &NodeContext, append: bool) -> Result<String, FormError> {
        let invalid = |message: &str| FormError::InvalidContext {
            message: format!("{message} at {}", self.layout_pointer(ctx)),
        };
        let indexed = self
            .data_pointer(ctx)
            .ok_or_else(|| invalid("no data node"))?;
        let keys = pointer::parse(&indexed)?;
        let allowed = if append { keys.len().saturating_sub(1) } else { keys.len() };
        if keys.iter().take(allowed).any(|k| k == "-") {
            return Err(invalid("data index missing"));
        }
        Ok(indexed)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Instantiate the template behind a `$ref` node.
    ///
    /// The new subtree goes in front of the `$ref` node, which stays in place
    /// as the "Add" control. Its data template is inserted at the node's data
    /// location.
    pub fn add_item(&mut self, ctx: &NodeContext) -> bool {
        match self.try_add_item(ctx) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "add_item rejected");
                false
            }
        }
    }

    fn try_add_item(&mut self, ctx: &NodeContext) -> Result<(), FormError> {
        let invalid = |message: String| FormError::InvalidContext { message };
        let node = self
            .node(ctx)
            .ok_or_else(|| invalid(format!("no node at {}", self.layout_pointer(ctx))))?
            .clone();
        let reference = node
            .reference()
            .ok_or_else(|| invalid(format!("{} is not a $ref node", self.layout_pointer(ctx))))?
            .to_string();
        let data_pointer = self.concrete_pointer(ctx, true)?;
        let position = ctx.layout_index.last().copied().unwrap_or_default();

        if node.array_item {
            // Placeholder items in front of the button count as items.
            let len = pointer::get_range(&self.data, &data_pointer, 0, Some(-1))
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
                .max(position);
            if let Some(max) = node.options.get_usize("maxItems") {
                if len >= max {
                    return Err(invalid(format!("{data_pointer} already holds {max} items")));
                }
            }
        } else {
            let siblings = self.layout_array(ctx).unwrap_or_default();
            let present = siblings.iter().any(|s| {
                s.data_pointer == node.data_pointer && !s.is_control(&ControlType::Ref)
            });
            if present {
                return Err(invalid(format!("{data_pointer} is already present")));
            }
        }

        let mut item = self
            .layout_ref_library
            .get(&reference)
            .cloned()
            .flatten()
            .ok_or_else(|| invalid(format!("no template for {reference}")))?;

        if node.is_circular() {
            let data_prefix = node.data_pointer.clone().unwrap_or_default();
            self.localize(&mut item, &reference, &data_prefix, &node.layout_pointer);
            item.name = node.name.clone();
            item.array_item = node.array_item;
            item.array_item_type = node.array_item_type;
            if node.array_item {
                item.options.set("removable", true);
            }
            if item.options.title().is_none() {
                if let Some(name) = &node.name {
                    item.options.set("title", default_title(name));
                }
            }
        }
        self.back_placeholders(ctx, None)?;
        self.assign_ids(&mut item);
        self.register_subtree(&item);

        let template = self
            .data_template_library
            .get(&reference)
            .cloned()
            .unwrap_or(Value::Null);
        pointer::set(&mut self.data, &data_pointer, template, node.array_item)?;

        let siblings = tree::siblings_mut(&mut self.layout, &ctx.layout_index)
            .ok_or_else(|| invalid(format!("no sibling list for {reference}")))?;
        siblings.insert(position.min(siblings.len()), item);
        tracing::debug!(reference, data_pointer, "item added");
        Ok(())
    }

    /// Remove an item from the layout and its data from the data model.
    ///
    /// Array elements after it shift down. Nodes marked not removable are
    /// kept.
    pub fn remove_item(&mut self, ctx: &NodeContext) -> bool {
        match self.try_remove_item(ctx) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "remove_item rejected");
                false
            }
        }
    }

    fn try_remove_item(&mut self, ctx: &NodeContext) -> Result<(), FormError> {
        let at = self.layout_pointer(ctx);
        let node = self.node(ctx).ok_or_else(|| FormError::InvalidContext {
            message: format!("no node at {at}"),
        })?;
        if node.options.get_bool("removable") == Some(false) {
            return Err(FormError::InvalidContext {
                message: format!("{at} is not removable"),
            });
        }
        let data_pointer = self.concrete_pointer(ctx, false)?;
        if pointer::remove(&mut self.data, &data_pointer).is_none() {
            tracing::debug!(data_pointer, "removed item had no data");
        }
        let position = ctx.layout_index.last().copied().unwrap_or_default();
        if let Some(siblings) = tree::siblings_mut(&mut self.layout, &ctx.layout_index) {
            siblings.remove(position);
        }
        Ok(())
    }

    /// Move the list item at `from` to `to` within the array holding the
    /// node, in both the layout and the data.
    pub fn move_item(&mut self, ctx: &NodeContext, from: usize, to: usize) -> bool {
        match self.try_move_item(ctx, from, to) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "move_item rejected");
                false
            }
        }
    }

    fn try_move_item(&mut self, ctx: &NodeContext, from: usize, to: usize) -> Result<(), FormError> {
        let at = self.layout_pointer(ctx);
        let invalid = |message: String| FormError::InvalidContext { message };
        let node = self.node(ctx).ok_or_else(|| invalid(format!("no node at {at}")))?;
        if !node.array_item {
            return Err(invalid(format!("{at} is not an array item")));
        }
        let siblings = self.layout_array(ctx).unwrap_or_default();
        // Tuple positions are fixed by the schema.
        let movable = |i: usize| {
            siblings.get(i).is_some_and(|s| {
                s.array_item
                    && s.array_item_type == Some(ArrayItemType::List)
                    && s.data_key().as_deref() == Some("-")
                    && !s.is_control(&ControlType::Ref)
            })
        };
        if !movable(from) || !movable(to) {
            return Err(invalid(format!("cannot move {from} to {to} under {at}")));
        }

        let data_pointer = self.concrete_pointer(ctx, false)?;
        let array_pointer = pointer::parse(&data_pointer)?;
        let array_pointer = &array_pointer[..array_pointer.len().saturating_sub(1)];
        self.back_placeholders(ctx, Some(from.max(to) + 1))?;
        match pointer::get_keys_mut(&mut self.data, array_pointer) {
            Some(Value::Array(items)) if from < items.len() && to < items.len() => {
                let value = items.remove(from);
                items.insert(to, value);
            }
            _ => return Err(invalid(format!("no data to move under {at}"))),
        }
        if let Some(siblings) = tree::siblings_mut(&mut self.layout, &ctx.layout_index) {
            let moved = siblings.remove(from);
            siblings.insert(to, moved);
        }
        Ok(())
    }

    /// Write a value at the node's data location.
    pub fn update_value(&mut self, ctx: &NodeContext, value: Value) -> bool {
        let result = self.concrete_pointer(ctx, false).and_then(|p| {
            self.back_placeholders(ctx, None)?;
            pointer::set(&mut self.data, &p, value, false)
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "update_value rejected");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Placeholder data
    // -----------------------------------------------------------------------

    /// Give the list items on the way to the node data of their own.
    ///
    /// Items synthesized for `minItems` (or the single default item) have no
    /// data until something is written through them. Every list array on the
    /// path is filled with its item template up to the item on the path. The
    /// node's own array is filled up to `own` items, or up to the node.
    fn back_placeholders(&mut self, ctx: &NodeContext, own: Option<usize>) -> Result<(), FormError> {
        let invalid = |message: String| FormError::InvalidContext { message };
        let mut fills = Vec::new();
        let mut data_index = ctx.data_index.iter();
        let mut siblings = self.layout.as_slice();
        for (depth, &position) in ctx.layout_index.iter().enumerate() {
            let node = siblings
                .get(position)
                .ok_or_else(|| invalid(format!("no node at {}", self.layout_pointer(ctx))))?;
            if node.array_item && node.data_key().as_deref() == Some("-") {
                let Some(&index) = data_index.next() else {
                    break;
                };
                if index > position {
                    return Err(invalid(format!("data index {index} is past layout item {position}")));
                }
                let generic = node.data_pointer.as_deref().unwrap_or_default();
                let mut keys =
                    pointer::parse(&to_indexed_pointer(generic, &ctx.data_index, Some(&self.array_map)))?;
                keys.pop();
                let len = match own {
                    Some(own) if depth + 1 == ctx.layout_index.len() => own.min(siblings.len()),
                    None if depth + 1 == ctx.layout_index.len() => index,
                    _ => index + 1,
                };
                fills.push((pointer::compile_keys(&keys), len, self.item_template(siblings)));
            }
            siblings = node.items();
        }
        for (array_pointer, len, template) in fills {
            self.fill_array(&array_pointer, len, &template)?;
        }
        Ok(())
    }

    /// Data template of the list items among `siblings`, taken from their
    /// "Add" control.
    fn item_template(&self, siblings: &[LayoutNode]) -> Value {
        siblings
            .iter()
            .rev()
            .filter(|s| s.array_item)
            .find_map(LayoutNode::reference)
            .and_then(|reference| self.data_template_library.get(reference))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Pad the array at `array_pointer` to `len` items with `template`,
    /// creating it when missing.
    fn fill_array(&mut self, array_pointer: &str, len: usize, template: &Value) -> Result<(), FormError> {
        match pointer::get(&self.data, array_pointer) {
            Some(Value::Array(items)) if items.len() >= len => return Ok(()),
            Some(Value::Array(_)) => {}
            None | Some(Value::Null) if len == 0 => return Ok(()),
            None | Some(Value::Null) => {
                pointer::set(&mut self.data, array_pointer, Value::Array(Vec::new()), false)?;
            }
            Some(_) => {
                return Err(FormError::SchemaMismatch {
                    path: array_pointer.to_string(),
                    message: "expected an array".to_string(),
                })
            }
        }
        if let Some(Value::Array(items)) = pointer::get_mut(&mut self.data, array_pointer) {
            tracing::debug!(array_pointer, from = items.len(), to = len, "backing placeholder items");
            items.resize(len, template.clone());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Template instantiation
    // -----------------------------------------------------------------------

    /// Move a `$ref` template under `data_prefix` / `layout_prefix`.
    ///
    /// Array templates nested inside it are keyed by `scope` plus a relative
    /// pointer; each one gets a copy under its new absolute key.
    fn localize(&mut self, item: &mut LayoutNode, scope: &str, data_prefix: &str, layout_prefix: &str) {
        let mut nested = Vec::new();
        for_each_node_mut(std::slice::from_mut(item), |n| {
            if let Some(dp) = &n.data_pointer {
                n.data_pointer = Some(format!("{data_prefix}{dp}"));
            }
            n.layout_pointer = format!("{layout_prefix}{}", n.layout_pointer);
            if let NodeBody::Ref {
                reference,
                circular: false,
                ..
            } = &mut n.body
            {
                if let Some(relative) = reference.strip_prefix(scope).filter(|r| r.starts_with('/')) {
                    let key = format!("{data_prefix}{relative}");
                    nested.push((std::mem::replace(reference, key.clone()), key));
                }
            }
        });

        for (scoped, key) in nested {
            if self.layout_ref_library.contains_key(&key) {
                continue;
            }
            let Some(Some(mut template)) = self.layout_ref_library.get(&scoped).cloned() else {
                continue;
            };
            self.localize(&mut template, scope, data_prefix, layout_prefix);
            self.layout_ref_library.insert(key.clone(), Some(template));
            if let Some(data) = self.data_template_library.get(&scoped).cloned() {
                self.data_template_library.insert(key, data);
            }
        }
    }

    fn assign_ids(&mut self, item: &mut LayoutNode) {
        let mut next_id = self.next_id;
        for_each_node_mut(std::slice::from_mut(item), |n| {
            n.id = next_id;
            next_id += 1;
        });
        self.next_id = next_id;
    }

    /// Record data and array locations first seen in an added subtree.
    fn register_subtree(&mut self, item: &LayoutNode) {
        let mut found = Vec::new();
        for_each_node(std::slice::from_ref(item), |n, _| {
            if let Some(dp) = &n.data_pointer {
                let kind = match &n.body {
                    NodeBody::Array { tuple_items, .. } => Added::Array(tuple_items.unwrap_or(0)),
                    NodeBody::Ref {
                        reference,
                        circular: true,
                        ..
                    } => Added::CircularRef(reference.clone()),
                    _ => Added::Plain,
                };
                found.push((dp.clone(), n.control.clone(), n.widget.clone(), kind));
            }
        });
        for (dp, control, widget, kind) in found {
            match kind {
                Added::Array(tuple_items) => self.array_map.register(dp.as_str(), tuple_items),
                Added::CircularRef(reference) => {
                    self.circular_ref_map
                        .entry(reference)
                        .or_insert_with(|| dp.clone());
                }
                Added::Plain => {}
            }
            if !self.data_map.contains_key(&dp) {
                let entry = DataMapEntry {
                    schema_pointer: schema::to_schema_pointer(&dp, &self.schema),
                    input_type: control,
                    widget,
                };
                self.data_map.insert(dp, entry);
            }
        }
    }
}

/// Bookkeeping an added node needs besides its data-map entry.
enum Added {
    Array(usize),
    CircularRef(String),
    Plain,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tags_form(data: Value) -> Form {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        });
        FormBuilder::new().build(&schema, None, Some(&data)).unwrap()
    }

    #[test]
    fn test_non_object_schema_is_rejected() {
        let err = FormBuilder::new().build(&json!([1, 2]), None, None).unwrap_err();
        assert!(matches!(err, FormError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_node_context_derives_data_index() {
        let form = tags_form(json!({ "tags": ["a", "b"] }));
        let ctx = form.node_context(&[0, 1]).unwrap();
        assert_eq!(ctx.data_index, vec![1]);
        assert_eq!(form.data_pointer(&ctx).as_deref(), Some("/tags/1"));
        assert_eq!(form.control_name(&ctx).as_deref(), Some("1"));
        assert_eq!(form.value(&ctx), Some(&json!("b")));
        assert_eq!(form.layout_pointer(&ctx), "/0/items/1");
        assert_eq!(form.parent_node(&ctx).map(|n| n.data_pointer.as_deref()), Some(Some("/tags")));
    }

    #[test]
    fn test_add_item_inserts_before_button() {
        let mut form = tags_form(json!({ "tags": ["a"] }));
        let button = form.node_context(&[0, 1]).unwrap();
        assert!(form.node(&button).unwrap().is_control(&ControlType::Ref));

        assert!(form.add_item(&button));
        assert_eq!(form.data, json!({ "tags": ["a", null] }));
        let items = form.layout[0].items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].control, Some(ControlType::Text));
        assert!(items[2].is_control(&ControlType::Ref));
        assert_ne!(items[1].id, items[0].id);
    }

    #[test]
    fn test_add_item_rejects_non_ref_nodes() {
        let mut form = tags_form(json!({ "tags": ["a"] }));
        let item = form.node_context(&[0, 0]).unwrap();
        assert!(!form.add_item(&item));
        assert_eq!(form.data, json!({ "tags": ["a"] }));
    }

    #[test]
    fn test_remove_item_shifts_data() {
        let mut form = tags_form(json!({ "tags": ["a", "b", "c"] }));
        let second = form.node_context(&[0, 1]).unwrap();
        assert!(form.remove_item(&second));
        assert_eq!(form.data, json!({ "tags": ["a", "c"] }));
        assert_eq!(form.layout[0].items().len(), 3);
    }

    #[test]
    fn test_move_item_reorders_layout_and_data() {
        let mut form = tags_form(json!({ "tags": ["a", "b", "c"] }));
        let first = form.node_context(&[0, 0]).unwrap();
        let moved_id = form.layout[0].items()[0].id;
        assert!(form.move_item(&first, 0, 2));
        assert_eq!(form.data, json!({ "tags": ["b", "c", "a"] }));
        assert_eq!(form.layout[0].items()[2].id, moved_id);

        // The add button is not a position.
        assert!(!form.move_item(&first, 0, 3));
    }

    #[test]
    fn test_update_value_needs_every_index() {
        let mut form = tags_form(json!({ "tags": ["a"] }));
        let ctx = form.node_context(&[0, 0]).unwrap();
        assert!(form.update_value(&ctx, json!("z")));
        assert_eq!(form.data, json!({ "tags": ["z"] }));

        let unindexed = NodeContext::new(vec![0, 0], vec![]);
        assert!(!form.update_value(&unindexed, json!("y")));
        assert_eq!(form.data, json!({ "tags": ["z"] }));
    }

    #[test]
    fn test_out_of_range_data_index_is_rejected() {
        let mut form = tags_form(json!({ "tags": ["a"] }));
        for index in [4_000_000_000, usize::MAX] {
            let ctx = NodeContext::new(vec![0, 0], vec![index]);
            assert!(!form.update_value(&ctx, json!("z")));
            let button = NodeContext::new(vec![0, 1], vec![index]);
            assert!(!form.add_item(&button));
        }
        assert_eq!(form.data, json!({ "tags": ["a"] }));
        assert_eq!(form.layout[0].items().len(), 2);
    }

    #[test]
    fn test_circular_reference_instantiates_under_node() {
        let schema = json!({
            "type": "object",
            "definitions": {
                "person": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "manager": { "$ref": "#/definitions/person" }
                    }
                }
            },
            "properties": { "person": { "$ref": "#/definitions/person" } }
        });
        let mut form = FormBuilder::new().build(&schema, None, None).unwrap();
        let person = &form.layout[0];
        let manager_index = person
            .items()
            .iter()
            .position(|n| n.is_circular())
            .unwrap();
        let ctx = form.node_context(&[0, manager_index]).unwrap();

        assert!(form.add_item(&ctx));
        let added = &form.layout[0].items()[manager_index];
        assert_eq!(added.data_pointer.as_deref(), Some("/person/manager"));
        assert_eq!(added.name.as_deref(), Some("manager"));
        let name = &added.items()[0];
        assert_eq!(name.data_pointer.as_deref(), Some("/person/manager/name"));
        assert!(form.data_map.contains_key("/person/manager/name"));
        assert!(form.data.pointer("/person/manager").is_some());

        // Only one instance per non-array location.
        let ctx = form.node_context(&[0, manager_index + 1]).unwrap();
        assert!(!form.add_item(&ctx));
    }
}
