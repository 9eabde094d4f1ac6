//! Layout synthesis.
//!
//! Two entry points share one [`SynthesisContext`]:
//!
//! - [`synthesize`] walks the schema alone and produces the default layout
//!   for a schema location.
//! - [`merge_layout`] walks an authored layout and completes every node from
//!   the schema, expanding `*` into the schema-only layout.
//!
//! Both register the bookkeeping the renderer and the mutation API need:
//! the data map, the array map, the circular-reference map, and the
//! layout-ref / data-template libraries used when items are added.

mod merge;
mod schema_layout;

pub use merge::merge_layout;
pub use schema_layout::{synthesize, ArrayItem};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FormOptions;
use crate::indexing::{to_indexed_pointer, ArrayMap};
use crate::node::{ControlType, LayoutNode};
use crate::pointer;
use crate::schema;
use crate::widgets::{WidgetHandle, WidgetLibrary};

/// What the data map knows about one generic data location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<ControlType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetHandle>,
}

/// Generic data pointer → data location record.
pub type DataMap = BTreeMap<String, DataMapEntry>;

/// Schema `$ref` → generic data pointer where the cycle was first seen.
pub type CircularRefMap = BTreeMap<String, String>;

/// Template key → layout subtree. `None` while the template is being built.
pub type LayoutRefLibrary = BTreeMap<String, Option<LayoutNode>>;

/// Template key → fresh data for a new item.
pub type DataTemplateLibrary = BTreeMap<String, Value>;

/// Mutable build state threaded through every synthesis call.
pub struct SynthesisContext<'a> {
    pub(crate) schema: &'a Value,
    pub(crate) data: &'a Value,
    pub(crate) widgets: &'a dyn WidgetLibrary,
    pub(crate) options: &'a FormOptions,
    pub array_map: ArrayMap,
    pub data_map: DataMap,
    pub circular_ref_map: CircularRefMap,
    pub layout_ref_library: LayoutRefLibrary,
    pub data_template_library: DataTemplateLibrary,
    /// Set once any node is marked required.
    pub fields_required: bool,
    next_id: usize,
    /// Schema pointers of the `$ref` targets being expanded on this branch.
    ref_trail: Vec<String>,
    /// The `$ref` whose library template is being built. Data pointers are
    /// relative to the template root while this is set.
    library_scope: Option<String>,
    /// Concrete index of every list item being built, outermost first.
    data_indices: Vec<usize>,
    depth: usize,
}

impl<'a> SynthesisContext<'a> {
    pub fn new(
        schema: &'a Value,
        data: &'a Value,
        widgets: &'a dyn WidgetLibrary,
        options: &'a FormOptions,
    ) -> Self {
        Self {
            schema,
            data,
            widgets,
            options,
            array_map: ArrayMap::from_schema(schema, options.max_depth),
            data_map: DataMap::new(),
            circular_ref_map: CircularRefMap::new(),
            layout_ref_library: LayoutRefLibrary::new(),
            data_template_library: DataTemplateLibrary::new(),
            fields_required: false,
            next_id: 1,
            // The root schema is always on the trail: `"$ref": "#"` is a cycle.
            ref_trail: vec![String::new()],
            library_scope: None,
            data_indices: Vec::new(),
            depth: 0,
        }
    }

    /// A fresh node id.
    pub fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn widget(&self, control: &ControlType) -> Option<WidgetHandle> {
        self.widgets.get_widget(control.as_str())
    }

    /// Record (or complete) the data-map entry for a generic data pointer.
    ///
    /// Fields already recorded are kept. Nothing is recorded for the root or
    /// while a `$ref` template is being built.
    pub fn register_data(
        &mut self,
        data_pointer: &str,
        schema_pointer: Option<String>,
        input_type: Option<&ControlType>,
    ) {
        if data_pointer.is_empty() || self.library_scope.is_some() {
            return;
        }
        let widget = input_type.and_then(|control| self.widget(control));
        let entry = self.data_map.entry(data_pointer.to_string()).or_default();
        if entry.schema_pointer.is_none() {
            entry.schema_pointer = schema_pointer;
        }
        if entry.input_type.is_none() {
            entry.input_type = input_type.cloned();
            entry.widget = widget;
        }
    }

    /// Store a fresh data template for `key`, built from the schema at
    /// `schema_pointer`.
    pub(crate) fn register_data_template(&mut self, key: &str, schema_pointer: &str) {
        if self.data_template_library.contains_key(key) {
            return;
        }
        let template = pointer::get(self.schema, schema_pointer)
            .map(|s| schema::default_data(self.schema, s))
            .unwrap_or(Value::Null);
        self.data_template_library.insert(key.to_string(), template);
    }

    /// Initial data at a generic data pointer, if present.
    ///
    /// List placeholders are filled from the items being built, so each item
    /// reads its own data.
    pub(crate) fn initial_data(&self, data_pointer: &str) -> Option<&'a Value> {
        if self.library_scope.is_some() {
            return None;
        }
        let indexed = to_indexed_pointer(data_pointer, &self.data_indices, Some(&self.array_map));
        pointer::get(self.data, &indexed)
    }

    /// Run `build` for the list item at `index`.
    pub(crate) fn with_item_index<T>(&mut self, index: usize, build: impl FnOnce(&mut Self) -> T) -> T {
        self.data_indices.push(index);
        let built = build(self);
        self.data_indices.pop();
        built
    }

    /// Library key of the array template appended at `append_pointer`.
    ///
    /// Inside a `$ref` template the key is prefixed with the `$ref`, since
    /// the pointer is relative to the template root.
    pub(crate) fn template_key(&self, append_pointer: &str) -> String {
        match &self.library_scope {
            Some(reference) => format!("{reference}{append_pointer}"),
            None => append_pointer.to_string(),
        }
    }

    pub(crate) fn register_array(&mut self, data_pointer: &str, tuple_items: usize) {
        if self.library_scope.is_none() {
            self.array_map.register(data_pointer, tuple_items);
        }
    }

    fn on_trail(&self, schema_pointer: &str) -> bool {
        self.ref_trail.iter().any(|p| p == schema_pointer)
    }

    /// Enter one more level of recursion. Returns `false` past the limit.
    fn descend(&mut self) -> bool {
        if self.depth >= self.options.max_depth {
            return false;
        }
        self.depth += 1;
        true
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Move the collected bookkeeping out of the context.
    pub fn into_state(self) -> SynthesisState {
        SynthesisState {
            array_map: self.array_map,
            data_map: self.data_map,
            circular_ref_map: self.circular_ref_map,
            layout_ref_library: self.layout_ref_library,
            data_template_library: self.data_template_library,
            fields_required: self.fields_required,
            next_id: self.next_id,
        }
    }
}

/// Bookkeeping left over once synthesis is done.
#[derive(Debug, Clone, Default)]
pub struct SynthesisState {
    pub array_map: ArrayMap,
    pub data_map: DataMap,
    pub circular_ref_map: CircularRefMap,
    pub layout_ref_library: LayoutRefLibrary,
    pub data_template_library: DataTemplateLibrary,
    pub fields_required: bool,
    pub next_id: usize,
}

/// Title of a node without an explicit one: the title-cased name.
pub(crate) fn default_title(name: &str) -> String {
    crate::title::to_title_case(&name.replace('_', " "))
}

/// Give the node a title from `legend` or its name unless it has one.
pub(crate) fn ensure_title(node: &mut LayoutNode) {
    if node.options.title().is_some() {
        return;
    }
    if let Some(legend) = node.options.get_str("legend").map(str::to_string) {
        node.options.set("title", legend);
    } else if let Some(name) = node.name.as_deref() {
        node.options.set("title", default_title(name));
    }
}

/// Text of an array's "Add" button.
pub(crate) fn add_button_title(item_title: Option<&str>, array_title: Option<&str>, name: Option<&str>) -> String {
    match (item_title, array_title, name) {
        (Some(item), _, _) => format!("Add {item}"),
        (None, Some(array), _) => format!("Add to {array}"),
        (None, None, Some(name)) => format!("Add to {}", default_title(name)),
        (None, None, None) => "Add".to_string(),
    }
}
