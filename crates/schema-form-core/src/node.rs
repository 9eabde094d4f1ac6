//! The layout node model.
//!
//! A [`LayoutNode`] carries the fields every node shares (bindings, control
//! type, options) and a [`NodeBody`] that says what kind of tree node it is:
//! a leaf control, a group of children, an array, or a `$ref` placeholder that
//! expands a template from the layout-ref library.
//!
//! Nodes serialize to the camelCase JSON shape renderers consume
//! (`dataPointer`, `layoutPointer`, `tupleItems`, `$ref`, ...), and authored
//! layouts are read from the same shape via [`LayoutNode::from_authored`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::FormError;
use crate::pointer;
use crate::widgets::WidgetHandle;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Control-type tag of a layout node.
///
/// Standard tags get their own variant; anything else a host registers is
/// carried as [`ControlType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlType {
    Text,
    Textarea,
    Number,
    Integer,
    Range,
    Password,
    Email,
    Url,
    Color,
    Date,
    DatetimeLocal,
    Checkbox,
    Checkboxes,
    CheckboxesInline,
    Radios,
    RadiosInline,
    Select,
    Hidden,
    File,
    Fieldset,
    Section,
    Tabs,
    Tab,
    Array,
    Tabarray,
    Ref,
    Submit,
    Button,
    Help,
    Message,
    Custom(String),
}

impl ControlType {
    pub fn as_str(&self) -> &str {
        match self {
            ControlType::Text => "text",
            ControlType::Textarea => "textarea",
            ControlType::Number => "number",
            ControlType::Integer => "integer",
            ControlType::Range => "range",
            ControlType::Password => "password",
            ControlType::Email => "email",
            ControlType::Url => "url",
            ControlType::Color => "color",
            ControlType::Date => "date",
            ControlType::DatetimeLocal => "datetime-local",
            ControlType::Checkbox => "checkbox",
            ControlType::Checkboxes => "checkboxes",
            ControlType::CheckboxesInline => "checkboxes-inline",
            ControlType::Radios => "radios",
            ControlType::RadiosInline => "radios-inline",
            ControlType::Select => "select",
            ControlType::Hidden => "hidden",
            ControlType::File => "file",
            ControlType::Fieldset => "fieldset",
            ControlType::Section => "section",
            ControlType::Tabs => "tabs",
            ControlType::Tab => "tab",
            ControlType::Array => "array",
            ControlType::Tabarray => "tabarray",
            ControlType::Ref => "$ref",
            ControlType::Submit => "submit",
            ControlType::Button => "button",
            ControlType::Help => "help",
            ControlType::Message => "message",
            ControlType::Custom(tag) => tag,
        }
    }

    /// Array-like controls own a list of repeated items.
    pub fn is_array(&self) -> bool {
        matches!(self, ControlType::Array | ControlType::Tabarray)
    }

    /// Controls that hold child controls.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ControlType::Fieldset
                | ControlType::Section
                | ControlType::Tabs
                | ControlType::Tab
                | ControlType::Array
                | ControlType::Tabarray
        )
    }
}

impl FromStr for ControlType {
    type Err = std::convert::Infallible;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(match tag {
            "text" => ControlType::Text,
            "textarea" => ControlType::Textarea,
            "number" => ControlType::Number,
            "integer" => ControlType::Integer,
            "range" => ControlType::Range,
            "password" => ControlType::Password,
            "email" => ControlType::Email,
            "url" => ControlType::Url,
            "color" => ControlType::Color,
            "date" => ControlType::Date,
            "datetime-local" => ControlType::DatetimeLocal,
            "checkbox" => ControlType::Checkbox,
            "checkboxes" => ControlType::Checkboxes,
            "checkboxes-inline" => ControlType::CheckboxesInline,
            "radios" => ControlType::Radios,
            "radios-inline" => ControlType::RadiosInline,
            "select" => ControlType::Select,
            "hidden" => ControlType::Hidden,
            "file" => ControlType::File,
            "fieldset" => ControlType::Fieldset,
            "section" => ControlType::Section,
            "tabs" => ControlType::Tabs,
            "tab" => ControlType::Tab,
            "array" => ControlType::Array,
            "tabarray" => ControlType::Tabarray,
            "$ref" => ControlType::Ref,
            "submit" => ControlType::Submit,
            "button" => ControlType::Button,
            "help" => ControlType::Help,
            "message" => ControlType::Message,
            other => ControlType::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ControlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ControlType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(tag.parse().unwrap_or(ControlType::Text))
    }
}

/// Schema type of the data a node binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    #[serde(rename = "$ref")]
    Ref,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Object => "object",
            DataType::Array => "array",
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Integer => "integer",
            DataType::Boolean => "boolean",
            DataType::Null => "null",
            DataType::Ref => "$ref",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Some(match tag {
            "object" => DataType::Object,
            "array" => DataType::Array,
            "string" => DataType::String,
            "number" => DataType::Number,
            "integer" => DataType::Integer,
            "boolean" => DataType::Boolean,
            "null" => DataType::Null,
            "$ref" => DataType::Ref,
            _ => return None,
        })
    }
}

/// Whether an array element sits at a tuple position or a list position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayItemType {
    Tuple,
    List,
}

/// Open-ended list positions of an array: none, a bounded count, or unbounded.
///
/// Serialized as `false`, a number, or `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListItems {
    #[default]
    Closed,
    Count(usize),
    Unbounded,
}

impl ListItems {
    pub fn to_value(self) -> Value {
        match self {
            ListItems::Closed => Value::Bool(false),
            ListItems::Unbounded => Value::Bool(true),
            ListItems::Count(n) => Value::from(n),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(true) => ListItems::Unbounded,
            Value::Number(n) => n
                .as_u64()
                .map_or(ListItems::Closed, |n| ListItems::Count(n as usize)),
            _ => ListItems::Closed,
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, ListItems::Closed | ListItems::Count(0))
    }
}

fn tuple_items_value(tuple_items: Option<usize>) -> Value {
    tuple_items.map_or(Value::Bool(false), Value::from)
}

fn tuple_items_from(value: Option<&Value>) -> Option<usize> {
    value.and_then(Value::as_u64).map(|n| n as usize)
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Open option record of a node (title, required, removable, minItems, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeOptions(Map<String, Value>);

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.0.get(key).and_then(Value::as_u64).map(|n| n as usize)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set only when the key is absent, so more specific sources win.
    pub fn set_if_absent(&mut self, key: &str, value: impl Into<Value>) {
        if !self.0.contains_key(key) {
            self.0.insert(key.to_string(), value.into());
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn required(&self) -> bool {
        self.get_bool("required").unwrap_or(false)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for NodeOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// What kind of tree node a [`LayoutNode`] is.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeBody {
    /// A single control.
    #[default]
    Leaf,
    /// A container of children (fieldset, section, tabs, ...).
    Group { items: Vec<LayoutNode> },
    /// A repeated list of children bound to an array.
    Array {
        items: Vec<LayoutNode>,
        tuple_items: Option<usize>,
        list_items: ListItems,
    },
    /// A placeholder expanding a library template on demand.
    Ref {
        reference: String,
        circular: bool,
        tuple_items: Option<usize>,
        list_items: ListItems,
    },
}

/// One node of the layout tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutNode {
    /// Unique id, reassigned whenever the node is cloned from a template.
    pub id: usize,
    /// Shorthand binding from an authored layout, before resolution.
    pub key: Option<String>,
    /// Generic data pointer; `None` for decorative nodes.
    pub data_pointer: Option<String>,
    /// Generic position in the layout tree (`/-/items/-`).
    pub layout_pointer: String,
    /// Control type. Only authored nodes that omit `type` lack one before merging.
    pub control: Option<ControlType>,
    pub data_type: Option<DataType>,
    pub name: Option<String>,
    /// The node is one element of an array.
    pub array_item: bool,
    pub array_item_type: Option<ArrayItemType>,
    pub options: NodeOptions,
    pub widget: Option<WidgetHandle>,
    pub body: NodeBody,
}

/// Keys of the node shape that are not folded into `options`.
const STRUCTURAL_KEYS: &[&str] = &[
    "_id",
    "key",
    "dataPointer",
    "layoutPointer",
    "type",
    "dataType",
    "name",
    "arrayItem",
    "arrayItemType",
    "options",
    "items",
    "tabs",
    "widget",
    "tupleItems",
    "listItems",
    "$ref",
    "circularReference",
];

impl LayoutNode {
    pub fn new(control: ControlType) -> Self {
        Self {
            control: Some(control),
            ..Self::default()
        }
    }

    /// A submit button with the given title.
    pub fn submit(title: &str) -> Self {
        let mut node = Self::new(ControlType::Submit);
        node.options.set("title", title);
        node
    }

    pub fn is_control(&self, control: &ControlType) -> bool {
        self.control.as_ref() == Some(control)
    }

    /// Children of group and array nodes; empty for leaves and references.
    pub fn items(&self) -> &[LayoutNode] {
        match &self.body {
            NodeBody::Group { items } | NodeBody::Array { items, .. } => items,
            NodeBody::Leaf | NodeBody::Ref { .. } => &[],
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<LayoutNode>> {
        match &mut self.body {
            NodeBody::Group { items } | NodeBody::Array { items, .. } => Some(items),
            NodeBody::Leaf | NodeBody::Ref { .. } => None,
        }
    }

    pub fn has_items(&self) -> bool {
        !self.items().is_empty()
    }

    /// Take the children out, leaving an empty collection.
    pub fn take_items(&mut self) -> Vec<LayoutNode> {
        self.items_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Replace the children. A leaf becomes a group when given children;
    /// references never hold children.
    pub fn set_items(&mut self, children: Vec<LayoutNode>) {
        if let NodeBody::Group { items } | NodeBody::Array { items, .. } = &mut self.body {
            *items = children;
        } else if matches!(self.body, NodeBody::Leaf) && !children.is_empty() {
            self.body = NodeBody::Group { items: children };
        }
    }

    /// `(tupleItems, listItems)` of array and reference nodes.
    pub fn array_counts(&self) -> (Option<usize>, ListItems) {
        match &self.body {
            NodeBody::Array {
                tuple_items,
                list_items,
                ..
            }
            | NodeBody::Ref {
                tuple_items,
                list_items,
                ..
            } => (*tuple_items, *list_items),
            _ => (None, ListItems::Closed),
        }
    }

    pub fn set_array_counts(&mut self, tuple: Option<usize>, list: ListItems) {
        if let NodeBody::Array {
            tuple_items,
            list_items,
            ..
        }
        | NodeBody::Ref {
            tuple_items,
            list_items,
            ..
        } = &mut self.body
        {
            *tuple_items = tuple;
            *list_items = list;
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match &self.body {
            NodeBody::Ref { reference, .. } => Some(reference),
            _ => None,
        }
    }

    pub fn is_circular(&self) -> bool {
        matches!(self.body, NodeBody::Ref { circular: true, .. })
    }

    // -----------------------------------------------------------------------
    // JSON shape
    // -----------------------------------------------------------------------

    /// Renderer-facing JSON for this node and its subtree.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("_id".to_string(), Value::from(self.id));
        if let Some(key) = &self.key {
            out.insert("key".to_string(), Value::from(key.as_str()));
        }
        if let Some(dp) = &self.data_pointer {
            out.insert("dataPointer".to_string(), Value::from(dp.as_str()));
        }
        out.insert(
            "layoutPointer".to_string(),
            Value::from(self.layout_pointer.as_str()),
        );
        if let Some(control) = &self.control {
            out.insert("type".to_string(), Value::from(control.as_str()));
        }
        if let Some(data_type) = self.data_type {
            out.insert("dataType".to_string(), Value::from(data_type.as_str()));
        }
        if let Some(name) = &self.name {
            out.insert("name".to_string(), Value::from(name.as_str()));
        }
        out.insert("arrayItem".to_string(), Value::Bool(self.array_item));
        if let Some(item_type) = self.array_item_type {
            out.insert(
                "arrayItemType".to_string(),
                Value::from(match item_type {
                    ArrayItemType::Tuple => "tuple",
                    ArrayItemType::List => "list",
                }),
            );
        }
        out.insert(
            "options".to_string(),
            Value::Object(self.options.clone().into_map()),
        );
        if let Some(widget) = &self.widget {
            out.insert("widget".to_string(), Value::from(widget.as_str()));
        }
        match &self.body {
            NodeBody::Leaf => {}
            NodeBody::Group { items } => {
                out.insert("items".to_string(), items_value(items));
            }
            NodeBody::Array {
                items,
                tuple_items,
                list_items,
            } => {
                out.insert("items".to_string(), items_value(items));
                out.insert("tupleItems".to_string(), tuple_items_value(*tuple_items));
                out.insert("listItems".to_string(), list_items.to_value());
            }
            NodeBody::Ref {
                reference,
                circular,
                tuple_items,
                list_items,
            } => {
                out.insert("$ref".to_string(), Value::from(reference.as_str()));
                out.insert("circularReference".to_string(), Value::Bool(*circular));
                if tuple_items.is_some() || list_items.is_open() {
                    out.insert("tupleItems".to_string(), tuple_items_value(*tuple_items));
                    out.insert("listItems".to_string(), list_items.to_value());
                }
            }
        }
        Value::Object(out)
    }

    /// Read one authored layout item.
    ///
    /// Pointer strings bind `dataPointer`, other strings bind `key`. Objects
    /// use the node shape; `tabs` is accepted as an alias of `items`, and
    /// unknown keys are folded into `options`. Anything else is rejected.
    pub fn from_authored(item: &Value) -> Result<Self, FormError> {
        match item {
            Value::String(s) if s.starts_with('/') || s.starts_with("#/") => Ok(Self {
                data_pointer: Some(s.clone()),
                ..Self::default()
            }),
            Value::String(s) => Ok(Self {
                key: Some(s.clone()),
                ..Self::default()
            }),
            Value::Object(map) => Self::from_authored_object(map),
            other => Err(FormError::SchemaMismatch {
                path: String::new(),
                message: format!("layout item must be a string or an object, got {other}"),
            }),
        }
    }

    fn from_authored_object(map: &Map<String, Value>) -> Result<Self, FormError> {
        let str_field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

        let mut node = LayoutNode {
            id: map.get("_id").and_then(Value::as_u64).unwrap_or(0) as usize,
            key: str_field("key"),
            data_pointer: str_field("dataPointer"),
            layout_pointer: str_field("layoutPointer").unwrap_or_default(),
            control: map
                .get("type")
                .and_then(Value::as_str)
                .and_then(|t| t.parse().ok()),
            data_type: map
                .get("dataType")
                .and_then(Value::as_str)
                .and_then(DataType::parse),
            name: str_field("name"),
            array_item: map.get("arrayItem").and_then(Value::as_bool).unwrap_or(false),
            array_item_type: match map.get("arrayItemType").and_then(Value::as_str) {
                Some("tuple") => Some(ArrayItemType::Tuple),
                Some("list") => Some(ArrayItemType::List),
                _ => None,
            },
            options: NodeOptions::new(),
            widget: str_field("widget").map(WidgetHandle::new),
            body: NodeBody::Leaf,
        };

        if let Some(Value::Object(options)) = map.get("options") {
            node.options = NodeOptions::from(options.clone());
        }
        for (key, value) in map {
            if !STRUCTURAL_KEYS.contains(&key.as_str()) {
                node.options.set_if_absent(key, value.clone());
            }
        }

        let children = match map.get("items").or_else(|| map.get("tabs")) {
            Some(Value::Array(items)) => {
                let mut children = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match Self::from_authored(item) {
                        Ok(child) => children.push(child),
                        Err(e) => tracing::warn!(index = i, error = %e, "dropping layout item"),
                    }
                }
                Some(children)
            }
            _ => None,
        };

        let reference = str_field("$ref");
        if reference.is_some() || node.is_control(&ControlType::Ref) {
            node.body = NodeBody::Ref {
                reference: reference.unwrap_or_default(),
                circular: map
                    .get("circularReference")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                tuple_items: tuple_items_from(map.get("tupleItems")),
                list_items: map.get("listItems").map_or(ListItems::Closed, ListItems::from_value),
            };
        } else if node.control.as_ref().is_some_and(ControlType::is_array) {
            node.body = NodeBody::Array {
                items: children.unwrap_or_default(),
                tuple_items: tuple_items_from(map.get("tupleItems")),
                list_items: map.get("listItems").map_or(ListItems::Closed, ListItems::from_value),
            };
        } else if let Some(items) = children {
            node.body = NodeBody::Group { items };
        }
        Ok(node)
    }

    /// Last key of the data pointer.
    pub fn data_key(&self) -> Option<String> {
        self.data_pointer.as_deref().and_then(pointer::to_key)
    }
}

fn items_value(items: &[LayoutNode]) -> Value {
    Value::Array(items.iter().map(LayoutNode::to_value).collect())
}

impl Serialize for LayoutNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LayoutNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        LayoutNode::from_authored(&value).map_err(serde::de::Error::custom)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
