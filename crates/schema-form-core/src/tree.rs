//! Layout tree traversal.
//!
//! [`map_layout`] is the one recursive transform used over layout trees: it
//! rebuilds a layout depth-first, children before parents, and lets the
//! callback keep, expand, or drop each node. Positions are reported as
//! indexed layout pointers (`/0/items/2`) that account for earlier expansions
//! and deletions among the siblings.

use serde_json::Value;

use crate::node::LayoutNode;
use crate::pointer::{self, array_index};

// ---------------------------------------------------------------------------
// Tree abstraction
// ---------------------------------------------------------------------------

/// A node type with an ordered collection of child nodes.
pub trait LayoutTree: Clone {
    fn children(&self) -> &[Self];

    fn children_mut(&mut self) -> Option<&mut Vec<Self>>;

    fn set_children(&mut self, children: Vec<Self>);

    fn take_children(&mut self) -> Vec<Self> {
        self.children_mut().map(std::mem::take).unwrap_or_default()
    }
}

impl LayoutTree for LayoutNode {
    fn children(&self) -> &[Self] {
        self.items()
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Self>> {
        self.items_mut()
    }

    fn set_children(&mut self, children: Vec<Self>) {
        self.set_items(children);
    }
}

/// Raw JSON layouts keep children under `items`, or `tabs` as an alias.
impl LayoutTree for Value {
    fn children(&self) -> &[Self] {
        self.get("items")
            .or_else(|| self.get("tabs"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Self>> {
        let key = if self.get("items").is_some() { "items" } else { "tabs" };
        self.get_mut(key).and_then(Value::as_array_mut)
    }

    fn set_children(&mut self, children: Vec<Self>) {
        let key = if self.get("tabs").is_some() && self.get("items").is_none() {
            "tabs"
        } else {
            "items"
        };
        if let Value::Object(map) = self {
            map.insert(key.to_string(), Value::Array(children));
        }
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// What [`map_layout`]'s callback does with a node.
#[derive(Debug)]
pub enum Mapped<T> {
    /// Keep the (possibly modified) node.
    Keep(T),
    /// Replace the node with zero or more nodes, spliced in place.
    Many(Vec<T>),
    /// Remove the node.
    Drop,
}

/// Rebuild `layout` through `f`, children first.
///
/// `f` receives the node (whose children are already mapped), its index
/// among the rebuilt siblings, its indexed layout pointer, and the original
/// untouched root layout. The input is never modified.
pub fn map_layout<T, F>(layout: &[T], mut f: F) -> Vec<T>
where
    T: LayoutTree,
    F: FnMut(T, usize, &str, &[T]) -> Mapped<T>,
{
    map_level(layout.to_vec(), "", layout, &mut f)
}

fn map_level<T, F>(nodes: Vec<T>, parent_pointer: &str, root: &[T], f: &mut F) -> Vec<T>
where
    T: LayoutTree,
    F: FnMut(T, usize, &str, &[T]) -> Mapped<T>,
{
    let mut mapped = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        // Siblings already emitted decide this node's position.
        let index = mapped.len();
        let node_pointer = format!("{parent_pointer}/{index}");
        let children = node.take_children();
        if !children.is_empty() {
            let items_pointer = format!("{node_pointer}/items");
            node.set_children(map_level(children, &items_pointer, root, f));
        }
        match f(node, index, &node_pointer, root) {
            Mapped::Keep(node) => mapped.push(node),
            Mapped::Many(nodes) => mapped.extend(nodes),
            Mapped::Drop => {}
        }
    }
    mapped
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Indexed layout pointer for a path of sibling indices: `[0, 2]` → `/0/items/2`.
pub fn layout_pointer_for(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| format!("/{i}"))
        .collect::<Vec<_>>()
        .join("/items")
}

/// Sibling indices of an indexed layout pointer: `/0/items/2` → `[0, 2]`.
pub fn layout_indices(layout_pointer: &str) -> Option<Vec<usize>> {
    let keys = pointer::parse(layout_pointer).ok()?;
    let mut indices = Vec::with_capacity(keys.len().div_ceil(2));
    for (i, key) in keys.iter().enumerate() {
        if i % 2 == 0 {
            indices.push(array_index(key)?);
        } else if key != "items" && key != "tabs" {
            return None;
        }
    }
    (keys.len() % 2 == 1).then_some(indices)
}

/// The node at a path of sibling indices.
pub fn node_at<'a, T: LayoutTree>(layout: &'a [T], indices: &[usize]) -> Option<&'a T> {
    let (first, rest) = indices.split_first()?;
    rest.iter()
        .try_fold(layout.get(*first)?, |node, i| node.children().get(*i))
}

pub fn node_at_mut<'a, T: LayoutTree>(layout: &'a mut [T], indices: &[usize]) -> Option<&'a mut T> {
    let (first, rest) = indices.split_first()?;
    let mut node = layout.get_mut(*first)?;
    for i in rest {
        node = node.children_mut()?.get_mut(*i)?;
    }
    Some(node)
}

/// The sibling collection that holds the node at `indices`.
pub fn siblings_mut<'a, T: LayoutTree>(
    layout: &'a mut Vec<T>,
    indices: &[usize],
) -> Option<&'a mut Vec<T>> {
    let (_, parent) = indices.split_last()?;
    if parent.is_empty() {
        return Some(layout);
    }
    node_at_mut(layout, parent)?.children_mut()
}

/// Visit every node pre-order with its indexed layout pointer.
pub fn for_each_node<T, F>(layout: &[T], mut f: F)
where
    T: LayoutTree,
    F: FnMut(&T, &str),
{
    fn visit<T: LayoutTree, F: FnMut(&T, &str)>(nodes: &[T], parent: &str, f: &mut F) {
        for (i, node) in nodes.iter().enumerate() {
            let node_pointer = format!("{parent}/{i}");
            f(node, &node_pointer);
            visit(node.children(), &format!("{node_pointer}/items"), f);
        }
    }
    visit(layout, "", &mut f);
}

/// Mutable pre-order visit.
pub fn for_each_node_mut<T, F>(layout: &mut [T], mut f: F)
where
    T: LayoutTree,
    F: FnMut(&mut T),
{
    fn visit<T: LayoutTree, F: FnMut(&mut T)>(nodes: &mut [T], f: &mut F) {
        for node in nodes.iter_mut() {
            f(node);
            if let Some(children) = node.children_mut() {
                visit(children, f);
            }
        }
    }
    visit(layout, &mut f);
}

// ===========================================================================
// Tests
// ===========================================================================
