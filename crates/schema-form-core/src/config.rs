//! Configuration for form building.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options for form building.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `max-depth`, `form-defaults`).
/// This naming convention is part of the public API contract for config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FormOptions {
    /// Append a submit button when the layout does not contain one.
    pub add_submit: bool,
    /// Maximum synthesis depth (stack overflow guard for deep or cyclic schemas).
    pub max_depth: usize,
    /// Upper bound used for `maxItems` when the schema does not declare one.
    pub max_items: usize,
    /// Options applied to every node that does not set them itself
    /// (e.g. `addable`, `orderable`, `removable`, `readonly`, `notitle`).
    pub form_defaults: Map<String, Value>,
}

impl Default for FormOptions {
    fn default() -> Self {
        let mut form_defaults = Map::new();
        form_defaults.insert("addable".to_string(), Value::Bool(true));
        form_defaults.insert("orderable".to_string(), Value::Bool(true));
        form_defaults.insert("removable".to_string(), Value::Bool(true));
        Self {
            add_submit: true,
            max_depth: 50,
            max_items: 1_000_000,
            form_defaults,
        }
    }
}

impl FormOptions {
    /// Look up a global default option.
    pub fn form_default(&self, key: &str) -> Option<&Value> {
        self.form_defaults.get(key)
    }
}
