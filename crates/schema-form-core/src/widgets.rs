//! Widget registry: control-type tags → opaque renderer handles.
//!
//! The engine never looks inside a handle. It only asks whether a tag is
//! registered and which handle to attach to a node, falling back to the
//! registry's default handle for unknown tags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the renderer component for a control type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetHandle(String);

impl WidgetHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Registry consulted by the synthesizer.
pub trait WidgetLibrary {
    /// True when `tag` has its own handle.
    fn has_widget(&self, tag: &str) -> bool;

    /// Handle for `tag`, or the default handle when `tag` is unknown.
    fn get_widget(&self, tag: &str) -> Option<WidgetHandle>;
}

/// The standard tag table, plus any host registrations.
#[derive(Debug, Clone)]
pub struct StandardWidgets {
    widgets: BTreeMap<String, WidgetHandle>,
    default_tag: String,
}

const STANDARD_TAGS: &[(&str, &str)] = &[
    // administrative
    ("root", "root"),
    ("none", "none"),
    ("$ref", "add-reference"),
    // text inputs
    ("email", "input"),
    ("integer", "number"),
    ("number", "number"),
    ("password", "input"),
    ("search", "input"),
    ("tel", "input"),
    ("text", "input"),
    ("url", "input"),
    // special inputs
    ("color", "input"),
    ("date", "input"),
    ("datetime", "input"),
    ("datetime-local", "input"),
    ("month", "input"),
    ("range", "number"),
    ("time", "input"),
    ("week", "input"),
    // non-text inputs
    ("checkbox", "checkbox"),
    ("file", "file"),
    ("hidden", "input"),
    ("reset", "submit"),
    ("submit", "submit"),
    // other controls
    ("button", "button"),
    ("select", "select"),
    ("textarea", "textarea"),
    // control groups
    ("checkboxes", "checkboxes"),
    ("checkboxes-inline", "checkboxes"),
    ("radios", "radios"),
    ("radios-inline", "radios-inline"),
    ("radiobuttons", "radios-inline"),
    // containers
    ("fieldset", "fieldset"),
    ("array", "array"),
    ("tabarray", "tabarray"),
    ("tabs", "tabs"),
    ("tab", "tab"),
    ("section", "section"),
    ("conditional", "section"),
    ("advancedfieldset", "section"),
    ("authfieldset", "section"),
    ("selectfieldset", "section"),
    ("optionfieldset", "section"),
    ("actions", "none"),
    // display only
    ("help", "message"),
    ("message", "message"),
    ("msg", "message"),
    ("template", "template"),
    // aliases
    ("updown", "number"),
    ("date-time", "input"),
    ("alt-datetime", "input"),
    ("alt-date", "input"),
];

impl Default for StandardWidgets {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardWidgets {
    pub fn new() -> Self {
        Self {
            widgets: STANDARD_TAGS
                .iter()
                .map(|(tag, handle)| (tag.to_string(), WidgetHandle::new(*handle)))
                .collect(),
            default_tag: "text".to_string(),
        }
    }

    /// Register (or replace) the handle for `tag`. Empty tags are rejected.
    pub fn register_widget(&mut self, tag: &str, handle: WidgetHandle) -> bool {
        if tag.is_empty() {
            return false;
        }
        self.widgets.insert(tag.to_string(), handle);
        true
    }

    /// Use `tag`'s handle as the fallback. Fails for unregistered tags.
    pub fn set_default_widget(&mut self, tag: &str) -> bool {
        if !self.has_widget(tag) {
            return false;
        }
        self.default_tag = tag.to_string();
        true
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.widgets.keys().map(String::as_str)
    }
}

impl WidgetLibrary for StandardWidgets {
    fn has_widget(&self, tag: &str) -> bool {
        self.widgets.contains_key(tag)
    }

    fn get_widget(&self, tag: &str) -> Option<WidgetHandle> {
        self.widgets
            .get(tag)
            .or_else(|| self.widgets.get(&self.default_tag))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_lookup_and_fallback() {
        let widgets = StandardWidgets::new();
        assert!(widgets.has_widget("datetime-local"));
        assert!(widgets.has_widget("$ref"));
        assert!(!widgets.has_widget("star-rating"));
        assert_eq!(widgets.get_widget("range").unwrap().as_str(), "number");
        assert_eq!(widgets.get_widget("star-rating").unwrap().as_str(), "input");
    }

    #[test]
    fn test_register_and_default() {
        let mut widgets = StandardWidgets::new();
        assert!(!widgets.register_widget("", WidgetHandle::new("x")));
        assert!(widgets.register_widget("star-rating", WidgetHandle::new("stars")));
        assert!(widgets.has_widget("star-rating"));

        assert!(!widgets.set_default_widget("missing"));
        assert!(widgets.set_default_widget("none"));
        assert_eq!(widgets.get_widget("missing").unwrap().as_str(), "none");
    }
}
