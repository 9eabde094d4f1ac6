//! # schema-form-core
//!
//! Build renderable form layouts from a JSON Schema, an optional authored
//! layout and optional initial data, and keep layout and data consistent
//! while array items are added, removed and reordered.
//!
//! ```
//! use schema_form_core::{build_form, FormOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": { "name": { "type": "string" } }
//! });
//! let form = build_form(&schema, None, None, &FormOptions::default()).unwrap();
//! assert_eq!(form.layout[0].data_pointer.as_deref(), Some("/name"));
//! ```

pub mod config;
pub mod error;
pub mod form;
pub mod indexing;
pub mod node;
pub mod pointer;
pub mod schema;
pub mod synth;
pub mod title;
pub mod tree;
pub mod widgets;

pub use config::FormOptions;
pub use error::{ErrorCode, FormError};
pub use form::{Form, FormBuilder, NodeContext};
pub use indexing::{to_generic_pointer, to_indexed_pointer, ArrayMap};
pub use node::{ArrayItemType, ControlType, DataType, LayoutNode, ListItems, NodeBody, NodeOptions};
pub use synth::{DataMapEntry, SynthesisContext};
pub use widgets::{StandardWidgets, WidgetHandle, WidgetLibrary};

use serde_json::Value;

/// Build a form with the standard widget library.
///
/// See [`FormBuilder::build`].
pub fn build_form(
    schema: &Value,
    layout: Option<&Value>,
    data: Option<&Value>,
    options: &FormOptions,
) -> Result<Form, FormError> {
    FormBuilder::new()
        .with_options(options.clone())
        .build(schema, layout, data)
}
