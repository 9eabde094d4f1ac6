#![no_main]

use libfuzzer_sys::fuzz_target;
use schema_form_core::{build_form, FormOptions};

// Accepts arbitrary bytes, attempts to parse as JSON, uses the value as both
// schema and layout source, then exercises every mutation on every node.
// Goal: no panics, even on malformed input.
fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let options = FormOptions {
        max_depth: 12,
        ..FormOptions::default()
    };
    let layout = value.get("layout");
    let Ok(mut form) = build_form(&value, layout, None, &options) else {
        return;
    };
    for ctx in form.node_contexts() {
        form.add_item(&ctx);
        form.move_item(&ctx, 0, 1);
        form.remove_item(&ctx);
    }
});
