//! Criterion benchmarks for form building and item mutation.
//!
//! Fixtures are pre-parsed outside the benchmark loop to measure only the
//! synthesis and mutation logic, not JSON parsing or file I/O.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use schema_form_core::{build_form, FormOptions};

/// Load and parse a fixture schema from the shared test fixtures directory.
fn load_fixture(name: &str) -> Value {
    let fixtures_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/schemas");
    let path = Path::new(fixtures_dir).join(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

fn bench_build_simple(c: &mut Criterion) {
    let schema = load_fixture("simple.json");
    let options = FormOptions::default();

    c.bench_function("build/simple", |b| {
        b.iter(|| build_form(black_box(&schema), None, None, black_box(&options)).unwrap())
    });
}

fn bench_build_kitchen_sink(c: &mut Criterion) {
    let schema = load_fixture("kitchen_sink.json");
    let options = FormOptions::default();

    c.bench_function("build/kitchen_sink", |b| {
        b.iter(|| build_form(black_box(&schema), None, None, black_box(&options)).unwrap())
    });
}

fn bench_build_recursive(c: &mut Criterion) {
    let schema = load_fixture("recursive.json");
    let options = FormOptions::default();

    c.bench_function("build/recursive", |b| {
        b.iter(|| build_form(black_box(&schema), None, None, black_box(&options)).unwrap())
    });
}

fn bench_add_remove_item(c: &mut Criterion) {
    let schema = json!({
        "type": "object",
        "properties": { "tags": { "type": "array", "items": { "type": "string" } } }
    });
    let data = json!({ "tags": ["a", "b", "c"] });
    let form = build_form(&schema, None, Some(&data), &FormOptions::default()).unwrap();
    let button = form.node_context(&[0, 3]).unwrap();
    let added = form.node_context(&[0, 3]).unwrap();

    c.bench_function("mutate/add_remove", |b| {
        b.iter(|| {
            let mut form = form.clone();
            form.add_item(black_box(&button));
            form.remove_item(black_box(&added));
            form
        })
    });
}

criterion_group!(
    benches,
    bench_build_simple,
    bench_build_kitchen_sink,
    bench_build_recursive,
    bench_add_remove_item
);
criterion_main!(benches);
