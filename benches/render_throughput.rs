//! End-to-end render throughput.
//!
//! Measures parse-once, render-many of a table template with varying row
//! counts, with and without a macro layout around it.
//!
//! Run benchmarks: `cargo bench --bench render_throughput`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;
use zpt::{Renderer, Value};

const NAMESPACES: &str = r#"xmlns:tal="http://xml.zope.org/namespaces/tal" xmlns:metal="http://xml.zope.org/namespaces/metal""#;

fn table_template() -> String {
    format!(
        r#"<table {NAMESPACES}><tr tal:repeat="row here/rows" tal:attributes="data-number repeat/row/number"><td tal:content="row/id"/><td tal:content="string:${{row/name}} (${{repeat/row/number}})"/><td tal:condition="row/active">active</td></tr></table>"#
    )
}

fn layout_template() -> String {
    format!(
        r#"<html {NAMESPACES}><body metal:define-macro="page"><h1 metal:define-slot="title">Title</h1><div metal:define-slot="content"/></body><body metal:use-macro="template/macros/page"><h1 metal:fill-slot="title" tal:content="here/title"/><ul metal:fill-slot="content"><li tal:repeat="row here/rows" tal:content="row/name"/></ul></body></html>"#
    )
}

fn model(rows: usize) -> Value {
    let rows: Vec<_> = (0..rows)
        .map(|i| json!({"id": i, "name": format!("Row {}", i), "active": i % 3 == 0}))
        .collect();
    Value::from(json!({"title": "Benchmark", "rows": rows}))
}

fn bench_render(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let renderer = Renderer::default();
    let table = renderer
        .parse_template(&table_template(), Some("table.pt"))
        .unwrap_or_else(|e| panic!("table template: {e}"));
    let layout = renderer
        .parse_template(&layout_template(), Some("layout.pt"))
        .unwrap_or_else(|e| panic!("layout template: {e}"));

    let mut group = c.benchmark_group("render");
    for rows in [10usize, 100, 1000] {
        let model = model(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("table", rows), &model, |b, model| {
            b.iter(|| black_box(renderer.render_to_string(&table, model, None)))
        });
        group.bench_with_input(BenchmarkId::new("macro_layout", rows), &model, |b, model| {
            b.iter(|| black_box(renderer.render_to_string(&layout, model, None)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
