use criterion::{black_box, criterion_group, criterion_main, Criterion};
use genui_parser::{parse_expression, parse_function, sanitize_source, tokenize, UIComponent};

fn parse_simple_expression(c: &mut Criterion) {
    let source = "items.length > 0 ? `${items.length} items` : 'empty'";

    c.bench_function("parse_simple_expression", |b| {
        b.iter(|| parse_expression(black_box(source)))
    });
}

fn parse_method_body(c: &mut Criterion) {
    let source = r#"(id) => {
        const next = items.map(item => item.id === id ? { ...item, done: !item.done } : item);
        setState('items', next);
        setState('remaining', next.filter(item => !item.done).length);
    }"#;

    c.bench_function("parse_method_body", |b| {
        b.iter(|| parse_function(black_box(source)))
    });
}

fn sanitize_and_parse(c: &mut Criterion) {
    let source = r#"() => { const total: number = items.reduce((sum, x) => sum + (x as any).price, 0); setState(\'total\', total); }"#;

    c.bench_function("sanitize_and_parse", |b| {
        b.iter(|| parse_function(&sanitize_source(black_box(source))))
    });
}

fn deserialize_large_document(c: &mut Criterion) {
    let children: Vec<serde_json::Value> = (0..500)
        .map(|i| {
            serde_json::json!({
                "id": format!("row-{}", i),
                "type": "view",
                "props": { "className": { "$exp": format!("selected === {} ? 'active' : ''", i) } },
                "children": [{ "id": format!("label-{}", i), "type": "text", "children": "Row {{index}}" }]
            })
        })
        .collect();
    let document = serde_json::json!({
        "id": "large",
        "states": { "selected": 0 },
        "render": { "id": "root", "type": "view", "children": children }
    });

    c.bench_function("deserialize_500_rows", |b| {
        b.iter(|| UIComponent::from_json(black_box(&document)))
    });
}

fn tokenize_only(c: &mut Criterion) {
    let source = "user?.profile?.name ?? (first + ' ' + last).trim()";

    c.bench_function("tokenize_only", |b| {
        b.iter(|| tokenize(black_box(source)))
    });
}

criterion_group!(
    benches,
    parse_simple_expression,
    parse_method_body,
    sanitize_and_parse,
    deserialize_large_document,
    tokenize_only
);
criterion_main!(benches);
