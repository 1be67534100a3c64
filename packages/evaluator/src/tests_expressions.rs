/// Expression, binding and interpolation behavior as seen through rendering
use crate::*;
use serde_json::json;

fn context(data: serde_json::Value) -> Value {
    Value::from_json(&data)
}

fn text_of(data: serde_json::Value, children: serde_json::Value) -> String {
    Runtime::default()
        .mount_json(
            &json!({
                "id": "c",
                "data": data,
                "render": { "id": "root", "type": "div", "children": children }
            }),
            ObjectMap::new(),
        )
        .unwrap()
        .render()
        .text_content()
}

#[test]
fn test_path_resolution_is_deterministic() {
    let ctx = context(json!({ "a": { "b": [10, { "c": "deep" }] }, "n": 0 }));
    for path in ["a.b.1.c", "a.b.0", "a.x.y", "", "n.toString", "a..b"] {
        let first = resolve_path(path, &ctx);
        let second = resolve_path(path, &ctx);
        assert_eq!(first, second, "path `{}` differs between calls", path);
    }
    assert_eq!(resolve_path("a.b.1.c", &ctx), Value::string("deep"));
    assert_eq!(resolve_path("a.x.y", &ctx), Value::Undefined);
}

#[test]
fn test_plain_strings_interpolate_unchanged() {
    let resolver = DataResolver::new();
    let ctx = context(json!({ "name": "Ada" }));
    for text in ["plain text", "", "$ {not a marker}", "{ single }", "100% {sure}"] {
        assert_eq!(resolver.interpolate(text, &ctx), text);
    }
}

#[test]
fn test_unknown_identifiers_are_undefined() {
    let evaluator = ExpressionEvaluator::new();
    let empty = context(json!({}));
    assert_eq!(evaluator.evaluate("window.location", &empty), Value::Undefined);
    assert_eq!(evaluator.evaluate("process.env", &empty), Value::Undefined);
    assert_eq!(evaluator.evaluate("fetch('/x')", &empty), Value::Undefined);
    assert!(evaluator.try_evaluate("window.location", &empty).is_err());
}

#[test]
fn test_flattened_names_in_expressions() {
    let text = text_of(
        json!({ "user": { "name": "Ada", "age": 36 } }),
        json!([
            { "$exp": "name" },
            " ",
            { "$exp": "user_age + 1" },
            " ",
            { "$exp": "data.user.name.length" }
        ]),
    );
    assert_eq!(text, "Ada 37 3");
}

#[test]
fn test_whitelisted_builtins() {
    let text = text_of(
        json!({ "items": [3, 1, 2], "price": 4.5 }),
        json!([
            { "$exp": "items.filter(i => i > 1).map(i => i * 10).join(',')" },
            "|",
            { "$exp": "Math.max(...items)" },
            "|",
            { "$exp": "JSON.stringify({ a: items.length })" },
            "|",
            { "$exp": "price.toFixed(2)" },
            "|",
            { "$exp": "sort(items, (a, b) => a - b)[0]" }
        ]),
    );
    assert_eq!(text, "30,20|3|{\"a\":3}|4.50|1");
}

#[test]
fn test_operators_and_templates() {
    let text = text_of(
        json!({ "count": 2, "label": null }),
        json!([
            { "$exp": "count > 1 ? `${count} items` : 'one item'" },
            "|",
            { "$exp": "label ?? 'none'" },
            "|",
            { "$exp": "label?.length" },
            "|",
            "{{ count * 3 }}"
        ]),
    );
    assert_eq!(text, "2 items|none||6");
}

#[test]
fn test_expression_interpolation_falls_back_to_paths() {
    let resolver = DataResolver::new();
    let ctx = context(json!({ "items": ["x", "y"], "user": { "first": "Ada" } }));
    assert_eq!(resolver.interpolate("{{ items.1 }}", &ctx), "y");
    assert_eq!(resolver.interpolate("${user.first} & {{ user.first + '!' }}", &ctx), "Ada & Ada!");
}

#[test]
fn test_binding_transforms_are_ignored() {
    let resolver = DataResolver::new();
    let ctx = context(json!({ "price": 5 }));
    let value = json!({ "$bind": "price", "$transform": [{ "name": "currency" }] });
    assert_eq!(resolver.resolve(&value, &ctx), Value::Number(5.0));
}

#[test]
fn test_expressions_do_not_mutate_context() {
    let evaluator = ExpressionEvaluator::new();
    let ctx = context(json!({ "count": 1 }));
    evaluator.evaluate("count = 5", &ctx);
    assert_eq!(ctx.get_own("count"), Value::Number(1.0));
}
