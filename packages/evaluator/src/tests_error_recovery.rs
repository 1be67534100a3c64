/// Partial rendering with error recovery
///
/// A broken node, expression, method or effect must never take the rest of
/// the tree down with it.
use crate::*;
use serde_json::json;
use std::rc::Rc;

fn mount_with(runtime: Runtime, document: serde_json::Value) -> MountedComponent {
    runtime
        .mount_json(&document, ObjectMap::new())
        .expect("valid component")
}

fn mount(document: serde_json::Value) -> MountedComponent {
    mount_with(Runtime::default(), document)
}

#[test]
fn test_element_missing_id_renders_nothing() {
    let doc = mount(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "id": "a", "type": "span", "children": "A" },
                { "type": "span", "children": "bad" },
                { "id": "c", "type": "span", "children": "C" }
            ]
        }
    }))
    .render();

    let root = &doc.nodes[0];
    assert_eq!(root.children().len(), 2);
    assert_eq!(root.text_content(), "AC");
}

#[test]
fn test_element_missing_type_renders_nothing() {
    let doc = mount(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "children": [{ "id": "typeless" }, "after"]
        }
    }))
    .render();
    assert_eq!(doc.nodes[0].text_content(), "after");
    assert!(doc.find_target("typeless").is_none());
}

#[test]
fn test_invalid_root_renders_empty_document() {
    let doc = mount(json!({ "id": "c", "render": { "type": "div" } })).render();
    assert!(doc.nodes.is_empty());
}

fn failing_registry() -> Rc<ComponentRegistry> {
    let registry = Rc::new(ComponentRegistry::new());
    registry.register(
        "COMP_Broken",
        Rc::new(|_props: &ObjectMap, _children: Vec<VNode>| -> Result<Vec<VNode>, RenderError> {
            Err(RenderError::native("COMP_Broken", "boom"))
        }),
    );
    registry
}

fn native_document() -> serde_json::Value {
    json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "id": "before", "type": "span", "children": "before" },
                { "id": "chart", "type": "COMP_Broken" },
                { "id": "after", "type": "span", "children": "after" }
            ]
        }
    })
}

#[test]
fn test_failing_node_becomes_error_node_in_development() {
    let doc = mount_with(Runtime::default().with_registry(failing_registry()), native_document()).render();
    let children = doc.nodes[0].children();

    assert_eq!(children.len(), 3);
    match &children[1] {
        VNode::Error { message, node_id } => {
            assert!(message.contains("boom"), "unexpected message: {}", message);
            assert_eq!(node_id.as_deref(), Some("chart"));
        }
        other => panic!("Expected Error node, got {:?}", other),
    }
    assert_eq!(doc.nodes[0].text_content(), "beforeafter");
}

#[test]
fn test_failing_node_is_dropped_in_production() {
    let runtime = Runtime::new(RenderOptions::production()).with_registry(failing_registry());
    let doc = mount_with(runtime, native_document()).render();
    let children = doc.nodes[0].children();

    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|child| !child.is_error()));
}

#[test]
fn test_malformed_nested_component_is_isolated() {
    let doc = mount(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "id": "inner", "states": [1, 2], "render": { "id": "x", "type": "span" } },
                { "id": "ok", "type": "span", "children": "ok" }
            ]
        }
    }))
    .render();

    let children = doc.nodes[0].children();
    assert!(children[0].is_error());
    assert_eq!(children[0].id(), Some("inner"));
    assert_eq!(children[1].text_content(), "ok");
}

#[test]
fn test_non_array_loop_source_renders_nothing() {
    let doc = mount(json!({
        "id": "c",
        "data": { "items": "not a list" },
        "render": {
            "id": "root",
            "type": "ul",
            "children": [
                { "id": "row", "type": "li", "for": { "in": { "$bind": "items" }, "as": "item" } },
                { "id": "missing", "type": "li", "for": { "in": { "$bind": "nothing.here" }, "as": "item" } }
            ]
        }
    }))
    .render();
    assert!(doc.nodes[0].children().is_empty());
}

#[test]
fn test_expression_failures_resolve_to_undefined() {
    let doc = mount(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "props": {
                "title": { "$exp": "missing.deep" },
                "label": { "$exp": "(((" }
            },
            "children": [{ "$exp": "window.location" }, "${nope.nothing}|{{ 1 + }}"]
        }
    }))
    .render();

    let root = &doc.nodes[0];
    assert_eq!(root.attr("title"), Some(&Value::Undefined));
    assert_eq!(root.attr("label"), Some(&Value::Undefined));
    assert_eq!(root.text_content(), "|");
}

#[test]
fn test_runaway_array_scripts_fail_only_their_expression() {
    let evaluator = ExpressionEvaluator::new();
    let ctx = Value::from_json(&json!({ "a": [] }));
    assert_eq!(evaluator.evaluate("new Array(5e9).length", &ctx), Value::Undefined);
    assert_eq!(
        evaluator.evaluate("(() => { const b = []; b[9000000000] = 1; return b.length })()", &ctx),
        Value::Undefined
    );
    assert_eq!(
        evaluator.evaluate("(() => { a.push(a); return String(a) })()", &ctx),
        Value::string("")
    );

    let doc = mount(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "$exp": "new Array(5e9).length" },
                { "$exp": "(() => { const n = [[1]]; n[0].push(n); return n.join('-') })()" },
                "|after"
            ]
        }
    }))
    .render();
    assert_eq!(doc.nodes[0].text_content(), "1,|after");
}

#[test]
fn test_broken_method_is_omitted() {
    let mounted = mount(json!({
        "id": "c",
        "states": { "count": 0 },
        "methods": {
            "broken": { "fn": "() => {" },
            "increment": { "fn": "() => setState('count', count + 1)" }
        },
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "id": "a", "type": "button", "props": { "onClick": "broken" } },
                { "id": "b", "type": "button", "props": { "onClick": "increment" } }
            ]
        }
    }));
    assert_eq!(mounted.methods().errors().len(), 1);
    assert_eq!(mounted.methods().errors()[0].name(), "broken");

    let doc = mounted.render();
    assert!(matches!(
        doc.find_target("a").and_then(|a| a.event("onClick")).map(|b| &b.handler),
        Some(EventHandler::Missing { .. })
    ));
    mounted.dispatch("b", "onClick", &[]).unwrap();
    assert_eq!(mounted.state().get("count"), Some(&Value::Number(1.0)));
}

#[test]
fn test_method_runtime_error_reaches_dispatcher() {
    let mounted = mount(json!({
        "id": "c",
        "methods": { "explode": { "fn": "() => { throw new Error('kaboom') }" } },
        "render": { "id": "root", "type": "button", "props": { "onClick": "explode" } }
    }));
    mounted.render();

    match mounted.dispatch("root", "onClick", &[]) {
        Err(DispatchError::Handler { name, source }) => {
            assert_eq!(name, "explode");
            assert!(source.to_string().contains("kaboom"));
        }
        other => panic!("Expected handler error, got {:?}", other),
    }
    assert!(matches!(mounted.trigger("explode", &[]), Err(DispatchError::Handler { .. })));
}

#[test]
fn test_failing_effect_does_not_block_mount() {
    let mounted = mount(json!({
        "id": "c",
        "effects": [
            { "fn": "() => undefinedFunction()" },
            { "fn": "() => setState('ready', true)" }
        ],
        "render": { "id": "root", "type": "div", "if": { "$bind": "ready" }, "children": "ready" }
    }));
    assert_eq!(mounted.effects().executed, 1);
    assert_eq!(mounted.effects().failed.len(), 1);
    assert_eq!(mounted.render().text_content(), "ready");
}

#[test]
fn test_dispatch_errors() {
    let mounted = mount(json!({
        "id": "c",
        "render": { "id": "root", "type": "div" }
    }));
    mounted.render();

    assert!(matches!(
        mounted.dispatch("ghost", "onClick", &[]),
        Err(DispatchError::UnknownTarget { .. })
    ));
    assert!(matches!(
        mounted.dispatch("root", "onClick", &[]),
        Err(DispatchError::NoBinding { .. })
    ));
}

#[test]
fn test_malformed_document_is_rejected_at_mount() {
    let result = Runtime::default().mount_json(
        &json!({ "id": "c", "methods": "nope", "render": { "id": "r", "type": "div" } }),
        ObjectMap::new(),
    );
    assert!(matches!(result, Err(RenderError::InvalidComponent { .. })));
}
