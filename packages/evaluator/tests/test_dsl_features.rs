/// DSL feature tests through the public API
use genui_common::{load_document, MockFileSystem};
use genui_evaluator::{
    DocumentValidator, EventHandler, ObjectMap, RenderOptions, Runtime, SelectionState, NodeRef,
    VNode, Value,
};
use serde_json::json;
use std::path::Path;

#[test]
fn test_example_list_component() {
    let document = json!({
        "id": "c1",
        "data": { "items": ["a", "b"] },
        "render": {
            "id": "list",
            "type": "ul",
            "children": {
                "id": "li",
                "type": "li",
                "for": { "in": { "$bind": "items" }, "as": "it" },
                "children": { "$bind": "it" }
            }
        }
    });
    let doc = Runtime::default()
        .mount_json(&document, ObjectMap::new())
        .unwrap()
        .render();

    let list = &doc.nodes[0];
    assert_eq!(list.tag(), Some("ul"));
    let texts: Vec<String> = list.children().iter().map(VNode::text_content).collect();
    assert_eq!(texts, vec!["a", "b"]);
}

#[test]
fn test_else_if_branch_wins_over_else() {
    let doc = Runtime::default()
        .mount_json(
            &json!({
                "id": "c",
                "states": { "status": "loading" },
                "render": {
                    "id": "status",
                    "type": "p",
                    "if": { "$exp": "status === 'done'" },
                    "elseIf": { "$exp": "status === 'loading'" },
                    "else": { "id": "error", "type": "p", "children": "Failed" },
                    "children": "Status: ${status}"
                }
            }),
            ObjectMap::new(),
        )
        .unwrap()
        .render();
    assert_eq!(doc.text_content(), "Status: loading");
}

#[test]
fn test_document_loaded_from_disk() {
    let mut fs = MockFileSystem::new();
    fs.add_file(
        "/ui/greeting.json",
        r#"{
            "id": "greeting",
            "props": { "name": "World" },
            "render": { "id": "root", "type": "h1", "children": "Hello, ${props.name}!" }
        }"#,
    );

    let (_, component) = load_document(&fs, Path::new("/ui/greeting.json")).unwrap();
    let doc = Runtime::default().mount(component, ObjectMap::new()).render();
    assert_eq!(doc.text_content(), "Hello, World!");
}

#[test]
fn test_methods_receive_event_arguments() {
    let mounted = Runtime::default()
        .mount_json(
            &json!({
                "id": "search",
                "states": { "query": "" },
                "methods": {
                    "onInput": { "fn": "(value) => setState('query', String(value).toLowerCase())" }
                },
                "render": {
                    "id": "root",
                    "type": "div",
                    "children": [
                        { "id": "box", "type": "input", "props": { "onChange": "onInput", "value": { "$bind": "query" } } },
                        { "id": "echo", "type": "span", "children": "{{ query || 'empty' }}" }
                    ]
                }
            }),
            ObjectMap::new(),
        )
        .unwrap();

    let doc = mounted.render();
    assert_eq!(doc.find_target("echo").map(VNode::text_content), Some("empty".to_string()));

    mounted.dispatch("box", "onChange", &[Value::string("HeLLo")]).unwrap();
    let doc = mounted.last_render();
    assert_eq!(doc.find_target("echo").map(VNode::text_content), Some("hello".to_string()));
    assert_eq!(
        doc.find_target("box").and_then(|input| input.attr("value").cloned()),
        Some(Value::string("hello"))
    );
}

#[test]
fn test_effects_prepare_state_before_first_render() {
    let doc = Runtime::default()
        .mount_json(
            &json!({
                "id": "c",
                "states": { "greeting": "" },
                "effects": [{ "fn": "() => setState('greeting', 'Hi ' + props.who)", "deps": ["who"] }],
                "props": { "who": "Ada" },
                "render": { "id": "root", "type": "p", "children": { "$bind": "greeting" } }
            }),
            ObjectMap::new(),
        )
        .unwrap()
        .render();
    assert_eq!(doc.text_content(), "Hi Ada");
}

#[test]
fn test_selection_outlines_parent_of_selected() {
    let options = RenderOptions {
        selection: Some(SelectionState {
            selected: Some(NodeRef::new("item", vec![0, 1])),
            hovered: None,
        }),
        ..RenderOptions::default()
    };
    let doc = Runtime::new(options)
        .mount_json(
            &json!({
                "id": "c",
                "render": {
                    "id": "root",
                    "type": "div",
                    "children": [{
                        "id": "group",
                        "type": "div",
                        "children": [
                            { "id": "first", "type": "span" },
                            { "id": "item", "type": "span" }
                        ]
                    }]
                }
            }),
            ObjectMap::new(),
        )
        .unwrap()
        .render();

    let outline = |id: &str| {
        doc.find_target(id)
            .and_then(|node| node.attr("style"))
            .map(|style| style.get_own("outline").to_display_string())
    };
    assert_eq!(outline("item").as_deref(), Some("2px solid #3b82f6"));
    assert_eq!(outline("group").as_deref(), Some("1px dotted #9ca3af"));
    assert_eq!(outline("first").as_deref(), Some("none"));
    assert_eq!(outline("root").as_deref(), Some("none"));
}

#[test]
fn test_validator_reports_problems_without_rendering() {
    let warnings = DocumentValidator::new().validate(&json!({
        "id": "c",
        "methods": { "ok": { "fn": "() => 1" }, "bad": { "fn": "(" } },
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "id": "a", "type": "span" },
                { "id": "a", "type": "span" },
                { "type": "span" }
            ]
        }
    }));
    let messages: Vec<String> = warnings.iter().map(ToString::to_string).collect();
    assert_eq!(warnings.iter().filter(|w| w.is_error()).count(), 2, "{:?}", messages);
    assert!(messages.iter().any(|m| m.contains("Duplicate element id `a`")));
}

#[test]
fn test_unknown_handler_names_bind_as_missing() {
    let doc = Runtime::default()
        .mount_json(
            &json!({
                "id": "c",
                "render": { "id": "root", "type": "button", "props": { "onKeyDown": "nothing" } }
            }),
            ObjectMap::new(),
        )
        .unwrap()
        .render();
    assert_eq!(
        doc.nodes[0].event("onKeyDown").map(|binding| &binding.handler),
        Some(&EventHandler::Missing { name: "nothing".to_string() })
    );
}
