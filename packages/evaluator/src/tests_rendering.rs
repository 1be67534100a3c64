/// Rendering tests: document -> mounted component -> virtual DOM
use crate::*;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn render(document: serde_json::Value) -> VirtualDomDocument {
    Runtime::default()
        .mount_json(&document, ObjectMap::new())
        .expect("valid component")
        .render()
}

fn external(data: serde_json::Value) -> ObjectMap {
    match &Value::from_json(&data) {
        Value::Object(fields) => fields.borrow().clone(),
        _ => ObjectMap::new(),
    }
}

fn child_keys(node: &VNode) -> Vec<String> {
    node.children()
        .iter()
        .filter_map(VNode::key)
        .map(str::to_string)
        .collect()
}

fn counter_document() -> serde_json::Value {
    json!({
        "id": "counter",
        "states": { "count": 0 },
        "methods": {
            "increment": { "fn": "() => setState('count', count + 1)" }
        },
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "id": "label", "type": "span", "children": { "$bind": "count" } },
                { "id": "btn", "type": "button", "props": { "onClick": "increment" }, "children": "+" }
            ]
        }
    })
}

#[test]
fn test_list_renders_one_item_per_element() {
    let doc = render(json!({
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
    }));

    assert_eq!(doc.nodes.len(), 1);
    let list = &doc.nodes[0];
    assert_eq!(list.tag(), Some("ul"));

    let items = list.children();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.tag() == Some("li")));
    assert_eq!(items[0].text_content(), "a");
    assert_eq!(items[1].text_content(), "b");
    assert_eq!(child_keys(list), vec!["li-0", "li-1"]);
    assert_eq!(items[1].id(), Some("li-1"));
}

fn conditional_text(if_value: serde_json::Value, else_if_value: serde_json::Value) -> String {
    let doc = render(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "children": [{
                "id": "x",
                "type": "p",
                "if": if_value,
                "elseIf": else_if_value,
                "else": { "id": "fallback", "type": "span", "children": "else" },
                "children": "node"
            }]
        }
    }));
    doc.nodes[0].text_content()
}

#[test]
fn test_conditional_precedence() {
    assert_eq!(conditional_text(json!(false), json!(true)), "node");
    assert_eq!(conditional_text(json!(false), json!(false)), "else");
    assert_eq!(conditional_text(json!(true), json!(false)), "node");
    assert_eq!(conditional_text(json!(0), json!(null)), "else");
}

#[test]
fn test_conditions_resolve_against_state() {
    let doc = render(json!({
        "id": "c",
        "states": { "count": 3 },
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                { "id": "many", "type": "span", "if": { "$exp": "count > 1" }, "children": "many" },
                { "id": "none", "type": "span", "if": { "$exp": "count === 0" }, "children": "none" }
            ]
        }
    }));
    assert_eq!(doc.nodes[0].text_content(), "many");
    assert!(doc.find_target("none").is_none());
}

#[test]
fn test_loop_keys_are_stable() {
    let document = json!({
        "id": "c",
        "render": {
            "id": "list",
            "type": "ul",
            "children": {
                "id": "row",
                "type": "li",
                "for": { "in": { "$bind": "todos" }, "as": "todo", "key": "todo.id" },
                "children": { "$bind": "todo.title" }
            }
        }
    });
    let todos = external(json!({
        "todos": [
            { "id": 1, "title": "one" },
            { "id": 2, "title": "two" },
            { "id": 3, "title": "three" }
        ]
    }));
    let mounted = Runtime::default().mount_json(&document, todos).unwrap();

    let first = mounted.render();
    let second = mounted.render();
    assert_eq!(child_keys(&first.nodes[0]), vec!["1", "2", "3"]);
    assert_eq!(child_keys(&first.nodes[0]), child_keys(&second.nodes[0]));

    mounted.set_external_data(external(json!({
        "todos": [{ "id": 1, "title": "one" }, { "id": 3, "title": "three" }]
    })));
    assert!(mounted.needs_render());
    let third = mounted.render();
    assert_eq!(child_keys(&third.nodes[0]), vec!["1", "3"]);
    assert_eq!(third.find_target("3").map(VNode::text_content), Some("three".to_string()));
}

#[test]
fn test_duplicate_loop_keys_are_made_unique() {
    let doc = render(json!({
        "id": "c",
        "data": { "rows": [{ "id": 7 }, { "id": 7 }, { "id": 8 }] },
        "render": {
            "id": "list",
            "type": "ul",
            "children": {
                "id": "row",
                "type": "li",
                "for": { "in": { "$bind": "rows" }, "as": "row", "index": "i", "key": "row.id" },
                "children": "${i}"
            }
        }
    }));
    assert_eq!(child_keys(&doc.nodes[0]), vec!["7", "7-1", "8"]);
    assert_eq!(doc.nodes[0].text_content(), "012");
}

#[test]
fn test_loop_over_literal_array_with_expression_key() {
    let doc = render(json!({
        "id": "c",
        "render": {
            "id": "list",
            "type": "ul",
            "children": {
                "id": "row",
                "type": "li",
                "for": { "in": ["x", "y"], "as": "letter", "key": { "$exp": "letter.toUpperCase()" } },
                "children": "{{ letter }}"
            }
        }
    }));
    assert_eq!(child_keys(&doc.nodes[0]), vec!["X", "Y"]);
    assert_eq!(doc.nodes[0].text_content(), "xy");
}

#[test]
fn test_children_forms() {
    let doc = render(json!({
        "id": "c",
        "data": { "user": { "name": "Ada" }, "items": [1, 2] },
        "render": {
            "id": "root",
            "type": "div",
            "children": [
                "Hello ${user.name}! ",
                3,
                true,
                null,
                { "$exp": "items.length * 2" },
                { "$bind": "user.missing" },
                ["-", "-"]
            ]
        }
    }));
    assert_eq!(doc.nodes[0].text_content(), "Hello Ada! 3true4--");
}

#[test]
fn test_props_are_resolved() {
    let doc = render(json!({
        "id": "c",
        "data": { "theme": "dark" },
        "states": { "count": 2 },
        "render": {
            "id": "root",
            "type": "div",
            "props": {
                "className": "card ${theme}",
                "title": { "$bind": "theme" },
                "data-count": { "$exp": "count * 10" },
                "tabIndex": 0
            }
        }
    }));
    let root = &doc.nodes[0];
    assert_eq!(root.attr("className"), Some(&Value::string("card dark")));
    assert_eq!(root.attr("title"), Some(&Value::string("dark")));
    assert_eq!(root.attr("data-count"), Some(&Value::Number(20.0)));
    assert_eq!(root.attr("tabIndex"), Some(&Value::Number(0.0)));
}

#[test]
fn test_tag_mapping() {
    let doc = render(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "view",
            "children": [
                { "id": "t", "type": "text", "children": "label" },
                { "id": "field", "type": "input", "children": "ignored" },
                { "id": "pic", "type": "img", "props": { "src": "/a.png" } },
                { "id": "odd", "type": "carousel" }
            ]
        }
    }));
    let root = &doc.nodes[0];
    assert_eq!(root.tag(), Some("div"));
    assert_eq!(doc.find_target("t").and_then(VNode::tag), Some("span"));

    let field = doc.find_target("field").unwrap();
    assert_eq!(field.tag(), Some("input"));
    assert!(field.children().is_empty());

    let pic = doc.find_target("pic").unwrap();
    assert_eq!(pic.attr("alt"), Some(&Value::string("")));
    assert_eq!(doc.find_target("odd").and_then(VNode::tag), Some("div"));
}

#[test]
fn test_platform_override_applies_web() {
    let doc = render(json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "span",
            "props": { "title": "base" },
            "platform": {
                "web": { "props": { "title": "web" } },
                "ios": { "props": { "title": "ios" } }
            }
        }
    }));
    assert_eq!(doc.nodes[0].attr("title"), Some(&Value::string("web")));
}

#[test]
fn test_event_binding_to_method() {
    let mounted = Runtime::default().mount_json(&counter_document(), ObjectMap::new()).unwrap();
    let doc = mounted.render();
    let button = doc.find_target("btn").unwrap();

    assert!(button.attr("onClick").is_none());
    assert_eq!(
        button.event("onClick"),
        Some(&EventBinding::new(EventHandler::Method {
            instance: "counter".to_string(),
            method: "increment".to_string(),
        }))
    );
}

#[test]
fn test_dispatch_updates_state_and_rerenders() {
    let mounted = Runtime::default().mount_json(&counter_document(), ObjectMap::new()).unwrap();
    mounted.render();

    mounted.dispatch("btn", "onClick", &[]).unwrap();
    mounted.dispatch("btn", "onClick", &[]).unwrap();

    assert_eq!(mounted.state().get("count"), Some(&Value::Number(2.0)));
    let doc = mounted.last_render();
    assert_eq!(doc.find_target("label").map(VNode::text_content), Some("2".to_string()));
    assert!(!mounted.needs_render());
}

#[test]
fn test_submit_prevents_default_and_missing_handlers_warn() {
    let mounted = Runtime::default()
        .mount_json(
            &json!({
                "id": "form",
                "methods": { "save": { "fn": "() => setState('saved', true)" } },
                "render": {
                    "id": "root",
                    "type": "form",
                    "props": { "onSubmit": "save", "onChange": "nowhere" }
                }
            }),
            ObjectMap::new(),
        )
        .unwrap();
    let doc = mounted.render();
    let form = &doc.nodes[0];

    assert!(form.event("onSubmit").unwrap().prevent_default);
    let change = form.event("onChange").unwrap();
    assert_eq!(change.handler, EventHandler::Missing { name: "nowhere".to_string() });
    assert!(!change.prevent_default);

    assert!(matches!(mounted.dispatch("root", "onChange", &[]), Ok(Value::Undefined)));
    mounted.dispatch("root", "onSubmit", &[]).unwrap();
    assert_eq!(mounted.state().get("saved"), Some(&Value::Boolean(true)));
}

#[test]
fn test_host_handlers_and_method_precedence() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let runtime = Runtime::default()
        .with_handler("track", move |args: &[Value]| {
            sink.borrow_mut().push(args.len());
            Ok(Value::Null)
        })
        .with_handler("save", |_args: &[Value]| Ok(Value::string("host")));

    let mounted = runtime
        .mount_json(
            &json!({
                "id": "c",
                "methods": { "save": { "fn": "() => 'method'" } },
                "render": {
                    "id": "root",
                    "type": "div",
                    "children": [
                        { "id": "a", "type": "button", "props": { "onClick": "track" } },
                        { "id": "b", "type": "button", "props": { "onClick": "save" } }
                    ]
                }
            }),
            ObjectMap::new(),
        )
        .unwrap();
    mounted.render();

    let result = mounted.dispatch("a", "onClick", &[Value::string("x")]).unwrap();
    assert_eq!(result, Value::Null);
    assert_eq!(*calls.borrow(), vec![1]);

    let result = mounted.dispatch("b", "onClick", &[]).unwrap();
    assert_eq!(result, Value::string("method"));
}

#[test]
fn test_navigation_links() {
    let visits = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = Rc::clone(&visits);
    let runtime = Runtime::default().with_navigation(move |target: &str, params: Option<&ObjectMap>| {
        let count = params.map(|params| params.len()).unwrap_or(0);
        sink.borrow_mut().push(format!("{}:{}", target, count));
    });

    let mounted = runtime
        .mount_json(
            &json!({
                "id": "c",
                "data": { "target": "orders", "selected": 42 },
                "states": { "clicks": 0 },
                "methods": { "track": { "fn": "() => setState('clicks', clicks + 1)" } },
                "render": {
                    "id": "root",
                    "type": "div",
                    "children": [
                        { "id": "go", "type": "button", "link-to": "details", "props": { "onClick": "track" } },
                        {
                            "id": "open",
                            "type": "a",
                            "link-to": {
                                "ui": { "$bind": "target" },
                                "params": { "id": { "$bind": "selected" }, "filter": { "kind": "open" } }
                            }
                        }
                    ]
                }
            }),
            ObjectMap::new(),
        )
        .unwrap();
    let doc = mounted.render();

    let go = doc.find_target("go").unwrap();
    let style = go.attr("style").unwrap();
    assert_eq!(style.get_own("cursor"), Value::string("pointer"));
    assert!(go.event("onTouchEnd").is_some());

    let open = doc.find_target("open").unwrap();
    let EventHandler::Navigate { target, params, previous } = &open.event("onClick").unwrap().handler else {
        panic!("expected a navigation binding");
    };
    assert_eq!(target, "orders");
    assert!(previous.is_none());
    let params = params.as_ref().unwrap();
    assert_eq!(params.get("id"), Some(&Value::Number(42.0)));
    assert_eq!(params.get("filter").map(|f| f.get_own("kind")), Some(Value::string("open")));

    mounted.dispatch("go", "onClick", &[]).unwrap();
    assert_eq!(mounted.state().get("clicks"), Some(&Value::Number(1.0)));
    mounted.dispatch("open", "onTouchEnd", &[]).unwrap();
    assert_eq!(*visits.borrow(), vec!["details:0", "orders:2"]);
}

#[test]
fn test_links_are_inert_without_navigation() {
    let doc = render(json!({
        "id": "c",
        "render": { "id": "go", "type": "button", "link-to": "details" }
    }));
    let go = &doc.nodes[0];
    assert!(go.event("onClick").is_none());
    assert!(go.attr("style").is_none());
}

#[test]
fn test_native_components() {
    let document = json!({
        "id": "c",
        "render": {
            "id": "root",
            "type": "div",
            "children": [{ "id": "chart", "type": "COMP_Chart", "props": { "title": "Sales" } }]
        }
    });

    let doc = Runtime::default().mount_json(&document, ObjectMap::new()).unwrap().render();
    let placeholder = doc.find_target("chart").unwrap();
    assert!(matches!(placeholder, VNode::Native { component, .. } if component == "COMP_Chart"));
    assert_eq!(placeholder.attr("title"), Some(&Value::string("Sales")));

    let registry = Rc::new(ComponentRegistry::new());
    registry.register(
        "COMP_Chart",
        Rc::new(|props: &ObjectMap, _children: Vec<VNode>| -> Result<Vec<VNode>, RenderError> {
            let title = props.get("title").map(Value::to_display_string).unwrap_or_default();
            Ok(vec![VNode::element("figure").with_child(VNode::text(title))])
        }),
    );
    let doc = Runtime::default()
        .with_registry(registry)
        .mount_json(&document, ObjectMap::new())
        .unwrap()
        .render();
    let figure = &doc.nodes[0].children()[0];
    assert_eq!(figure.tag(), Some("figure"));
    assert_eq!(figure.text_content(), "Sales");
}

#[test]
fn test_selection_decoration() {
    let options = RenderOptions {
        selection: Some(SelectionState {
            selected: Some(NodeRef::new("btn", vec![1])),
            hovered: Some(NodeRef::new("label", vec![0])),
        }),
        ..RenderOptions::default()
    };
    let doc = Runtime::new(options)
        .mount_json(&counter_document(), ObjectMap::new())
        .unwrap()
        .render();

    let root = &doc.nodes[0];
    assert_eq!(root.attr("data-component-id"), Some(&Value::string("counter")));
    assert_eq!(root.attr("data-component-path"), Some(&Value::string("[]")));
    assert_eq!(
        root.attr("style").map(|s| s.get_own("outline")),
        Some(Value::string("1px dotted #9ca3af"))
    );

    let button = doc.find_target("btn").unwrap();
    assert_eq!(button.attr("data-component-path"), Some(&Value::string("[1]")));
    assert_eq!(button.attr("className"), Some(&Value::string("dsl-selected dsl-outlined")));
    assert_eq!(
        button.attr("style").map(|s| s.get_own("outline")),
        Some(Value::string("2px solid #3b82f6"))
    );

    let label = doc.find_target("label").unwrap();
    assert_eq!(label.attr("className"), Some(&Value::string("dsl-hovered dsl-outlined")));
}

fn animation(node: &VNode) -> Option<&AnimationHint> {
    match node {
        VNode::Element { animation, .. } => animation.as_ref(),
        _ => None,
    }
}

#[test]
fn test_animation_hints_in_development_only() {
    let document = json!({
        "id": "c",
        "data": { "items": ["a"] },
        "render": {
            "id": "list",
            "type": "ul",
            "children": { "id": "li", "type": "li", "for": { "in": { "$bind": "items" }, "as": "it" } }
        }
    });

    let doc = Runtime::default().mount_json(&document, ObjectMap::new()).unwrap().render();
    let list = &doc.nodes[0];
    assert_eq!(animation(list).map(|a| a.layout_id.as_str()), Some("element-list"));
    assert_eq!(
        animation(&list.children()[0]).map(|a| a.layout_id.as_str()),
        Some("element-li-0")
    );

    let doc = Runtime::new(RenderOptions::production())
        .mount_json(&document, ObjectMap::new())
        .unwrap()
        .render();
    assert!(animation(&doc.nodes[0]).is_none());
}

#[test]
fn test_nested_component_instances() {
    let mounted = Runtime::default()
        .mount_json(
            &json!({
                "id": "app",
                "data": { "title": "Counters" },
                "states": { "show": true },
                "methods": { "hide": { "fn": "() => setState('show', false)" } },
                "render": {
                    "id": "root",
                    "type": "div",
                    "children": [
                        { "id": "heading", "type": "h1", "children": "${title}" },
                        {
                            "id": "slot",
                            "type": "section",
                            "if": { "$bind": "show" },
                            "children": {
                                "id": "counter",
                                "states": { "n": 0 },
                                "methods": { "bump": { "fn": "() => setState('n', n + 1)" } },
                                "render": {
                                    "id": "bump",
                                    "type": "button",
                                    "props": { "onClick": "bump", "title": { "$bind": "title" } },
                                    "children": { "$bind": "n" }
                                }
                            }
                        },
                        { "id": "hide", "type": "button", "props": { "onClick": "hide" } }
                    ]
                }
            }),
            ObjectMap::new(),
        )
        .unwrap();

    let doc = mounted.render();
    assert_eq!(doc.find_target("heading").map(VNode::text_content), Some("Counters".to_string()));
    let bump = doc.find_target("bump").unwrap();
    assert_eq!(bump.attr("title"), Some(&Value::string("Counters")));
    assert_eq!(mounted.instance_keys(), vec!["counter@1.0"]);

    mounted.dispatch("bump", "onClick", &[]).unwrap();
    mounted.dispatch("bump", "onClick", &[]).unwrap();
    let doc = mounted.last_render();
    assert_eq!(doc.find_target("bump").map(VNode::text_content), Some("2".to_string()));
    assert_eq!(
        mounted.instance_state("counter@1.0").and_then(|state| state.get("n").cloned()),
        Some(Value::Number(2.0))
    );
    assert!(mounted.state().get("n").is_none());

    mounted.dispatch("hide", "onClick", &[]).unwrap();
    assert!(mounted.last_render().find_target("bump").is_none());
    assert!(mounted.instance_keys().is_empty());
}

#[test]
fn test_external_data_reaches_methods() {
    let mounted = Runtime::default()
        .mount_json(
            &json!({
                "id": "c",
                "methods": { "greet": { "fn": "() => 'Hi ' + user" } },
                "render": { "id": "root", "type": "div", "children": "${user}" }
            }),
            external(json!({ "user": "Ada" })),
        )
        .unwrap();
    assert_eq!(mounted.render().text_content(), "Ada");
    assert_eq!(mounted.trigger("greet", &[]).unwrap(), Value::string("Hi Ada"));
}
